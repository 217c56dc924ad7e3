use axum::extract::rejection::JsonRejection;

use super::prelude::*;
use crate::generation;
use crate::minting::{MintDraft, MintPipeline};
use crate::models::{GenerateRequest, GenerationResult, MintRequest, MintResponse};

pub(crate) async fn generate_handler(
    State(state): State<AppState>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerationResult>, AppError> {
    let provider = state
        .provider
        .as_deref()
        .ok_or_else(|| AppError::Configuration("API key is missing".to_string()))?;
    let Json(request) = body.map_err(|err| {
        info!("Unreadable generate body: {}", err.body_text());
        AppError::Validation("Invalid request body".to_string())
    })?;

    let result = generation::generate(provider, &request.prompt).await?;
    Ok(Json(result))
}

pub(crate) async fn mint_handler(
    State(state): State<AppState>,
    body: Result<Json<MintRequest>, JsonRejection>,
) -> Result<Json<MintResponse>, AppError> {
    // an unreadable body fails like any other mint error
    let Json(request) = body.map_err(|err| AppError::Mint(err.body_text()))?;
    let draft = MintDraft::try_from(request)?;
    info!("Mint requested for token {}", draft.token_id);

    let pipeline = MintPipeline {
        http: &state.http,
        base_url: &state.base_url,
        storage: state.storage.as_ref(),
        minter: state.minter.as_ref(),
    };
    let receipt = pipeline.run(&draft).await?;
    Ok(Json(MintResponse::from(receipt)))
}
