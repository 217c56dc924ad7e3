use axum::body::Body;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use url::Url;

use super::prelude::*;
use crate::constants::PROXY_CONTENT_DISPOSITION;
use crate::storage::fetch_image;

#[derive(Deserialize)]
pub(crate) struct ProxyQuery {
    url: Option<String>,
}

/// Re-serves a remote image as a download so browsers skip the cross-origin
/// restriction. No caching, size limit or host allowlist.
pub(crate) async fn proxy_image_handler(
    State(state): State<AppState>,
    Query(query): Query<ProxyQuery>,
) -> Result<Response, AppError> {
    let Some(raw) = query.url.filter(|url| !url.trim().is_empty()) else {
        return Err(AppError::Validation("Missing image URL".to_string()));
    };
    let url = Url::parse(&raw).map_err(|err| AppError::Transport(format!("{raw}: {err}")))?;

    let image = fetch_image(&state.http, url)
        .await
        .map_err(|err| AppError::Transport(err.to_string()))?;

    let content_type = HeaderValue::from_str(&image.content_type)
        .map_err(|err| AppError::Transport(err.to_string()))?;
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .header(
            CONTENT_DISPOSITION,
            HeaderValue::from_static(PROXY_CONTENT_DISPOSITION),
        )
        .body(Body::from(image.bytes))
        .map_err(|err| AppError::Transport(err.to_string()))
}
