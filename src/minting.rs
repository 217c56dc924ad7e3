//! The upload-then-mint pipeline behind `POST /api/mint`.

use tracing::info;
use url::Url;

use crate::chain::{ChainError, Minter};
use crate::constants::MAX_RANDOM_TOKEN_ID;
use crate::error::AppError;
use crate::models::{MintReceipt, MintRequest, NftMetadata, NftProperties};
use crate::storage::{StorageClient, StorageError, upload_image, upload_metadata};

/// A mint request that passed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MintDraft {
    /// Image URL, absolute or relative.
    pub url: String,
    /// Token name.
    pub title: String,
    /// Token description.
    pub description: String,
    /// Resolved token id.
    pub token_id: u64,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl TryFrom<MintRequest> for MintDraft {
    type Error = AppError;

    fn try_from(request: MintRequest) -> Result<Self, Self::Error> {
        let (Some(url), Some(title), Some(description)) = (
            present(request.url),
            present(request.title),
            present(request.description),
        ) else {
            return Err(AppError::Validation("Missing required fields".to_string()));
        };
        Ok(Self {
            url,
            title,
            description,
            token_id: request.token_id.unwrap_or_else(random_token_id),
        })
    }
}

/// Uniformly random token id in `0..MAX_RANDOM_TOKEN_ID`.
pub fn random_token_id() -> u64 {
    rand::random_range(0..MAX_RANDOM_TOKEN_ID)
}

/// Which stage of the pipeline failed.
#[derive(Debug)]
pub enum MintError {
    /// Fetching or uploading the image or metadata
    Storage(StorageError),
    /// The contract call or its confirmation
    Chain(ChainError),
}

impl std::fmt::Display for MintError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(err) => write!(f, "{err}"),
            Self::Chain(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for MintError {}

impl From<StorageError> for MintError {
    fn from(err: StorageError) -> Self {
        MintError::Storage(err)
    }
}

impl From<ChainError> for MintError {
    fn from(err: ChainError) -> Self {
        MintError::Chain(err)
    }
}

impl From<MintError> for AppError {
    fn from(err: MintError) -> Self {
        AppError::Mint(err.to_string())
    }
}

/// Collaborators for one run of the pipeline.
pub struct MintPipeline<'a> {
    /// Client used to fetch the source image.
    pub http: &'a reqwest::Client,
    /// Base for relative image URLs.
    pub base_url: &'a Url,
    /// Where files get pinned.
    pub storage: &'a dyn StorageClient,
    /// The contract binding.
    pub minter: &'a dyn Minter,
}

impl MintPipeline<'_> {
    /// Uploads the image, uploads the metadata, mints and waits for the
    /// receipt. Steps run one after another and stop at the first failure.
    /// Uploads that already happened are left in place.
    pub async fn run(&self, draft: &MintDraft) -> Result<MintReceipt, MintError> {
        let image_uri = upload_image(self.http, self.storage, self.base_url, &draft.url).await?;

        let metadata = NftMetadata {
            name: draft.title.clone(),
            description: draft.description.clone(),
            image: image_uri,
            properties: NftProperties {
                token_id: draft.token_id,
            },
        };
        let metadata_uri = upload_metadata(self.storage, &metadata).await?;

        let transaction_hash = self.minter.mint(draft.token_id, &metadata_uri).await?;
        info!("Minted token {} in {transaction_hash}", draft.token_id);
        Ok(MintReceipt {
            transaction_hash,
            token_id: draft.token_id,
        })
    }
}
