//! Request, response and record types shared by the server and the client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Output of the generation flow. Immutable once created.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    /// Provider URL of the generated image, time-limited.
    pub image_url: String,
    /// Generated description.
    pub description: String,
    /// Generated title.
    pub title: String,
    /// Token id, once minted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<u64>,
    /// When the client recorded this result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl GenerationResult {
    /// A fresh result without client-side bookkeeping.
    pub fn new(image_url: String, description: String, title: String) -> Self {
        Self {
            image_url,
            description,
            title,
            token_id: None,
            created_at: None,
        }
    }
}

/// Custom properties embedded in the metadata document.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct NftProperties {
    /// Token id the metadata belongs to.
    pub token_id: u64,
}

/// The JSON document pinned alongside the image.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct NftMetadata {
    /// Token name, taken from the generated title.
    pub name: String,
    /// Token description.
    pub description: String,
    /// Storage URI of the image, never the provider URL.
    pub image: String,
    /// Extra properties.
    pub properties: NftProperties,
}

impl NftMetadata {
    /// File name the metadata is uploaded under. Token 0 gets the generic name.
    pub fn file_name(&self) -> String {
        match self.properties.token_id {
            0 => "metadata.json".to_string(),
            token_id => format!("{token_id}.json"),
        }
    }
}

/// Result of a confirmed mint transaction.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintReceipt {
    /// 0x-prefixed transaction hash.
    pub transaction_hash: String,
    /// Token id that was minted.
    pub token_id: u64,
}

/// Body of `POST /api/generate`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GenerateRequest {
    /// The user's prompt.
    #[serde(default)]
    pub prompt: String,
}

/// Body of `POST /api/mint`. Every field is optional on the wire so missing
/// ones can be reported as a validation error instead of a parse failure.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintRequest {
    /// Image URL, absolute or relative to the configured base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Token name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Token description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Token id; random when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<u64>,
}

/// Body of a successful `POST /api/mint`.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintResponse {
    /// Human readable outcome.
    pub message: String,
    /// 0x-prefixed transaction hash.
    pub transaction_hash: String,
    /// Token id that was minted.
    pub token_id: u64,
}

impl From<MintReceipt> for MintResponse {
    fn from(receipt: MintReceipt) -> Self {
        Self {
            message: "NFT minted successfully".to_string(),
            transaction_hash: receipt.transaction_hash,
            token_id: receipt.token_id,
        }
    }
}

/// Body of every JSON error response.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ErrorBody {
    /// Human readable message, never upstream detail.
    pub error: String,
}
