//! Fetching images and pinning files on IPFS through the thirdweb gateway.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::constants::{DEFAULT_IMAGE_FILE_NAME, FALLBACK_CONTENT_TYPE, THIRDWEB_UPLOAD_URL};
use crate::models::NftMetadata;

/// Errors from fetching or uploading files.
#[derive(Debug)]
pub enum StorageError {
    /// The image URL could not be resolved
    InvalidUrl(String),
    /// The image could not be downloaded
    Fetch(String),
    /// The storage network rejected or failed the upload
    Upload(String),
    /// The metadata could not be serialized
    Serialize(serde_json::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidUrl(msg) => write!(f, "Invalid image URL: {msg}"),
            Self::Fetch(msg) => write!(f, "Failed to fetch image: {msg}"),
            Self::Upload(msg) => write!(f, "Upload failed: {msg}"),
            Self::Serialize(err) => write!(f, "Failed to serialize metadata: {err}"),
        }
    }
}

impl std::error::Error for StorageError {}

/// A named binary file ready for upload.
#[derive(Clone, Debug)]
pub struct UploadFile {
    /// File name stored on the network.
    pub name: String,
    /// MIME type of `bytes`.
    pub content_type: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

/// A content-addressed storage network.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Uploads one file and returns its storage URI.
    async fn upload(&self, file: UploadFile) -> Result<String, StorageError>;
}

#[derive(Deserialize, Debug)]
struct UploadResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

/// [StorageClient] for the thirdweb IPFS upload endpoint.
#[derive(Clone, Debug)]
pub struct ThirdwebStorage {
    client: reqwest::Client,
    endpoint: String,
    client_id: Option<String>,
    secret_key: Option<String>,
}

impl ThirdwebStorage {
    /// Client for the public thirdweb gateway.
    pub fn new(
        client: reqwest::Client,
        client_id: Option<String>,
        secret_key: Option<String>,
    ) -> Self {
        Self {
            client,
            endpoint: THIRDWEB_UPLOAD_URL.to_string(),
            client_id,
            secret_key,
        }
    }

    /// Overrides the upload endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl StorageClient for ThirdwebStorage {
    async fn upload(&self, file: UploadFile) -> Result<String, StorageError> {
        let UploadFile {
            name,
            content_type,
            bytes,
        } = file;
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(name.clone())
            .mime_str(&content_type)
            .map_err(|err| StorageError::Upload(err.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let mut request = self.client.post(&self.endpoint).multipart(form);
        if let Some(secret_key) = self.secret_key.as_deref().filter(|key| !key.is_empty()) {
            request = request.header("x-secret-key", secret_key);
        }
        if let Some(client_id) = self.client_id.as_deref().filter(|id| !id.is_empty()) {
            request = request.header("x-client-id", client_id);
        }

        let resp = request
            .send()
            .await
            .map_err(|err| StorageError::Upload(err.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(StorageError::Upload(format!("{status} {text}")));
        }
        let parsed: UploadResponse = resp
            .json()
            .await
            .map_err(|err| StorageError::Upload(err.to_string()))?;

        let uri = format!("ipfs://{}/{}", parsed.ipfs_hash, name);
        info!("Uploaded IPFS URI: {uri}");
        Ok(uri)
    }
}

/// An image downloaded for re-upload.
#[derive(Clone, Debug)]
pub struct FetchedImage {
    /// Where it came from, after resolution.
    pub url: Url,
    /// Upstream content type or the binary default.
    pub content_type: String,
    /// Raw bytes.
    pub bytes: Vec<u8>,
}

/// Resolves `raw` against `base_url` unless it is already absolute.
/// Relative paths, with or without a leading slash, are appended to the base
/// URL's own path.
pub fn resolve_image_url(base_url: &Url, raw: &str) -> Result<Url, StorageError> {
    let resolved = if raw.starts_with("http") {
        Url::parse(raw)
    } else {
        let mut base = base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(raw.trim_start_matches('/'))
    };
    resolved.map_err(|err| StorageError::InvalidUrl(format!("{raw}: {err}")))
}

/// Last path segment of the URL, or the default image name.
pub fn image_file_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_IMAGE_FILE_NAME.to_string())
}

/// Downloads a remote resource, failing on any non-success status.
pub async fn fetch_image(client: &reqwest::Client, url: Url) -> Result<FetchedImage, StorageError> {
    debug!("Fetching image {url}");
    let resp = client
        .get(url.clone())
        .send()
        .await
        .map_err(|err| StorageError::Fetch(err.to_string()))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(StorageError::Fetch(format!("{url} returned {status}")));
    }
    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .unwrap_or(FALLBACK_CONTENT_TYPE)
        .to_string();
    let bytes = resp
        .bytes()
        .await
        .map_err(|err| StorageError::Fetch(err.to_string()))?;
    Ok(FetchedImage {
        url,
        content_type,
        bytes: bytes.to_vec(),
    })
}

/// Fetches the image behind `raw_url` and uploads it, returning the storage URI.
pub async fn upload_image(
    client: &reqwest::Client,
    storage: &dyn StorageClient,
    base_url: &Url,
    raw_url: &str,
) -> Result<String, StorageError> {
    info!("Uploading image to IPFS: {raw_url}");
    let url = resolve_image_url(base_url, raw_url)?;
    let name = image_file_name(&url);
    let image = fetch_image(client, url).await?;
    storage
        .upload(UploadFile {
            name,
            content_type: image.content_type,
            bytes: image.bytes,
        })
        .await
}

/// Serializes the metadata and uploads it as `<token_id>.json`.
pub async fn upload_metadata(
    storage: &dyn StorageClient,
    metadata: &NftMetadata,
) -> Result<String, StorageError> {
    info!("Uploading metadata to IPFS: {metadata:?}");
    let bytes = serde_json::to_vec(metadata).map_err(StorageError::Serialize)?;
    storage
        .upload(UploadFile {
            name: metadata.file_name(),
            content_type: "application/json".to_string(),
            bytes,
        })
        .await
}
