//! Prompt → description → title → image pipeline against the OpenAI API.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::constants::{
    COMPLETION_MODEL, COMPLETION_TEMPERATURE, DESCRIPTION_FALLBACK, DESCRIPTION_MAX_TOKENS,
    IMAGE_SIZE, MAX_IMAGE_ATTEMPTS, TITLE_FALLBACK, TITLE_MAX_TOKENS,
};
use crate::error::AppError;
use crate::models::GenerationResult;

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// A failed call to the generation provider.
#[derive(Debug, Clone)]
pub struct ProviderError {
    /// HTTP status returned by the provider, `None` when the request never got one.
    pub status: Option<StatusCode>,
    /// Detail for the logs.
    pub message: String,
}

impl ProviderError {
    /// Builds an error for an HTTP status answer.
    pub fn status(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Builds an error for a failure without an HTTP status.
    pub fn other(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    /// Server-side failures are the only ones worth retrying.
    pub fn is_server_error(&self) -> bool {
        self.status.is_some_and(|status| status.is_server_error())
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "provider returned {status}: {}", self.message),
            None => write!(f, "provider request failed: {}", self.message),
        }
    }
}

impl std::error::Error for ProviderError {}

/// The text and image generation backend.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Runs a single text completion, returning `None` for an empty answer.
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<Option<String>, ProviderError>;

    /// Generates exactly one image and returns its URL, if the provider sent one.
    async fn generate_image(&self, prompt: &str) -> Result<Option<String>, ProviderError>;
}

// -----------------------------
// OpenAI
// -----------------------------

#[derive(Serialize, Debug)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize, Debug)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize, Debug)]
struct CompletionChoice {
    #[serde(default)]
    text: Option<String>,
}

/// Request body for POST /v1/images/generations
#[derive(Serialize, Debug)]
struct ImagesGenerateRequest<'a> {
    prompt: &'a str,
    n: u8,
    size: &'a str,
}

#[derive(Deserialize, Debug)]
struct ImagesGenerateResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Deserialize, Debug)]
struct ImageData {
    url: Option<String>,
    revised_prompt: Option<String>,
}

/// [GenerationProvider] backed by the OpenAI REST API.
#[derive(Clone, Debug)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
}

impl OpenAiProvider {
    /// Uses the public OpenAI endpoint.
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self::with_api_base(client, api_key, OPENAI_API_BASE)
    }

    /// Points the provider at an OpenAI-compatible endpoint.
    pub fn with_api_base(
        client: reqwest::Client,
        api_key: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    async fn post_json<B: Serialize + Sync, T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.api_base, path);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|err| ProviderError::other(format!("Request to {path} failed: {err}")))?;

        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|err| ProviderError::other(format!("Failed reading {path} body: {err}")))?;
        if !status.is_success() {
            return Err(ProviderError::status(
                status,
                String::from_utf8_lossy(&bytes).to_string(),
            ));
        }

        serde_json::from_slice(&bytes)
            .map_err(|err| ProviderError::other(format!("Failed to parse {path} JSON: {err}")))
    }
}

#[async_trait]
impl GenerationProvider for OpenAiProvider {
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<Option<String>, ProviderError> {
        let request = CompletionRequest {
            model: COMPLETION_MODEL,
            prompt,
            max_tokens,
            temperature,
        };
        let parsed: CompletionResponse = self.post_json("/completions", &request).await?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.text)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty()))
    }

    async fn generate_image(&self, prompt: &str) -> Result<Option<String>, ProviderError> {
        let request = ImagesGenerateRequest {
            prompt,
            n: 1,
            size: IMAGE_SIZE,
        };
        let parsed: ImagesGenerateResponse =
            self.post_json("/images/generations", &request).await?;
        let Some(first) = parsed.data.into_iter().next() else {
            return Ok(None);
        };
        if let Some(revised_prompt) = first.revised_prompt {
            debug!("Revised prompt from OpenAI: {revised_prompt}");
        }
        Ok(first.url.filter(|url| !url.is_empty()))
    }
}

// -----------------------------
// Prompt pipeline
// -----------------------------

fn description_prompt(prompt: &str) -> String {
    format!("Generate a detailed description based on the following prompt:\n{prompt}")
}

fn title_prompt(description: &str) -> String {
    format!(
        "Generate a concise and informative title based on the following description:\n{description}\n\nTitle:"
    )
}

async fn complete_or_fallback(
    provider: &dyn GenerationProvider,
    stage: &str,
    prompt: &str,
    max_tokens: u32,
    fallback: &str,
) -> String {
    match provider
        .complete(prompt, max_tokens, COMPLETION_TEMPERATURE)
        .await
    {
        Ok(Some(text)) => text,
        Ok(None) => fallback.to_string(),
        Err(err) => {
            warn!("{stage} completion failed, using fallback: {err}");
            fallback.to_string()
        }
    }
}

/// Generates the image with up to [MAX_IMAGE_ATTEMPTS] tries on server errors.
/// Any other failure returns straight away.
pub async fn generate_image_with_retry(
    provider: &dyn GenerationProvider,
    prompt: &str,
) -> Result<String, AppError> {
    let mut attempts = 0;
    loop {
        attempts += 1;
        match provider.generate_image(prompt).await {
            Ok(Some(url)) => return Ok(url),
            Ok(None) => {
                return Err(AppError::UpstreamOther(
                    "image response contained no URL".to_string(),
                ));
            }
            Err(err) if err.is_server_error() => {
                if attempts >= MAX_IMAGE_ATTEMPTS {
                    error!("Max retries reached. Error: {err}");
                    return Err(AppError::UpstreamServer(err.to_string()));
                }
                warn!("Image generation attempt {attempts} failed, retrying: {err}");
            }
            Err(err) => return Err(AppError::UpstreamOther(err.to_string())),
        }
    }
}

/// Runs the full generation flow for one prompt.
///
/// The three provider calls are strictly sequential. Only the image step is
/// retried; description and title fall back to placeholder text.
pub async fn generate(
    provider: &dyn GenerationProvider,
    prompt: &str,
) -> Result<GenerationResult, AppError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(AppError::Validation("Prompt is required".to_string()));
    }

    let description = complete_or_fallback(
        provider,
        "Description",
        &description_prompt(prompt),
        DESCRIPTION_MAX_TOKENS,
        DESCRIPTION_FALLBACK,
    )
    .await;
    let title = complete_or_fallback(
        provider,
        "Title",
        &title_prompt(&description),
        TITLE_MAX_TOKENS,
        TITLE_FALLBACK,
    )
    .await;

    info!("Generated description: {description}");
    info!("Generated title: {title}");

    let image_url = generate_image_with_retry(provider, prompt).await?;
    Ok(GenerationResult::new(image_url, description, title))
}
