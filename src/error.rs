//! Error handling

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::{error, info};

use crate::models::ErrorBody;

/// Errors surfaced by the HTTP handlers. Each variant carries the detail that
/// gets logged; the client only ever sees the fixed public message.
#[derive(Debug)]
pub enum AppError {
    /// Missing credentials or other setup problems
    Configuration(String),
    /// When you didn't send the right thing
    Validation(String),
    /// Provider kept answering with a 5xx
    UpstreamServer(String),
    /// Any other provider failure
    UpstreamOther(String),
    /// Fetching a remote resource failed
    Transport(String),
    /// Anything in the upload/mint pipeline
    Mint(String),
}

impl AppError {
    /// HTTP status and the message returned to the client.
    pub fn public_parts(&self) -> (StatusCode, String) {
        match self {
            AppError::Configuration(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, message.clone())
            }
            AppError::Validation(message) => (StatusCode::BAD_REQUEST, message.clone()),
            AppError::UpstreamServer(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Server error. Please try again later.".to_string(),
            ),
            AppError::UpstreamOther(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong.".to_string(),
            ),
            AppError::Transport(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch image".to_string(),
            ),
            AppError::Mint(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong during minting.".to_string(),
            ),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "configuration error: {msg}"),
            Self::Validation(msg) => write!(f, "validation error: {msg}"),
            Self::UpstreamServer(msg) => write!(f, "upstream server error: {msg}"),
            Self::UpstreamOther(msg) => write!(f, "upstream error: {msg}"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Mint(msg) => write!(f, "mint error: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match &self {
            AppError::Validation(_) => info!("Bad request received: {}", self),
            _ => error!("{}", self),
        }
        let (status, message) = self.public_parts();
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
