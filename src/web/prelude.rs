pub(crate) use crate::error::AppError;
pub(crate) use crate::web::AppState;
pub(crate) use axum::Json;
pub(crate) use axum::extract::{Query, State};
pub(crate) use axum::http::{HeaderValue, StatusCode};
pub(crate) use axum::response::Response;
pub(crate) use serde::Deserialize;
pub(crate) use tracing::info;
