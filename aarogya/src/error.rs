use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::api::v1::response::ApiResponse;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Auth error: {0}")]
    Auth(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Model rate limit exceeded, retry after {retry_after:?} seconds")]
    ModelRateLimit { retry_after: Option<u64> },
}

/// Errors that escape a handler are rendered in the v1 envelope.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        ApiResponse::<()>::from(self).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
