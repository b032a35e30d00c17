//! # V1 API Response Envelope
//!
//! Every v1 endpoint answers with an [`ApiResponse<T>`]:
//!
//! ```json
//! { "data": { ... } }
//! { "error": { "code": "not_found", "message": "Medical report not found" } }
//! ```
//!
//! Analysis endpoints put their `{status, message}` outcome inside `data`.
//! An outcome with `status: "failure"` is still an HTTP 200: the request was
//! handled, the upload just could not be read.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

const INTERNAL_MESSAGE: &str = "An internal error occurred";

/// Machine-readable error code, snake_case on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed body, bad multipart form or failed validation. HTTP 400.
    InvalidRequest,
    /// Missing, invalid or expired bearer token, or bad credentials. HTTP 401.
    Unauthorized,
    /// HTTP 404.
    NotFound,
    /// HTTP 409.
    Conflict,
    /// Internal details are logged, never returned. HTTP 500.
    InternalError,
    /// A collaborator (such as the vision model) is not configured. HTTP 501.
    NotImplemented,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotImplemented => StatusCode::NOT_IMPLEMENTED,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequest => write!(f, "invalid_request"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::InternalError => write!(f, "internal_error"),
            Self::NotImplemented => write!(f, "not_implemented"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiError {
    pub code: ErrorCode,
    /// Safe to show to end users.
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,

    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            status: StatusCode::OK,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            status: StatusCode::CREATED,
        }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        let status = code.status();
        Self {
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
            status,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        match serde_json::to_value(&self) {
            Ok(body) => (status, Json(body)).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize v1 response");
                let body = serde_json::json!({
                    "error": {
                        "code": ErrorCode::InternalError,
                        "message": INTERNAL_MESSAGE,
                    }
                });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

impl<T: Serialize> From<AppError> for ApiResponse<T> {
    /// Client-side errors keep their message. Everything else is logged and
    /// replaced with a generic message.
    fn from(err: AppError) -> Self {
        match err {
            AppError::NotFound(msg) => ApiResponse::error(ErrorCode::NotFound, msg),
            AppError::Validation(msg) => ApiResponse::error(ErrorCode::InvalidRequest, msg),
            AppError::Unauthorized(msg) => ApiResponse::error(ErrorCode::Unauthorized, msg),
            AppError::Conflict(msg) => ApiResponse::error(ErrorCode::Conflict, msg),
            AppError::Json(e) => {
                ApiResponse::error(ErrorCode::InvalidRequest, format!("Invalid JSON: {e}"))
            }
            AppError::UrlParse(e) => {
                ApiResponse::error(ErrorCode::InvalidRequest, format!("Invalid URL: {e}"))
            }
            AppError::ModelUnavailable(msg) => ApiResponse::error(ErrorCode::NotImplemented, msg),
            AppError::ModelRateLimit { retry_after } => {
                let msg = match retry_after {
                    Some(secs) => format!("Rate limit exceeded, retry after {secs} seconds"),
                    None => "Rate limit exceeded".to_string(),
                };
                ApiResponse::error(ErrorCode::InvalidRequest, msg)
            }
            ref internal @ (AppError::Database(_)
            | AppError::Processing(_)
            | AppError::Storage(_)
            | AppError::Http(_)
            | AppError::Io(_)
            | AppError::Auth(_)
            | AppError::Internal(_)
            | AppError::Model(_)) => {
                tracing::error!(error = %internal, "Internal error mapped to v1 response");
                ApiResponse::error(ErrorCode::InternalError, INTERNAL_MESSAGE)
            }
        }
    }
}
