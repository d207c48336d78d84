//! Error types for Kasir API.
//!
//! Every failure leaves the service as JSON `{code, message}`.
//!
//! ```text
//!   EngineError::Validation / InvalidDateRange ──► 400 VALIDATION_ERROR
//!   EngineError::NotFound                      ──► 404 NOT_FOUND
//!   EngineError::InvalidTransition             ──► 409 INVALID_TRANSITION
//!   EngineError::Conflict                      ──► 409 CONFLICT
//!   EngineError::NotConfigured                 ──► 503 NOT_CONFIGURED
//!   EngineError::Storage                       ──► 500 STORAGE_ERROR
//!   malformed JSON / query / path              ──► 400 VALIDATION_ERROR
//! ```

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use kasir_core::ValidationError;
use kasir_engine::EngineError;

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Kasir API errors.
#[derive(Debug, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        ApiError {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code.to_string(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation(e) => ApiError::bad_request(e.to_string()),
            EngineError::InvalidDateRange(reason) => ApiError::bad_request(reason),
            EngineError::NotFound { .. } => {
                ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string())
            }
            EngineError::InvalidTransition { .. } => {
                ApiError::new(StatusCode::CONFLICT, "INVALID_TRANSITION", err.to_string())
            }
            EngineError::Conflict(msg) => ApiError::new(StatusCode::CONFLICT, "CONFLICT", msg),
            EngineError::NotConfigured => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "NOT_CONFIGURED",
                "Data store is not configured",
            ),
            EngineError::AmountOverflow(field) => {
                error!(field = %field, "Stored amounts overflowed while summing");
                ApiError::internal("Stored amounts are too large to sum")
            }
            EngineError::Storage(e) => {
                error!(error = %e, "Storage failure");
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "Failed to save, please retry",
                )
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Unit Tests
// =============================================================================
