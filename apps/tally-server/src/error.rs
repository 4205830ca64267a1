//! # API Error Handling
//!
//! Every failed request answers with the same JSON shape:
//!
//! ```json
//! { "status": "error", "code": "VALIDATION_ERROR", "message": "amount must be positive" }
//! ```
//!
//! ## Status Mapping
//!
//! | Source                          | Code                   | HTTP |
//! |---------------------------------|------------------------|------|
//! | `ValidationError`, bad JSON     | `VALIDATION_ERROR`     | 400  |
//! | `DbError::NotFound`             | `NOT_FOUND`            | 404  |
//! | Close-out already running       | `REPORT_IN_PROGRESS`   | 409  |
//! | Pool exhausted / closed         | `DATABASE_UNAVAILABLE` | 503  |
//! | Any other storage failure       | `DATABASE_ERROR`       | 500  |
//! | Everything else                 | `INTERNAL`             | 500  |
//!
//! Validation failures are the caller's fault and are not logged as errors.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use tally_core::{CoreError, ValidationError};
use tally_db::DbError;

/// Machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    NotFound,
    ReportInProgress,
    DatabaseUnavailable,
    DatabaseError,
    Internal,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ReportInProgress => StatusCode::CONFLICT,
            ErrorCode::DatabaseUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error returned by every handler.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    status: &'static str,
    code: ErrorCode,
    message: &'a str,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::NotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            status: "error",
            code: self.code,
            message: &self.message,
        };
        (self.code.status(), Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Validation(e) => e.into(),
            DbError::NotFound { entity, id } => {
                ApiError::not_found(format!("{} not found: {}", entity, id))
            }
            e if e.is_unavailable() => {
                tracing::warn!(error = %e, "Database unavailable");
                ApiError::new(ErrorCode::DatabaseUnavailable, "Database temporarily unavailable")
            }
            e => {
                // Log the actual error but return a generic message
                tracing::error!(error = %e, "Database operation failed");
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => e.into(),
            e => {
                tracing::error!(error = %e, "Core operation failed");
                ApiError::internal(e.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
