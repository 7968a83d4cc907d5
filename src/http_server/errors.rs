//! # HTTP Errors
//!
//! Maps operation failures onto status codes and the `{detail, code}` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::db::DbError;
use crate::operations::OperationError;

/// Result type for route handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// HTTP API errors
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    // ==================
    // Client Errors (4xx)
    // ==================
    /// Rejected request or statement the database refused
    #[error("{0}")]
    BadRequest(String),

    /// Missing table
    #[error("{0}")]
    NotFound(String),

    // ==================
    // Server Errors (5xx)
    // ==================
    /// No database connection could be obtained
    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<OperationError> for ApiError {
    fn from(err: OperationError) -> Self {
        // Keep the full message (it carries the step index for multi-step
        // runs) but classify by the underlying cause.
        let message = err.to_string();
        match err.root() {
            OperationError::Validation(_) => ApiError::BadRequest(message),
            OperationError::TableNotFound(_) => ApiError::NotFound(message),
            OperationError::Database(DbError::Execution(_)) => ApiError::BadRequest(message),
            OperationError::Database(DbError::Unavailable(_)) => ApiError::Unavailable(message),
            OperationError::Database(DbError::Config(_) | DbError::Decode(_))
            | OperationError::StepFailed { .. } => ApiError::Internal(message),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        ApiError::from(OperationError::from(err))
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
    pub code: u16,
}

impl From<ApiError> for ErrorResponse {
    fn from(err: ApiError) -> Self {
        Self {
            code: err.status_code().as_u16(),
            detail: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), detail = %self, "request failed");
        } else {
            warn!(status = status.as_u16(), detail = %self, "request rejected");
        }
        let body = Json(ErrorResponse::from(self));
        (status, body).into_response()
    }
}
