//! Error types for the storage layer and the HTTP boundary.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Errors raised by the database layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No task row with this id.
    #[error("task {0} not found")]
    NotFound(i64),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("schema migration failed: {0}")]
    Migration(#[from] refinery::Error),
}

/// Result type for database operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors returned to HTTP clients.
///
/// Every variant renders as `{"error": "<message>"}`. Messages are generic;
/// storage causes are logged where the error is raised, never sent.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing input. HTTP 400.
    #[error("{0}")]
    Validation(String),

    /// Referenced task does not exist. HTTP 404.
    #[error("{0}")]
    NotFound(String),

    /// Storage backend failure. HTTP 500.
    #[error("{0}")]
    Storage(String),
}

impl ApiError {
    pub fn invalid_body() -> Self {
        Self::Validation("invalid request body".to_string())
    }

    pub fn task_not_found() -> Self {
        Self::NotFound("task not found".to_string())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert a store error into the client-facing error for one operation.
    ///
    /// `NotFound` keeps its 404 meaning. Anything else is logged with its
    /// cause and collapsed into `Storage(failure)`.
    pub fn from_store(err: StoreError, failure: &str) -> Self {
        match err {
            StoreError::NotFound(_) => Self::task_not_found(),
            other => {
                tracing::error!(error = %other, "{}", failure);
                Self::storage(failure)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Result type for HTTP handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
