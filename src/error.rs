//! Common error types for the relay

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// The remote service rejected the job or could not be reached at submit time.
    #[error("Failed to start generation: {message}")]
    Submission {
        message: String,
        details: Option<serde_json::Value>,
    },

    /// Transient failure while polling a job's status.
    #[error("Status poll failed: {0}")]
    Poll(String),

    /// The caller's webhook could not be reached.
    #[error("Callback delivery failed: {0}")]
    Delivery(String),

    #[error("Job already registered: {0}")]
    DuplicateJob(String),

    #[error("Job not found")]
    JobNotFound(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Build a submission error without a remote response body
    pub fn submission(message: impl Into<String>) -> Self {
        Self::Submission {
            message: message.into(),
            details: None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Json(_) | AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::JobNotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateJob(_) => StatusCode::CONFLICT,
            AppError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_)
            | AppError::Io(_)
            | AppError::Submission { .. }
            | AppError::Poll(_)
            | AppError::Delivery(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body, `{"error": ..., "details": ...}`
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error = self.to_string();
        let details = match self {
            AppError::Submission { details, .. } => details,
            _ => None,
        };

        (status, Json(ErrorResponse { error, details })).into_response()
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
