//! Error types for the Matrix transport.

use thiserror::Error;

/// Errors returned by the Matrix client.
#[derive(Debug, Error)]
pub enum MatrixError {
    /// The homeserver URL cannot be used.
    #[error("Invalid homeserver {homeserver}: {reason}")]
    InvalidHomeserver { homeserver: String, reason: String },

    /// Password login was rejected.
    #[error("Matrix login failed: {0}")]
    Login(String),

    /// The homeserver answered with a non-success status.
    #[error("Matrix request failed with {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// Transport level failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Response body could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for Matrix operations.
pub type Result<T> = std::result::Result<T, MatrixError>;

impl From<reqwest::Error> for MatrixError {
    fn from(err: reqwest::Error) -> Self {
        MatrixError::Http(err.to_string())
    }
}
