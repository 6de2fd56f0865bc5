//! Error types for GitLab calls.

use reqwest::StatusCode;
use thiserror::Error;

/// Result type for GitLab operations.
pub type Result<T> = std::result::Result<T, GitlabError>;

/// Errors returned by the GitLab client.
#[derive(Debug, Error)]
pub enum GitlabError {
    /// The configured domain is not a usable base URL.
    #[error("invalid GitLab domain {domain:?}: {reason}")]
    InvalidDomain { domain: String, reason: String },

    /// 401: the access token was rejected.
    #[error("401 Unauthorized")]
    Unauthorized,

    /// 404: the project or object does not exist or is not visible.
    #[error("404 Not Found: {0}")]
    NotFound(String),

    /// Any other non-success status.
    #[error("{status}: {message}")]
    Status { status: StatusCode, message: String },

    /// Transport failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl GitlabError {
    /// Whether the server answered 401.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, GitlabError::Unauthorized)
    }

    /// Whether the server answered 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GitlabError::NotFound(_))
    }

    /// Maps an error status and its body to an error.
    pub(crate) fn from_status(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|value| {
                value
                    .get("message")
                    .or_else(|| value.get("error"))
                    .map(|m| match m {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
            })
            .unwrap_or_else(|| body.trim().to_string());

        match status {
            StatusCode::UNAUTHORIZED => GitlabError::Unauthorized,
            StatusCode::NOT_FOUND => GitlabError::NotFound(message),
            _ => GitlabError::Status { status, message },
        }
    }
}

impl From<reqwest::Error> for GitlabError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GitlabError::Decode(e.to_string())
        } else {
            GitlabError::Http(e.to_string())
        }
    }
}
