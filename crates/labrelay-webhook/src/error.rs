//! Webhook rejection reasons.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Result type for webhook handling.
pub type Result<T> = std::result::Result<T, WebhookError>;

/// Why a delivery was rejected. Rendered as a plain-text response.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The `room` query parameter is missing or empty.
    #[error("No room specified.")]
    MissingRoom,

    /// `X-Gitlab-Token` does not match the configured secret.
    #[error("Invalid webhook token.")]
    Unauthorized,

    /// No `X-Gitlab-Event` header.
    #[error("Missing X-Gitlab-Event header.")]
    MissingEventKind,

    /// `X-Gitlab-Event` names an event this relay does not handle.
    #[error("Unsupported event kind: {0}")]
    UnknownEventKind(String),

    /// The body does not decode as the announced event.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

impl WebhookError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::Unauthorized => StatusCode::UNAUTHORIZED,
            WebhookError::MissingRoom
            | WebhookError::MissingEventKind
            | WebhookError::UnknownEventKind(_)
            | WebhookError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(WebhookError::MissingRoom.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(WebhookError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            WebhookError::UnknownEventKind("Job Hook".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_missing_room_message() {
        assert_eq!(WebhookError::MissingRoom.to_string(), "No room specified.");
    }
}
