//! Startup and chat loop errors.

use labrelay_core::ConfigError;
use labrelay_gitlab::GitlabError;
use labrelay_matrix::MatrixError;
use labrelay_persistence::PersistenceError;
use thiserror::Error;

/// Errors that stop the relay.
///
/// Command failures never end up here: handlers turn them into replies.
#[derive(Debug, Error)]
pub enum BotError {
    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The credential document is unreadable or corrupt.
    #[error("Credential store error: {0}")]
    Credentials(#[from] PersistenceError),

    /// The configured GitLab domain is unusable.
    #[error("GitLab error: {0}")]
    Gitlab(#[from] GitlabError),

    /// Matrix login or sync failed.
    #[error("Matrix error: {0}")]
    Matrix(#[from] MatrixError),

    /// The webhook listener could not be bound or failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for bot operations.
pub type Result<T> = std::result::Result<T, BotError>;
