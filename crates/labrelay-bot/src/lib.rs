//! labrelay bot - GitLab commands and notifications for Matrix rooms.
//!
//! Users send commands prefixed with the configured marker (`!gitlab` by
//! default). Each user logs in with their own GitLab access token; commands
//! then run against GitLab on their behalf and the result is posted back to
//! the room as HTML.
//!
//! # Environment Variables
//!
//! - `LABRELAY_CONFIG`: Path of the configuration document (default `config.json`)
//! - `LABRELAY_WEBHOOK_SECRET`, `LABRELAY_MATRIX_PASSWORD`, `LABRELAY_MATRIX_TOKEN`:
//!   override the matching configuration values
//! - `RUST_LOG`: log filter, takes precedence over `-v`
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use labrelay_bot::{CommandRouter, CommandSettings, RelayBot, SessionResolver};
//! use labrelay_gitlab::GitlabConnector;
//! use labrelay_matrix::MatrixClient;
//! use labrelay_persistence::CredentialStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(CredentialStore::load("tokens.json")?);
//!     let gitlab = Arc::new(GitlabConnector::new("https://gitlab.com")?);
//!     let router = CommandRouter::new(SessionResolver::new(store, gitlab), CommandSettings::default());
//!
//!     let matrix = MatrixClient::connect("https://matrix.org", "syt_...").await?;
//!     RelayBot::new(Arc::new(matrix), router).run().await?;
//!     Ok(())
//! }
//! ```

pub mod bot;
pub mod commands;
pub mod error;
pub mod session;

#[cfg(test)]
mod testing;

pub use bot::{RelayBot, SYNC_TIMEOUT};
pub use commands::{CommandRouter, CommandSettings, Invocation, Reply, Verb};
pub use error::{BotError, Result};
pub use session::{Session, SessionResolver};
