//! Application configuration.
//!
//! The configuration is a single JSON document:
//!
//! ```text
//! {
//!   "webhook": { "listen": "0.0.0.0:8080", "path": "/webhooks", "secret": "..." },
//!   "matrix":  { "homeserver": "...", "username": "...", "password": "...", "authtoken": "" },
//!   "gitlab":  { "domain": "https://gitlab.com" },
//!   "options": { "irc-compatibility": false },
//!   "tokens":  "tokens.json"
//! }
//! ```
//!
//! Every section and field is optional and falls back to its default.
//!
//! # Environment Variables
//!
//! - `LABRELAY_CONFIG`: Path of the configuration document
//! - `LABRELAY_WEBHOOK_SECRET`: Overrides `webhook.secret`
//! - `LABRELAY_MATRIX_PASSWORD`: Overrides `matrix.password`
//! - `LABRELAY_MATRIX_TOKEN`: Overrides `matrix.authtoken`

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use labrelay_persistence::atomic::{atomic_write_json, read_json_optional};
use labrelay_persistence::PersistenceError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "LABRELAY_CONFIG";

/// Environment variable overriding the webhook secret.
pub const WEBHOOK_SECRET_ENV: &str = "LABRELAY_WEBHOOK_SECRET";

/// Environment variable overriding the Matrix password.
pub const MATRIX_PASSWORD_ENV: &str = "LABRELAY_MATRIX_PASSWORD";

/// Environment variable overriding the Matrix access token.
pub const MATRIX_TOKEN_ENV: &str = "LABRELAY_MATRIX_TOKEN";

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    /// The configuration file could not be read, parsed or written.
    #[error("config file error: {0}")]
    Persistence(#[from] PersistenceError),

    /// A value is present but unusable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Webhook receiver settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Socket address the HTTP listener binds to.
    pub listen: String,
    /// Request path GitLab posts to.
    pub path: String,
    /// Shared secret GitLab sends in `X-Gitlab-Token`. Empty disables the check.
    pub secret: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
            path: "/webhooks".to_string(),
            secret: String::new(),
        }
    }
}

/// Matrix account settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixConfig {
    pub homeserver: String,
    pub username: String,
    pub password: String,
    /// Access token; filled in after the first password login.
    #[serde(rename = "authtoken")]
    pub auth_token: String,
    pub device_id: String,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            homeserver: "https://matrix.org".to_string(),
            username: String::new(),
            password: String::new(),
            auth_token: String::new(),
            device_id: String::new(),
        }
    }
}

/// GitLab instance settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitlabConfig {
    /// Base URL of the instance, without the `/api/v4` suffix.
    pub domain: String,
}

impl Default for GitlabConfig {
    fn default() -> Self {
        Self {
            domain: "https://gitlab.com".to_string(),
        }
    }
}

/// Rendering and command options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OptionsConfig {
    /// Keep push notifications short enough for IRC bridges.
    pub irc_compatibility: bool,
    /// Marker that starts every chat command.
    pub command_prefix: String,
    /// Send messages as `m.notice` instead of `m.text`.
    pub send_as_notice: bool,
    /// `strftime` pattern for commit and comment timestamps.
    pub time_format: String,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            irc_compatibility: false,
            command_prefix: "!gitlab".to_string(),
            send_as_notice: true,
            time_format: "%b %e, %Y %H:%M:%S".to_string(),
        }
    }
}

/// The complete configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub webhook: WebhookConfig,
    pub matrix: MatrixConfig,
    pub gitlab: GitlabConfig,
    pub options: OptionsConfig,
    /// Path of the credential document.
    pub tokens: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            webhook: WebhookConfig::default(),
            matrix: MatrixConfig::default(),
            gitlab: GitlabConfig::default(),
            options: OptionsConfig::default(),
            tokens: PathBuf::from(labrelay_persistence::credentials::DEFAULT_TOKENS_FILE),
        }
    }
}

impl AppConfig {
    /// Loads the configuration document at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config: AppConfig =
            read_json_optional(path)?.ok_or_else(|| ConfigError::NotFound(path.to_path_buf()))?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Writes the configuration back to `path`.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        atomic_write_json(path, self)?;
        debug!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Applies secret overrides from the environment.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var(WEBHOOK_SECRET_ENV) {
            self.webhook.secret = secret;
        }
        if let Ok(password) = std::env::var(MATRIX_PASSWORD_ENV) {
            self.matrix.password = password;
        }
        if let Ok(token) = std::env::var(MATRIX_TOKEN_ENV) {
            self.matrix.auth_token = token;
        }
    }

    /// Checks the values that would otherwise fail later at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.matrix.homeserver.trim().is_empty() {
            return Err(ConfigError::Invalid("matrix.homeserver is empty".to_string()));
        }
        if self.matrix.auth_token.is_empty()
            && (self.matrix.username.is_empty() || self.matrix.password.is_empty())
        {
            return Err(ConfigError::Invalid(
                "matrix needs either authtoken or username and password".to_string(),
            ));
        }
        if !self.webhook.path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "webhook.path must start with '/': {}",
                self.webhook.path
            )));
        }
        self.listen_addr()?;
        if self.options.command_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("options.command-prefix is empty".to_string()));
        }
        Ok(())
    }

    /// Parsed webhook listen address.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.webhook.listen.parse().map_err(|_| {
            ConfigError::Invalid(format!("webhook.listen is not an address: {}", self.webhook.listen))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.matrix.username = "labrelay".to_string();
        config.matrix.password = "hunter2".to_string();
        config
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.webhook.path, "/webhooks");
        assert_eq!(config.gitlab.domain, "https://gitlab.com");
        assert_eq!(config.options.command_prefix, "!gitlab");
        assert!(!config.options.irc_compatibility);
        assert_eq!(config.tokens, PathBuf::from("tokens.json"));
    }

    #[test]
    fn test_load_partial_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "gitlab": { "domain": "https://git.example.org" },
                "options": { "irc-compatibility": true },
                "matrix": { "authtoken": "syt_abc" }
            }"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.gitlab.domain, "https://git.example.org");
        assert!(config.options.irc_compatibility);
        assert_eq!(config.matrix.auth_token, "syt_abc");
        assert_eq!(config.webhook.listen, "0.0.0.0:8080");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let result = AppConfig::load(&dir.path().join("nope.json"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "webhook = 1").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::Persistence(_))));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = valid_config();
        config.matrix.auth_token = "syt_saved".to_string();

        config.save(&path).unwrap();
        let reloaded = AppConfig::load(&path).unwrap();

        assert_eq!(reloaded, config);
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"irc-compatibility\""));
        assert!(raw.contains("\"authtoken\""));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = valid_config();
        config.webhook.path = "webhooks".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = valid_config();
        config.webhook.listen = "not an address".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = valid_config();
        config.matrix.password.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_listen_addr() {
        let config = valid_config();
        assert_eq!(config.listen_addr().unwrap().port(), 8080);
    }
}
