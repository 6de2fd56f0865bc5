//! labrelay core - shared pieces used by the bot and the webhook receiver.
//!
//! - **config**: the application configuration document
//! - **markup**: HTML escaping, plain-text fallbacks and English list/number phrasing

pub mod config;
pub mod markup;

pub use config::{
    AppConfig, ConfigError, GitlabConfig, MatrixConfig, OptionsConfig, WebhookConfig, CONFIG_ENV,
    DEFAULT_CONFIG_FILE,
};
pub use markup::{
    escape_html, first_line, format_duration, html_to_plain, join_names, pluralize,
    truncate_chars,
};
