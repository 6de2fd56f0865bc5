//! labrelay binary.
//!
//! ```bash
//! labrelay --config config.json -v
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use labrelay_bot::{BotError, CommandRouter, CommandSettings, RelayBot, SessionResolver};
use labrelay_core::{AppConfig, CONFIG_ENV, DEFAULT_CONFIG_FILE};
use labrelay_gitlab::GitlabConnector;
use labrelay_matrix::MatrixClient;
use labrelay_persistence::CredentialStore;
use labrelay_webhook::{RenderOptions, WebhookState};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// labrelay - GitLab commands and notifications for Matrix rooms
#[derive(Parser, Debug)]
#[command(name = "labrelay")]
#[command(version)]
#[command(about = "Relay between GitLab and Matrix rooms")]
struct Args {
    /// Configuration document
    #[arg(short, long, env = CONFIG_ENV, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Verbose logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let fallback = match verbose {
        0 => "labrelay=info,labrelay_bot=info,labrelay_webhook=info,labrelay_matrix=warn,labrelay_gitlab=warn",
        1 => "labrelay=debug,labrelay_bot=debug,labrelay_webhook=debug,labrelay_matrix=info,labrelay_gitlab=info,tower_http=info",
        2 => "labrelay=trace,labrelay_bot=trace,labrelay_webhook=trace,labrelay_matrix=debug,labrelay_gitlab=debug,labrelay_persistence=debug,labrelay_core=debug,tower_http=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Loads, overrides and validates the configuration.
fn load_config(path: &Path) -> Result<AppConfig, BotError> {
    let mut config = AppConfig::load(path)?;
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

/// Logs into Matrix, reusing the stored access token when there is one.
///
/// A token obtained by password login is written back to the configuration.
async fn connect_matrix(config: &mut AppConfig, path: &Path) -> Result<MatrixClient, BotError> {
    let matrix = &config.matrix;
    if matrix.auth_token.is_empty() {
        let login = MatrixClient::login(
            &matrix.homeserver,
            &matrix.username,
            &matrix.password,
            &matrix.device_id,
        )
        .await?;
        config.matrix.auth_token = login.access_token;
        if !login.device_id.is_empty() {
            config.matrix.device_id = login.device_id;
        }

        // Environment overrides stay out of the file.
        let mut stored = AppConfig::load(path)?;
        stored.matrix.auth_token = config.matrix.auth_token.clone();
        stored.matrix.device_id = config.matrix.device_id.clone();
        stored.save(path)?;
        info!(path = %path.display(), "Stored Matrix access token");
    }

    let client = MatrixClient::connect(&config.matrix.homeserver, &config.matrix.auth_token)
        .await?
        .with_notices(config.options.send_as_notice);
    Ok(client)
}

async fn run(args: Args) -> Result<(), BotError> {
    let mut config = load_config(&args.config)?;

    let gitlab = Arc::new(GitlabConnector::new(&config.gitlab.domain)?);
    let store = Arc::new(CredentialStore::load(config.tokens.clone())?);
    info!(gitlab = %config.gitlab.domain, "Using GitLab instance");

    let matrix = Arc::new(connect_matrix(&mut config, &args.config).await?);
    info!(user_id = %matrix.user_id(), "Connected to Matrix");

    let listener = TcpListener::bind(config.listen_addr()?).await?;
    info!(
        addr = %config.webhook.listen,
        path = %config.webhook.path,
        "Webhook listener bound"
    );
    let webhook_state = WebhookState::new(
        matrix.clone(),
        &config.webhook.secret,
        RenderOptions {
            irc_compatibility: config.options.irc_compatibility,
        },
    );
    let webhook_path = config.webhook.path.clone();
    let webhook = tokio::spawn(async move {
        labrelay_webhook::serve(listener, &webhook_path, webhook_state).await
    });

    let router = CommandRouter::new(
        SessionResolver::new(store, gitlab),
        CommandSettings::from(&config.options),
    );
    let bot = RelayBot::new(matrix, router);

    tokio::select! {
        result = bot.run() => result?,
        result = webhook => match result {
            Ok(served) => served?,
            Err(e) => error!(error = %e, "Webhook task panicked"),
        },
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env only fills in variables that are not set yet
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args).await {
        error!(error = %e, "labrelay stopped");
        return Err(e.into());
    }
    Ok(())
}
