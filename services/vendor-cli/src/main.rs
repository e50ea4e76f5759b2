//! Vendor API command-line client
//!
//! 1. Loads `[client]` config (file, then env overlay for the secret)
//! 2. Prints the browser authorization URL, or
//! 3. Seeds a request code / refresh token and fetches the current user
//!    through the full auth gate

mod output;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vendor_client::{ClientConfig, Credential, RequestDispatcher};

#[derive(Debug, Parser)]
#[command(name = "vendor-cli", version, about = "Vendor REST API client")]
struct Cli {
    /// Config file (falls back to VENDOR_CONFIG, then ./vendor-client.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the URL that starts the browser authorization flow
    AuthorizeUrl {
        /// Redirect URI to send instead of the configured one
        #[arg(long)]
        redirect_uri: Option<String>,
        /// OAuth response_type
        #[arg(long, default_value = vendor_auth::DEFAULT_RESPONSE_TYPE)]
        response_type: String,
    },
    /// Fetch the signed-in user's profile
    Whoami(Seed),
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct Seed {
    /// One-time request code from the redirect callback
    #[arg(long)]
    code: Option<String>,
    /// Refresh token from an earlier session
    #[arg(long)]
    refresh_token: Option<String>,
}

impl Seed {
    fn credential(&self) -> Credential {
        let mut credential = match &self.refresh_token {
            Some(token) => Credential::with_refresh_token(token.as_str()),
            None => Credential::new(),
        };
        if let Some(code) = &self.code {
            credential.set_request_code(code.as_str());
        }
        credential
    }
}

/// Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support.
/// The config `debug` flag lowers the default level.
fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = ClientConfig::resolve_path(cli.config.as_deref());
    let config = ClientConfig::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    init_tracing(config.debug);
    info!(
        path = %config_path.display(),
        base_url = config.base_url(),
        environment = ?config.environment,
        "configuration loaded"
    );

    match cli.command {
        Command::AuthorizeUrl {
            redirect_uri,
            response_type,
        } => {
            let redirect_uri = redirect_uri.unwrap_or_else(|| config.redirect_uri.clone());
            let url = vendor_auth::build_authorization_url(
                config.base_url(),
                &config.client_id,
                &redirect_uri,
                &response_type,
            )
            .context("building authorization URL")?;
            println!("{url}");
        }
        Command::Whoami(seed) => {
            let client = RequestDispatcher::with_credential(&config, seed.credential())
                .context("creating API client")?;
            let response = client
                .get_current_user()
                .await
                .context("fetching current user")?;
            print!("{}", output::render(&response)?);
        }
    }

    Ok(())
}
