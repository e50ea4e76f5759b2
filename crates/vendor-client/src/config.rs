//! Client configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The client secret is loaded from `VENDOR_CLIENT_SECRET` or
//! `client_secret_file`, never stored in the TOML directly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use common::Secret;
use serde::Deserialize;
use vendor_auth::ClientCredentials;

/// Env var holding the OAuth client secret
pub const CLIENT_SECRET_ENV: &str = "VENDOR_CLIENT_SECRET";

/// Env var naming the config file
pub const CONFIG_PATH_ENV: &str = "VENDOR_CONFIG";

const DEFAULT_CONFIG_FILE: &str = "vendor-client.toml";

/// Vendor deployment to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Sandbox,
}

impl Environment {
    pub fn base_url(&self) -> &'static str {
        match self {
            Environment::Production => "https://api.vendor.com",
            Environment::Sandbox => "https://sandbox.api.vendor.com",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    client: ClientConfig,
}

/// OAuth client registration and transport settings.
///
/// Read-only once loaded; the dispatcher copies what it needs.
#[derive(Debug, Deserialize)]
pub struct ClientConfig {
    pub client_id: String,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    /// Path to a file containing the client secret (alternative to the env var)
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    pub redirect_uri: String,
    #[serde(default)]
    pub environment: Environment,
    /// Overrides the environment's host (staging mirrors, local mocks)
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Exact timeout set through `with_timeout`; takes precedence over
    /// `timeout_secs`.
    #[serde(skip)]
    timeout_override: Option<Duration>,
    /// Log auth decisions and raw token endpoint responses
    #[serde(default)]
    pub debug: bool,
}

fn default_timeout() -> u64 {
    30
}

impl ClientConfig {
    /// Programmatic construction with defaults for everything optional.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<Secret<String>>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: Some(client_secret.into()),
            client_secret_file: None,
            redirect_uri: redirect_uri.into(),
            environment: Environment::default(),
            base_url: None,
            timeout_secs: default_timeout(),
            timeout_override: None,
            debug: false,
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_override = Some(timeout);
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Load from a TOML file with a `[client]` table, then overlay the
    /// environment.
    ///
    /// Secret resolution order:
    /// 1. `VENDOR_CLIENT_SECRET` env var
    /// 2. `client_secret_file` path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = toml::from_str::<ConfigFile>(&contents)?.client;
        config.validate()?;

        if let Ok(secret) = std::env::var(CLIENT_SECRET_ENV) {
            config.client_secret = Some(Secret::new(secret));
        } else if let Some(ref secret_file) = config.client_secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read client_secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            let secret = secret.trim().to_owned();
            if !secret.is_empty() {
                config.client_secret = Some(Secret::new(secret));
            }
        }

        Ok(config)
    }

    /// Check the values the core relies on.
    pub fn validate(&self) -> common::Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(common::Error::Config("client_id must not be empty".into()));
        }

        let base_url = self.base_url();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {base_url}"
            )));
        }

        if self.timeout().is_zero() {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Effective host, without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.environment.base_url())
            .trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        self.timeout_override
            .unwrap_or(Duration::from_secs(self.timeout_secs))
    }

    /// Client registration for token requests. Fails when no secret was
    /// configured.
    pub fn client_credentials(&self) -> common::Result<ClientCredentials> {
        let client_secret = self.client_secret.clone().ok_or_else(|| {
            common::Error::MissingSecret(format!(
                "set {CLIENT_SECRET_ENV} or client_secret_file"
            ))
        })?;
        Ok(ClientCredentials {
            client_id: self.client_id.clone(),
            client_secret,
            redirect_uri: self.redirect_uri.clone(),
        })
    }

    /// Resolve config file path from CLI arg or `VENDOR_CONFIG` env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var(CONFIG_PATH_ENV) {
            return PathBuf::from(p);
        }
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }
}
