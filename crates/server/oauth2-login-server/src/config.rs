//! Configuration module for the login server
//!
//! Sources, lowest precedence first:
//! - Built-in defaults (GitHub endpoints, port 8080)
//! - Configuration file (`config.toml`, or the path in `OAUTH2_LOGIN_CONFIG_FILE`)
//! - Environment variables with the `OAUTH2_LOGIN` prefix, `__` between
//!   sections, e.g. `OAUTH2_LOGIN__SERVER__PORT=9000`
//! - Direct overrides: `GITHUB_CLIENT_ID`, `GITHUB_CLIENT_SECRET`, `HOST`,
//!   `PORT`, `RUST_LOG`
//!
//! Missing client credentials are deliberately not a load or validation
//! error: the server starts and logs the problem, and logins fail until the
//! credentials are supplied.

use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File};
use oauth2_login_flow::{
    ClientCredentials, DEFAULT_HTTP_TIMEOUT_SECONDS, DEFAULT_STATE_TTL_SECONDS,
    GITHUB_AUTHORIZE_ENDPOINT, GITHUB_PROFILE_ENDPOINT, GITHUB_TOKEN_ENDPOINT, LoginFlowConfig,
    ProviderConfig, TokenPlacement, default_name_fields, default_user_agent,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use tracing::{error, info};
use url::Url;

/// Main configuration struct for the login server
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Identity provider endpoints
    pub provider: ProviderSettings,

    /// Registered OAuth app credentials
    pub credentials: CredentialsConfig,

    /// Flow behaviour
    pub flow: FlowSettings,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Sources applied on load, logged once tracing is installed
    #[serde(skip)]
    pub sources: Vec<String>,
}

/// Server network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to (default: 127.0.0.1)
    pub host: IpAddr,

    /// Port to bind to (default: 8080)
    pub port: u16,

    /// External base URL, when the server sits behind a proxy. Used instead
    /// of the request's Host header to derive the callback URI.
    pub public_base_url: Option<String>,
}

/// Identity provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub authorize_endpoint: String,
    pub token_endpoint: String,
    pub profile_endpoint: String,

    /// Scopes to request (default: none)
    pub scopes: Vec<String>,

    pub user_agent: String,

    /// `query` (default) or `header`
    pub token_placement: TokenPlacement,

    /// Profile fields tried in order for the welcome name
    pub name_fields: Vec<String>,
}

/// Client credentials
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Login flow configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowSettings {
    /// Timeout for each outbound provider call (default: 30)
    pub http_timeout_seconds: u64,

    /// Round-trip a CSRF `state` value through the provider (default: false)
    pub require_state: bool,

    /// Lifetime of an issued `state` (default: 600)
    pub state_ttl_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter string
    pub level: String,

    /// Log format (pretty, json, compact)
    pub format: String,
}

// Default value functions
fn default_host() -> IpAddr {
    IpAddr::from([127, 0, 0, 1])
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "debug".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_base_url: None,
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            authorize_endpoint: GITHUB_AUTHORIZE_ENDPOINT.to_string(),
            token_endpoint: GITHUB_TOKEN_ENDPOINT.to_string(),
            profile_endpoint: GITHUB_PROFILE_ENDPOINT.to_string(),
            scopes: Vec::new(),
            user_agent: default_user_agent(),
            token_placement: TokenPlacement::default(),
            name_fields: default_name_fields(),
        }
    }
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            http_timeout_seconds: DEFAULT_HTTP_TIMEOUT_SECONDS,
            require_state: false,
            state_ttl_seconds: DEFAULT_STATE_TTL_SECONDS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from environment and optional config file
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("OAUTH2_LOGIN_CONFIG_FILE")
            .unwrap_or_else(|_| "config.toml".to_string());

        let mut builder = ConfigBuilder::builder();

        let file_found = Path::new(&config_path).exists();
        if file_found {
            builder = builder.add_source(File::with_name(&config_path));
        }

        builder = builder.add_source(
            Environment::with_prefix("OAUTH2_LOGIN")
                .separator("__") // e.g. OAUTH2_LOGIN__SERVER__PORT
                .list_separator(",")
                .with_list_parse_key("provider.scopes")
                .with_list_parse_key("provider.name_fields")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        let mut settings: Config = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        if file_found {
            settings.sources.push(format!("file {}", config_path));
        }
        settings.apply_env_overrides()?;
        settings.validate()?;

        Ok(settings)
    }

    /// Load configuration from a single file, without environment sources
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut settings: Config = ConfigBuilder::builder()
            .add_source(File::from(path))
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path.display()))?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        settings.sources.push(format!("file {}", path.display()));
        settings.validate()?;
        Ok(settings)
    }

    /// Apply direct environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(client_id) = std::env::var("GITHUB_CLIENT_ID") {
            self.sources.push("GITHUB_CLIENT_ID environment variable".to_string());
            self.credentials.client_id = Some(client_id);
        }

        if let Ok(client_secret) = std::env::var("GITHUB_CLIENT_SECRET") {
            self.sources.push("GITHUB_CLIENT_SECRET environment variable".to_string());
            self.credentials.client_secret = Some(client_secret);
        }

        if let Ok(host) = std::env::var("HOST") {
            self.sources.push("HOST environment variable".to_string());
            self.server.host = host.parse().context("Invalid HOST value")?;
        }

        if let Ok(port) = std::env::var("PORT") {
            self.sources.push("PORT environment variable".to_string());
            self.server.port = port.parse().context("Invalid PORT value")?;
        }

        if let Ok(log_level) = std::env::var("RUST_LOG") {
            self.sources.push("RUST_LOG environment variable".to_string());
            self.logging.level = log_level;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        if let Some(base) = &self.server.public_base_url {
            Url::parse(base)
                .with_context(|| format!("Invalid server.public_base_url '{}'", base))?;
        }

        for (field, value) in [
            ("provider.authorize_endpoint", &self.provider.authorize_endpoint),
            ("provider.token_endpoint", &self.provider.token_endpoint),
            ("provider.profile_endpoint", &self.provider.profile_endpoint),
        ] {
            Url::parse(value).with_context(|| format!("Invalid {} '{}'", field, value))?;
        }

        if self.provider.user_agent.trim().is_empty() {
            anyhow::bail!("provider.user_agent cannot be empty");
        }

        if self.flow.http_timeout_seconds == 0 {
            anyhow::bail!("flow.http_timeout_seconds must be greater than 0");
        }

        if self.flow.require_state && self.flow.state_ttl_seconds == 0 {
            anyhow::bail!("flow.state_ttl_seconds must be greater than 0 when require_state is set");
        }

        // A full filter string is passed through to EnvFilter as-is
        if !self.is_filter_string() {
            let valid_levels = ["trace", "debug", "info", "warn", "error"];
            let level_lower = self.logging.level.to_lowercase();
            if !valid_levels.contains(&level_lower.as_str()) {
                anyhow::bail!(
                    "Invalid log level '{}'. Must be one of: {:?}",
                    self.logging.level,
                    valid_levels
                );
            }
        }

        let valid_formats = ["pretty", "json", "compact"];
        let format_lower = self.logging.format.to_lowercase();
        if !valid_formats.contains(&format_lower.as_str()) {
            anyhow::bail!(
                "Invalid log format '{}'. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            );
        }

        Ok(())
    }

    /// Report where the configuration came from. Call after tracing is set up.
    pub fn log_sources(&self) {
        if self.sources.is_empty() {
            info!("No config file or overrides found, using defaults");
        }
        for source in &self.sources {
            info!("Configuration loaded from {}", source);
        }
    }

    /// Get the socket address for the server
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.server.host, self.server.port))
    }

    fn is_filter_string(&self) -> bool {
        self.logging.level.contains('=') || self.logging.level.contains(',')
    }

    /// Get the log filter string for tracing
    pub fn log_filter(&self) -> String {
        if self.is_filter_string() {
            self.logging.level.clone()
        } else {
            // Our crates at the configured level, everything else at info
            let level = self.logging.level.to_lowercase();
            format!(
                "oauth2_login_server={},oauth2_login_flow={},info",
                level, level
            )
        }
    }

    /// External base URL, if one is configured
    pub fn public_base_url(&self) -> Result<Option<Url>> {
        self.server
            .public_base_url
            .as_deref()
            .map(|base| Url::parse(base).context("Invalid server.public_base_url"))
            .transpose()
    }

    /// Build the login flow configuration
    pub fn flow_config(&self) -> Result<LoginFlowConfig> {
        let provider = ProviderConfig::from_endpoints(
            &self.provider.authorize_endpoint,
            &self.provider.token_endpoint,
            &self.provider.profile_endpoint,
        )
        .context("Invalid provider configuration")?
        .with_scopes(self.provider.scopes.clone())
        .with_user_agent(self.provider.user_agent.clone())
        .with_token_placement(self.provider.token_placement)
        .with_name_fields(self.provider.name_fields.clone());

        Ok(LoginFlowConfig::new(provider)
            .with_http_timeout(self.flow.http_timeout_seconds)
            .with_state_check(self.flow.require_state)
            .with_state_ttl(self.flow.state_ttl_seconds))
    }

    /// Client credentials, or `None` (logged) when they are not configured
    pub fn client_credentials(&self) -> Option<ClientCredentials> {
        match ClientCredentials::from_optional(
            self.credentials.client_id.as_deref(),
            self.credentials.client_secret.as_deref(),
        ) {
            Ok(credentials) => Some(credentials),
            Err(e) => {
                error!(
                    "GitHub {} - set GITHUB_CLIENT_ID and GITHUB_CLIENT_SECRET or the [credentials] section of the config file",
                    e
                );
                None
            }
        }
    }
}
