//! Login flow configuration types.

use crate::error::ConfigurationError;
use crate::profile::TokenPlacement;
use url::Url;

pub const GITHUB_AUTHORIZE_ENDPOINT: &str = "https://github.com/login/oauth/authorize";
pub const GITHUB_TOKEN_ENDPOINT: &str = "https://github.com/login/oauth/access_token";
pub const GITHUB_PROFILE_ENDPOINT: &str = "https://api.github.com/user";

pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_STATE_TTL_SECONDS: u64 = 600; // 10 minutes

/// Identity provider endpoints and conventions
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub authorize_endpoint: Url,
    pub token_endpoint: Url,
    pub profile_endpoint: Url,
    /// Appended as a space separated `scope` parameter when non-empty
    pub scopes: Vec<String>,
    /// Sent on every outbound call; GitHub rejects API calls without one
    pub user_agent: String,
    /// How the access token travels on the profile request
    pub token_placement: TokenPlacement,
    /// Profile fields tried in order for the display name
    pub name_fields: Vec<String>,
}

impl ProviderConfig {
    /// Build a provider from raw endpoint strings, validating each one.
    pub fn from_endpoints(
        authorize_endpoint: &str,
        token_endpoint: &str,
        profile_endpoint: &str,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self {
            authorize_endpoint: parse_endpoint("authorize_endpoint", authorize_endpoint)?,
            token_endpoint: parse_endpoint("token_endpoint", token_endpoint)?,
            profile_endpoint: parse_endpoint("profile_endpoint", profile_endpoint)?,
            scopes: Vec::new(),
            user_agent: default_user_agent(),
            token_placement: TokenPlacement::default(),
            name_fields: default_name_fields(),
        })
    }

    /// GitHub OAuth app endpoints
    pub fn github() -> Result<Self, ConfigurationError> {
        Self::from_endpoints(
            GITHUB_AUTHORIZE_ENDPOINT,
            GITHUB_TOKEN_ENDPOINT,
            GITHUB_PROFILE_ENDPOINT,
        )
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_token_placement(mut self, placement: TokenPlacement) -> Self {
        self.token_placement = placement;
        self
    }

    pub fn with_name_fields(mut self, fields: Vec<String>) -> Self {
        self.name_fields = fields;
        self
    }
}


/// Login flow configuration
#[derive(Debug, Clone)]
pub struct LoginFlowConfig {
    pub provider: ProviderConfig,
    /// Upper bound for each outbound provider call
    pub http_timeout_seconds: u64,
    /// Round-trip a random `state` value through the provider redirect
    pub require_state: bool,
    pub state_ttl_seconds: u64,
}

impl LoginFlowConfig {
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            provider,
            http_timeout_seconds: DEFAULT_HTTP_TIMEOUT_SECONDS,
            require_state: false,
            state_ttl_seconds: DEFAULT_STATE_TTL_SECONDS,
        }
    }

    pub fn with_http_timeout(mut self, seconds: u64) -> Self {
        self.http_timeout_seconds = seconds;
        self
    }

    pub fn with_state_check(mut self, enabled: bool) -> Self {
        self.require_state = enabled;
        self
    }

    pub fn with_state_ttl(mut self, seconds: u64) -> Self {
        self.state_ttl_seconds = seconds;
        self
    }
}

pub fn default_user_agent() -> String {
    concat!("oauth2-login/", env!("CARGO_PKG_VERSION")).to_string()
}

pub fn default_name_fields() -> Vec<String> {
    vec!["name".to_string(), "login".to_string()]
}

fn parse_endpoint(field: &'static str, value: &str) -> Result<Url, ConfigurationError> {
    Url::parse(value).map_err(|source| ConfigurationError::InvalidEndpoint { field, source })
}
