//! Login flow error types.

use thiserror::Error;

pub type LoginResult<T> = Result<T, LoginError>;

/// Any failure that ends a login flow in the `Failed` stage.
///
/// The variants carry enough detail for server-side logging. None of it is
/// meant for the browser.
#[derive(Debug, Error)]
pub enum LoginError {
    #[error("Invalid configuration: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Callback rejected: {0}")]
    Callback(#[from] CallbackError),

    #[error("Token exchange failed: {0}")]
    TokenExchange(#[from] TokenExchangeError),

    #[error("Profile fetch failed: {0}")]
    ProfileFetch(#[from] ProfileFetchError),

    #[error("Invalid state parameter")]
    InvalidState,
}

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("client id/secret not configured")]
    MissingCredentials,

    #[error("{field} is not a valid URL: {source}")]
    InvalidEndpoint {
        field: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("HTTP client could not be built: {0}")]
    HttpClient(#[source] reqwest::Error),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CallbackError {
    #[error("provider returned error '{error}': {}", .description.as_deref().unwrap_or("No description"))]
    ProviderError {
        error: String,
        description: Option<String>,
    },

    #[error("Missing authorization code")]
    MissingCode,
}

#[derive(Debug, Error)]
pub enum TokenExchangeError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider rejected the code: {0}")]
    Provider(String),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid token response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum ProfileFetchError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid profile response: {0}")]
    InvalidResponse(String),
}

impl LoginError {
    /// Short, stable label used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Callback(_) => "callback",
            Self::TokenExchange(_) => "token_exchange",
            Self::ProfileFetch(_) => "profile_fetch",
            Self::InvalidState => "invalid_state",
        }
    }
}
