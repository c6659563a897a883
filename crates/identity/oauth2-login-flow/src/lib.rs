//! OAuth2 Authorization Code login flow.
//!
//! This crate implements the three-legged flow against a single identity
//! provider (GitHub by default): redirect the browser to the provider,
//! validate the callback, exchange the authorization code for an access
//! token and fetch the user's profile with it. HTTP routing and rendering
//! are left to the caller; see [`LoginFlow`] for the entry points.

mod authorize;
mod callback;
mod config;
mod credentials;
mod error;
mod flow;
mod http;
mod profile;
mod state;
mod token;


pub use authorize::{AuthorizationRequest, CALLBACK_PATH, build_redirect_url, callback_uri};
pub use callback::{CallbackResult, parse_callback};
pub use config::{
    DEFAULT_HTTP_TIMEOUT_SECONDS, DEFAULT_STATE_TTL_SECONDS, GITHUB_AUTHORIZE_ENDPOINT,
    GITHUB_PROFILE_ENDPOINT, GITHUB_TOKEN_ENDPOINT, LoginFlowConfig, ProviderConfig,
    default_name_fields, default_user_agent,
};
pub use credentials::ClientCredentials;
pub use error::{
    CallbackError, ConfigurationError, LoginError, LoginResult, ProfileFetchError,
    TokenExchangeError,
};
pub use flow::{FlowStage, LoginFlow};
pub use http::build_http_client;
pub use profile::{TokenPlacement, UserProfile, UserProfileFetcher};
pub use state::{InMemoryStateStore, PendingState, StateStore};
pub use token::{TokenExchangeClient, TokenResponse};
