//! Login flow orchestration.
//!
//! A [`LoginFlow`] drives one request through the Authorization Code state
//! machine:
//!
//! ```text
//! Idle -> AwaitingCallback -> ExchangingToken -> FetchingProfile -> Completed
//!                    \                \                  \
//!                     +----------------+------------------+--> Failed
//! ```
//!
//! Nothing is held between the redirect and the callback; the callback leg is
//! rebuilt from its own URL and query parameters. The only shared data is the
//! immutable configuration and credentials, plus the pending-state store when
//! the state check is switched on.

use crate::authorize::{AuthorizationRequest, callback_uri};
use crate::callback::parse_callback;
use crate::config::LoginFlowConfig;
use crate::credentials::ClientCredentials;
use crate::error::{ConfigurationError, LoginError, LoginResult};
use crate::http::build_http_client;
use crate::profile::{UserProfile, UserProfileFetcher};
use crate::state::{InMemoryStateStore, PendingState, StateStore};
use crate::token::TokenExchangeClient;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::Url;

/// Stages of a single login flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStage {
    Idle,
    AwaitingCallback,
    ExchangingToken,
    FetchingProfile,
    Completed,
    Failed,
}

impl fmt::Display for FlowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::AwaitingCallback => "awaiting_callback",
            Self::ExchangingToken => "exchanging_token",
            Self::FetchingProfile => "fetching_profile",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

fn transition(from: FlowStage, to: FlowStage) {
    debug!(from = %from, to = %to, "Login flow transition");
}

/// Authorization Code flow against a single provider
#[derive(Clone)]
pub struct LoginFlow {
    config: Arc<LoginFlowConfig>,
    credentials: Option<ClientCredentials>,
    token_client: TokenExchangeClient,
    profile_fetcher: UserProfileFetcher,
    state_store: Option<Arc<dyn StateStore>>,
}

impl LoginFlow {
    /// Create the flow.
    ///
    /// Missing credentials do not fail construction: the server is expected
    /// to start anyway and every login attempt then fails with a
    /// configuration error.
    pub fn new(
        config: LoginFlowConfig,
        credentials: Option<ClientCredentials>,
    ) -> Result<Self, ConfigurationError> {
        let http_client = build_http_client(&config)?;
        let token_client =
            TokenExchangeClient::new(http_client.clone(), config.provider.token_endpoint.clone());
        let profile_fetcher = UserProfileFetcher::new(http_client, &config.provider);

        let state_store: Option<Arc<dyn StateStore>> = if config.require_state {
            Some(Arc::new(InMemoryStateStore::new()))
        } else {
            None
        };

        Ok(Self {
            config: Arc::new(config),
            credentials,
            token_client,
            profile_fetcher,
            state_store,
        })
    }

    /// Replace the pending-state store, switching the state check on.
    pub fn with_state_store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.state_store = Some(store);
        self
    }

    pub fn config(&self) -> &LoginFlowConfig {
        &self.config
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    fn credentials(&self) -> LoginResult<&ClientCredentials> {
        self.credentials.as_ref().ok_or_else(|| {
            error!("Client id/secret not configured, cannot run the login flow");
            LoginError::Configuration(ConfigurationError::MissingCredentials)
        })
    }

    /// Handle an "initiate" request: build the provider redirect.
    pub async fn initiate(&self, request_url: &Url) -> LoginResult<Url> {
        let credentials = self.credentials()?;

        let mut request =
            AuthorizationRequest::new(&self.config.provider, credentials, request_url);

        if let Some(store) = &self.state_store {
            // Abandoned logins never reach the callback; evict them here
            let evicted = store.cleanup_expired().await?;
            if evicted > 0 {
                debug!("Evicted {} expired pending states", evicted);
            }

            let pending =
                PendingState::new(request.redirect_uri.to_string(), self.config.state_ttl_seconds);
            request = request.with_state(pending.state.clone());
            store.store(pending).await?;
        }

        let redirect = request.to_url();
        transition(FlowStage::Idle, FlowStage::AwaitingCallback);
        debug!("Sending redirect to {}", redirect);

        Ok(redirect)
    }

    /// Handle a "callback" request: validate, exchange the code, fetch the
    /// profile. Any failure ends the flow; nothing is retried.
    pub async fn complete(
        &self,
        request_url: &Url,
        query: &HashMap<String, String>,
    ) -> LoginResult<UserProfile> {
        match self.run_callback(request_url, query).await {
            Ok(profile) => {
                transition(FlowStage::FetchingProfile, FlowStage::Completed);
                info!("Login completed for {}", profile.display_name);
                Ok(profile)
            }
            Err(e) => {
                debug!(to = %FlowStage::Failed, "Login flow transition");
                warn!(kind = e.kind(), "Login failed: {}", e);
                Err(e)
            }
        }
    }

    async fn run_callback(
        &self,
        request_url: &Url,
        query: &HashMap<String, String>,
    ) -> LoginResult<UserProfile> {
        let credentials = self.credentials()?;

        let code = parse_callback(query).into_result()?;
        debug!("Received authorization code.");

        let redirect_uri = callback_uri(request_url);
        self.verify_state(&redirect_uri, query).await?;

        transition(FlowStage::AwaitingCallback, FlowStage::ExchangingToken);
        let token = self
            .token_client
            .exchange_code_for_token(&code, &redirect_uri, credentials)
            .await?;

        transition(FlowStage::ExchangingToken, FlowStage::FetchingProfile);
        let profile = self
            .profile_fetcher
            .fetch_profile(&token.access_token)
            .await?;

        Ok(profile)
    }

    async fn verify_state(
        &self,
        redirect_uri: &Url,
        query: &HashMap<String, String>,
    ) -> LoginResult<()> {
        let Some(store) = &self.state_store else {
            return Ok(());
        };

        let state = query.get("state").ok_or(LoginError::InvalidState)?;
        let pending = store.take(state).await?;

        if pending.redirect_uri != redirect_uri.as_str() {
            warn!(
                "State was issued for {} but the callback arrived at {}",
                pending.redirect_uri, redirect_uri
            );
            return Err(LoginError::InvalidState);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use crate::error::CallbackError;
    use chrono::{Duration, Utc};

    fn github_config() -> LoginFlowConfig {
        LoginFlowConfig::new(ProviderConfig::github().unwrap())
    }

    fn flow() -> LoginFlow {
        let credentials = ClientCredentials::new("test_client_id", "test_secret").unwrap();
        LoginFlow::new(github_config(), Some(credentials)).unwrap()
    }

    #[tokio::test]
    async fn test_initiate_builds_redirect() {
        let request_url = Url::parse("http://localhost:8080/login").unwrap();
        let redirect = flow().initiate(&request_url).await.unwrap();

        assert!(
            redirect
                .as_str()
                .starts_with("https://github.com/login/oauth/authorize?")
        );
        assert!(redirect.as_str().contains("client_id=test_client_id"));
        assert!(!redirect.as_str().contains("state="));
    }

    #[tokio::test]
    async fn test_unconfigured_flow_fails() {
        let flow = LoginFlow::new(github_config(), None).unwrap();
        assert!(!flow.is_configured());

        let request_url = Url::parse("http://localhost:8080/login").unwrap();
        assert!(matches!(
            flow.initiate(&request_url).await,
            Err(LoginError::Configuration(ConfigurationError::MissingCredentials))
        ));
    }

    #[tokio::test]
    async fn test_callback_error_short_circuits() {
        let request_url = Url::parse("http://localhost:8080/oauth2callback").unwrap();
        let query = HashMap::from([("error".to_string(), "access_denied".to_string())]);

        // Endpoints point at github.com; reaching them would be a test bug
        let result = flow().complete(&request_url, &query).await;
        assert!(matches!(
            result,
            Err(LoginError::Callback(CallbackError::ProviderError { .. }))
        ));
    }

    #[tokio::test]
    async fn test_state_required_when_enabled() {
        let flow = flow().with_state_store(Arc::new(InMemoryStateStore::new()));
        let request_url = Url::parse("http://localhost:8080/oauth2callback").unwrap();
        let query = HashMap::from([("code".to_string(), "XYZ".to_string())]);

        assert!(matches!(
            flow.complete(&request_url, &query).await,
            Err(LoginError::InvalidState)
        ));
    }

    #[tokio::test]
    async fn test_initiate_evicts_expired_states() {
        let store = Arc::new(InMemoryStateStore::new());
        let flow = flow().with_state_store(store.clone());

        for _ in 0..100 {
            let mut abandoned =
                PendingState::new("http://localhost:8080/oauth2callback".to_string(), 600);
            abandoned.expires_at = Utc::now() - Duration::seconds(1);
            store.store(abandoned).await.unwrap();
        }
        assert_eq!(store.len().await, 100);

        let request_url = Url::parse("http://localhost:8080/login").unwrap();
        flow.initiate(&request_url).await.unwrap();
        assert_eq!(store.len().await, 1);

        // Unexpired states from other logins are kept
        flow.initiate(&request_url).await.unwrap();
        assert_eq!(store.len().await, 2);
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(FlowStage::AwaitingCallback.to_string(), "awaiting_callback");
        assert_eq!(FlowStage::Failed.to_string(), "failed");
    }
}
