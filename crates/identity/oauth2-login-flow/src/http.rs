//! Shared outbound HTTP client.

use crate::config::LoginFlowConfig;
use crate::error::ConfigurationError;
use reqwest::Client;
use std::time::Duration;

/// Build the client used for token and profile calls.
///
/// One client per process; it carries the per-call timeout and the
/// provider's required `User-Agent`, and pools connections to the provider.
pub fn build_http_client(config: &LoginFlowConfig) -> Result<Client, ConfigurationError> {
    Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_seconds))
        .user_agent(config.provider.user_agent.as_str())
        .build()
        .map_err(ConfigurationError::HttpClient)
}
