//! Authorization code to access token exchange.

use crate::credentials::ClientCredentials;
use crate::error::TokenExchangeError;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::fmt;
use tracing::{debug, error, info};
use url::Url;

/// Successful token endpoint response
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    pub scope: Option<String>,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Client for the provider's token endpoint
#[derive(Debug, Clone)]
pub struct TokenExchangeClient {
    http_client: Client,
    token_endpoint: Url,
}

impl TokenExchangeClient {
    pub fn new(http_client: Client, token_endpoint: Url) -> Self {
        Self {
            http_client,
            token_endpoint,
        }
    }

    /// Exchange an authorization code for an access token.
    ///
    /// Makes exactly one POST; failures are returned, never retried.
    pub async fn exchange_code_for_token(
        &self,
        code: &str,
        redirect_uri: &Url,
        credentials: &ClientCredentials,
    ) -> Result<TokenResponse, TokenExchangeError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri.as_str()),
        ];

        debug!("Sending token request to {}", self.token_endpoint);

        let response = self
            .http_client
            .post(self.token_endpoint.clone())
            .basic_auth(credentials.client_id(), Some(credentials.client_secret()))
            // Some providers answer form-encoded unless JSON is asked for
            .header(ACCEPT, "application/json")
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        let token_response = parse_token_response(status, &body)?;
        info!("Successfully exchanged code for token");
        Ok(token_response)
    }
}

fn parse_token_response(status: StatusCode, body: &str) -> Result<TokenResponse, TokenExchangeError> {
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) if !status.is_success() => {
            return Err(TokenExchangeError::Status {
                status: status.as_u16(),
                body: body.to_string(),
            });
        }
        Err(e) => return Err(TokenExchangeError::InvalidResponse(e.to_string())),
    };

    if let Some(provider_error) = value.get("error") {
        let provider_error = provider_error
            .as_str()
            .map(String::from)
            .unwrap_or_else(|| provider_error.to_string());
        error!("Error in token response: {}", provider_error);
        error!("Details: {}", body);

        let detail = match value.get("error_description").and_then(|v| v.as_str()) {
            Some(description) => format!("{}: {}", provider_error, description),
            None => provider_error,
        };
        return Err(TokenExchangeError::Provider(detail));
    }

    if !status.is_success() {
        return Err(TokenExchangeError::Status {
            status: status.as_u16(),
            body: body.to_string(),
        });
    }

    serde_json::from_value(value).map_err(|e| TokenExchangeError::InvalidResponse(e.to_string()))
}
