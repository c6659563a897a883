//! Resource-owner profile retrieval.

use crate::config::ProviderConfig;
use crate::error::ProfileFetchError;
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, warn};
use url::Url;

/// Where the access token is attached on the profile request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPlacement {
    /// `?access_token=...`, the legacy GitHub convention
    #[default]
    Query,
    /// `Authorization: Bearer ...`
    Header,
}

/// Authenticated user's profile
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub display_name: String,
    pub raw_fields: Map<String, Value>,
}

impl UserProfile {
    /// Wrap a profile object, taking the display name from the first
    /// `name_fields` entry that holds a string.
    pub fn from_fields(raw_fields: Map<String, Value>, name_fields: &[String]) -> Self {
        let display_name = name_fields
            .iter()
            .find_map(|field| raw_fields.get(field).and_then(Value::as_str))
            .map(String::from)
            .unwrap_or_else(|| {
                warn!("Profile has none of the display name fields {:?}", name_fields);
                String::new()
            });

        Self {
            display_name,
            raw_fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.raw_fields.get(name)
    }
}

/// Client for the provider's user profile endpoint
#[derive(Debug, Clone)]
pub struct UserProfileFetcher {
    http_client: Client,
    profile_endpoint: Url,
    token_placement: TokenPlacement,
    name_fields: Vec<String>,
}

impl UserProfileFetcher {
    pub fn new(http_client: Client, provider: &ProviderConfig) -> Self {
        Self {
            http_client,
            profile_endpoint: provider.profile_endpoint.clone(),
            token_placement: provider.token_placement,
            name_fields: provider.name_fields.clone(),
        }
    }

    /// Fetch the profile of the user the access token belongs to.
    pub async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, ProfileFetchError> {
        debug!("Access token received. Fetching user details.");

        let request = self
            .http_client
            .get(self.profile_endpoint.clone())
            .header(ACCEPT, "application/json");

        let request = match self.token_placement {
            TokenPlacement::Query => request.query(&[("access_token", access_token)]),
            TokenPlacement::Header => request.bearer_auth(access_token),
        };

        // reqwest errors render the request URL, which may carry the token
        let response = request
            .send()
            .await
            .map_err(|e| ProfileFetchError::Transport(e.without_url()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProfileFetchError::Transport(e.without_url()))?;

        if !status.is_success() {
            error!("User details request failed with status {}", status);
            return Err(ProfileFetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let value: Value = serde_json::from_str(&body).map_err(|e| {
            error!("Error while parsing JSON: {}", e);
            ProfileFetchError::InvalidResponse(e.to_string())
        })?;

        match value {
            Value::Object(fields) => {
                debug!("User details received.");
                Ok(UserProfile::from_fields(fields, &self.name_fields))
            }
            other => Err(ProfileFetchError::InvalidResponse(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
