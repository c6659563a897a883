//! Registered client credentials for the identity provider.

use crate::error::ConfigurationError;
use std::fmt;

/// Client identifier and secret issued by the provider.
///
/// Both values are non-empty for any instance that exists; construction goes
/// through [`ClientCredentials::new`]. The secret is redacted from `Debug`
/// output so the struct can sit inside logged configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    client_id: String,
    client_secret: String,
}

impl ClientCredentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, ConfigurationError> {
        let client_id = client_id.into();
        let client_secret = client_secret.into();

        if client_id.trim().is_empty() || client_secret.trim().is_empty() {
            return Err(ConfigurationError::MissingCredentials);
        }

        Ok(Self {
            client_id,
            client_secret,
        })
    }

    /// Build from optionally configured values, treating absent and blank alike.
    pub fn from_optional(
        client_id: Option<&str>,
        client_secret: Option<&str>,
    ) -> Result<Self, ConfigurationError> {
        match (client_id, client_secret) {
            (Some(id), Some(secret)) => Self::new(id, secret),
            _ => Err(ConfigurationError::MissingCredentials),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}
