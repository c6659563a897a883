//! Authorization redirect construction (step one of the flow).

use crate::config::ProviderConfig;
use crate::credentials::ClientCredentials;
use url::Url;

/// Path the provider redirects the browser back to.
pub const CALLBACK_PATH: &str = "/oauth2callback";

/// Derive the callback URI from the URL of the current request.
///
/// Scheme, host and port are kept; the path is replaced with
/// [`CALLBACK_PATH`] and any query or fragment is dropped. The same
/// derivation is used on the callback itself so both legs of the flow send
/// an identical `redirect_uri`.
pub fn callback_uri(request_url: &Url) -> Url {
    let mut url = request_url.clone();
    url.set_path(CALLBACK_PATH);
    url.set_query(None);
    url.set_fragment(None);
    url
}

/// Parameters of the provider authorize redirect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub authorize_endpoint: Url,
    pub client_id: String,
    pub redirect_uri: Url,
    pub scopes: Vec<String>,
    pub state: Option<String>,
}

impl AuthorizationRequest {
    pub fn new(
        provider: &ProviderConfig,
        credentials: &ClientCredentials,
        request_url: &Url,
    ) -> Self {
        Self {
            authorize_endpoint: provider.authorize_endpoint.clone(),
            client_id: credentials.client_id().to_string(),
            redirect_uri: callback_uri(request_url),
            scopes: provider.scopes.clone(),
            state: None,
        }
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Render the full redirect target.
    pub fn to_url(&self) -> Url {
        let mut url = self.authorize_endpoint.clone();

        {
            let mut params = url.query_pairs_mut();
            params.append_pair("client_id", &self.client_id);
            params.append_pair("redirect_uri", self.redirect_uri.as_str());

            if !self.scopes.is_empty() {
                params.append_pair("scope", &self.scopes.join(" "));
            }

            if let Some(state) = &self.state {
                params.append_pair("state", state);
            }
        }

        url
    }
}

/// Build the provider redirect for an "initiate" request.
pub fn build_redirect_url(
    provider: &ProviderConfig,
    credentials: &ClientCredentials,
    request_url: &Url,
) -> Url {
    AuthorizationRequest::new(provider, credentials, request_url).to_url()
}
