//! HTTP routes for the login server.

use crate::config::Config;
use anyhow::{Context, Result};
use axum::{
    Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, Uri, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use oauth2_login_flow::{CALLBACK_PATH, LoginError, LoginFlow};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;
use url::Url;

pub const LANDING_PAGE: &str = "<html><body><a href=\"/login\">login</a></body></html>";
pub const LOGIN_FAILED_BODY: &str = "Login failed.";
pub const NOT_FOUND_BODY: &str = "404 - Not found.";
pub const BAD_REQUEST_BODY: &str = "Bad request.";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub flow: LoginFlow,
    pub public_base_url: Option<Arc<Url>>,
}

impl AppState {
    pub fn new(flow: LoginFlow, public_base_url: Option<Url>) -> Self {
        Self {
            flow,
            public_base_url: public_base_url.map(Arc::new),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let flow = LoginFlow::new(config.flow_config()?, config.client_credentials())
            .context("Failed to initialize login flow")?;
        Ok(Self::new(flow, config.public_base_url()?))
    }
}

/// Handler failures, rendered without any provider or internal detail
#[derive(Debug)]
pub enum AppError {
    /// Already logged by the flow
    Login(LoginError),
    BadRequest(String),
}

impl From<LoginError> for AppError {
    fn from(e: LoginError) -> Self {
        Self::Login(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::Login(_) => (StatusCode::INTERNAL_SERVER_ERROR, LOGIN_FAILED_BODY).into_response(),
            Self::BadRequest(reason) => {
                warn!("Rejecting request: {}", reason);
                (StatusCode::BAD_REQUEST, BAD_REQUEST_BODY).into_response()
            }
        }
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/login", get(login_handler))
        .route(CALLBACK_PATH, get(oauth2_callback_handler))
        .fallback(not_found_handler)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Reconstruct the absolute URL the browser used for this request.
///
/// A configured public base URL wins; otherwise the scheme comes from
/// `X-Forwarded-Proto` (default `http`) and the authority from the request
/// target or the `Host` header.
pub fn request_url(
    public_base_url: Option<&Url>,
    headers: &HeaderMap,
    uri: &Uri,
) -> Result<Url, AppError> {
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

    if let Some(base) = public_base_url {
        return base
            .join(path_and_query)
            .map_err(|e| AppError::BadRequest(format!("cannot join request path: {}", e)));
    }

    let host = match uri.authority() {
        Some(authority) => authority.as_str(),
        None => headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::BadRequest("missing Host header".to_string()))?,
    };

    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .or_else(|| uri.scheme_str())
        .unwrap_or("http");

    Url::parse(&format!("{}://{}{}", scheme, host, path_and_query))
        .map_err(|e| AppError::BadRequest(format!("malformed request URL: {}", e)))
}

/// Landing page with a login link
async fn index_handler() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

/// Redirect the browser to the provider's authorize endpoint
async fn login_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Response, AppError> {
    let url = request_url(state.public_base_url.as_deref(), &headers, &uri)?;
    let redirect = state.flow.initiate(&url).await?;

    Ok((StatusCode::FOUND, [(header::LOCATION, redirect.to_string())]).into_response())
}

/// Handle the provider's redirect back to us
async fn oauth2_callback_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
) -> Result<String, AppError> {
    let url = request_url(state.public_base_url.as_deref(), &headers, &uri)?;
    let profile = state.flow.complete(&url, &query).await?;

    Ok(format!(
        "Welcome {}, you are now logged in.",
        profile.display_name
    ))
}

async fn not_found_handler(uri: Uri) -> (StatusCode, &'static str) {
    warn!("404 for {}", uri);
    (StatusCode::NOT_FOUND, NOT_FOUND_BODY)
}
