//! End-to-end tests for the login server
//!
//! These tests drive the full router against a mocked identity provider:
//! - Landing page and 404 fallback
//! - `/login` redirect construction
//! - `/oauth2callback` success and failure paths

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use oauth2_login_server::config::Config;
use oauth2_login_server::routes::{AppState, router};
use std::collections::HashMap;
use tower::ServiceExt;
use url::Url;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(provider: &MockServer) -> Config {
    let mut config = Config::default();
    config.provider.authorize_endpoint = format!("{}/login/oauth/authorize", provider.uri());
    config.provider.token_endpoint = format!("{}/login/oauth/access_token", provider.uri());
    config.provider.profile_endpoint = format!("{}/user", provider.uri());
    config.credentials.client_id = Some("test_client_id".to_string());
    config.credentials.client_secret = Some("test_secret".to_string());
    config.flow.http_timeout_seconds = 5;
    config
}

fn app(config: &Config) -> Router {
    router(AppState::from_config(config).unwrap())
}

async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .uri(uri)
            .header(header::HOST, "localhost:3000")
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn mount_happy_provider(provider: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .and(body_string_contains("code=XYZ"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "abc",
            "token_type": "bearer"
        })))
        .mount(provider)
        .await;

    Mock::given(method("GET"))
        .and(path("/user"))
        .and(query_param("access_token", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "Alice",
            "id": 42
        })))
        .mount(provider)
        .await;
}

#[tokio::test]
async fn test_landing_page() {
    let provider = MockServer::start().await;
    let response = get(app(&test_config(&provider)), "/").await;

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/html"));
    assert!(body_text(response).await.contains("<a href=\"/login\">login</a>"));
}

#[tokio::test]
async fn test_login_redirects_to_provider() {
    let provider = MockServer::start().await;
    let response = get(app(&test_config(&provider)), "/login").await;

    assert_eq!(response.status(), StatusCode::FOUND);

    let location = response.headers()[header::LOCATION].to_str().unwrap();
    let location = Url::parse(location).unwrap();
    let provider_url = Url::parse(&provider.uri()).unwrap();

    assert_eq!(location.host_str(), provider_url.host_str());
    assert_eq!(location.port(), provider_url.port());
    assert_eq!(location.path(), "/login/oauth/authorize");

    let params: HashMap<_, _> = location.query_pairs().into_owned().collect();
    assert_eq!(params["client_id"], "test_client_id");
    assert_eq!(params["redirect_uri"], "http://localhost:3000/oauth2callback");
    assert!(!params.contains_key("state"));
}

#[tokio::test]
async fn test_login_uses_public_base_url() {
    let provider = MockServer::start().await;
    let mut config = test_config(&provider);
    config.server.public_base_url = Some("https://login.example.com".to_string());

    let response = get(app(&config), "/login").await;
    let location = Url::parse(response.headers()[header::LOCATION].to_str().unwrap()).unwrap();
    let params: HashMap<_, _> = location.query_pairs().into_owned().collect();

    assert_eq!(params["redirect_uri"], "https://login.example.com/oauth2callback");
}

#[tokio::test]
async fn test_callback_success() {
    let provider = MockServer::start().await;
    mount_happy_provider(&provider).await;

    let response = get(app(&test_config(&provider)), "/oauth2callback?code=XYZ").await;

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
    assert_eq!(body_text(response).await, "Welcome Alice, you are now logged in.");
}

#[tokio::test]
async fn test_callback_provider_error() {
    let provider = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&provider)
        .await;

    let response = get(
        app(&test_config(&provider)),
        "/oauth2callback?error=access_denied",
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "Login failed.");
}

#[tokio::test]
async fn test_callback_missing_code() {
    let provider = MockServer::start().await;
    let response = get(app(&test_config(&provider)), "/oauth2callback").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "Login failed.");
}

#[tokio::test]
async fn test_callback_token_error_is_not_leaked() {
    let provider = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": "bad_verification_code",
            "error_description": "The code passed is incorrect or expired."
        })))
        .mount(&provider)
        .await;

    let response = get(app(&test_config(&provider)), "/oauth2callback?code=stale").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_text(response).await;
    assert_eq!(body, "Login failed.");
    assert!(!body.contains("bad_verification_code"));
}

#[tokio::test]
async fn test_callback_profile_error() {
    let provider = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"access_token": "abc"})),
        )
        .mount(&provider)
        .await;

    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&provider)
        .await;

    let response = get(app(&test_config(&provider)), "/oauth2callback?code=XYZ").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "Login failed.");
}

#[tokio::test]
async fn test_unconfigured_credentials_fail_login() {
    let provider = MockServer::start().await;
    let mut config = test_config(&provider);
    config.credentials.client_secret = None;

    let response = get(app(&config), "/login").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "Login failed.");

    // The landing page is still served
    let response = get(app(&config), "/").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_path() {
    let provider = MockServer::start().await;
    let response = get(app(&test_config(&provider)), "/unknown/path").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(response).await, "404 - Not found.");
}

#[tokio::test]
async fn test_missing_host_is_bad_request() {
    let provider = MockServer::start().await;
    let response = app(&test_config(&provider))
        .oneshot(Request::builder().uri("/login").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_state_round_trip_through_router() {
    let provider = MockServer::start().await;
    mount_happy_provider(&provider).await;

    let mut config = test_config(&provider);
    config.flow.require_state = true;
    let app = app(&config);

    let response = get(app.clone(), "/login").await;
    let location = Url::parse(response.headers()[header::LOCATION].to_str().unwrap()).unwrap();
    let state = location
        .query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned())
        .unwrap();

    // Without the state the callback is refused
    let response = get(app.clone(), "/oauth2callback?code=XYZ").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let response = get(app, &format!("/oauth2callback?code=XYZ&state={}", state)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "Welcome Alice, you are now logged in.");
}

#[tokio::test]
async fn test_responses_are_gzip_compressed() {
    let provider = MockServer::start().await;
    let response = app(&test_config(&provider))
        .oneshot(
            Request::builder()
                .uri("/")
                .header(header::HOST, "localhost:3000")
                .header(header::ACCEPT_ENCODING, "gzip")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_ENCODING], "gzip");
}
