use anyhow::{Context, Result};
use oauth2_login_server::{config::Config, routes, telemetry};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    telemetry::init_tracing(&config)?;
    info!("Starting OAuth2 login server");
    config.log_sources();

    let app_state = routes::AppState::from_config(&config)?;
    if !app_state.flow.is_configured() {
        warn!("Serving without client credentials; every login will fail");
    }

    let app = routes::router(app_state);

    let bind_addr = config.socket_addr();
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    info!("Webserver running on http://{}. Press Ctrl-C to quit.", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Webserver stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
