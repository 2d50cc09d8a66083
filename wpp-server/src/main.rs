//! wpp-server: WhatsApp auto-responder for the restaurant
//!
//! Long-running service that:
//! - Receives WPPConnect and Z-API webhooks
//! - Answers inbound messages from the auto-response rules
//! - Manages WPPConnect sessions (QR code, status, logout)
//! - Serves the public menu with likes/shares and the admin API

mod alerts;
mod api;
mod auth;
mod config;
mod crm;
mod db;
mod error;
mod export;
mod finance;
mod provider;
mod responder;
mod session;
mod state;
mod validation;
mod webhook;

use std::net::SocketAddr;

use config::Config;
use error::BoxError;
use state::AppState;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wpp_server=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    let http_port = config.http_port;

    tracing::info!("Starting wpp-server (env: {})", config.environment);

    // Initialize application state
    let state = AppState::new(config).await?;

    // Periodic rate limiter cleanup (every 5 minutes)
    let rate_limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            rate_limiter.cleanup().await;
        }
    });

    let app = api::router(state);

    let addr = format!("0.0.0.0:{http_port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("wpp-server HTTP listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
