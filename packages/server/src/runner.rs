//! Server execution logic.

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use gavel_shared::heartbeat::{HEARTBEAT_SWEEP_PERIOD, SERVER_HEARTBEAT_TIMEOUT};
use gavel_shared::time::SystemClock;

use crate::heartbeat::spawn_heartbeat_monitor;
use crate::registry::ConnectionRegistry;
use crate::signal::shutdown_signal;
use crate::state::AppState;

/// Runtime settings for the delivery server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub heartbeat_timeout: Duration,
    pub sweep_period: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            heartbeat_timeout: SERVER_HEARTBEAT_TIMEOUT,
            sweep_period: HEARTBEAT_SWEEP_PERIOD,
        }
    }
}

/// Build the router: the WebSocket endpoint plus the small HTTP surface.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(crate::handler::websocket_handler))
        .route("/api/health", get(crate::handler::health_check))
        .route("/api/stats", get(crate::handler::get_stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the auction delivery server until a shutdown signal arrives.
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let registry = Arc::new(ConnectionRegistry::new());
    let clock = Arc::new(SystemClock);
    let state = Arc::new(AppState::new(registry.clone(), clock.clone()));

    let monitor = spawn_heartbeat_monitor(
        registry,
        clock,
        config.sweep_period,
        config.heartbeat_timeout,
    );

    let app = build_router(state);

    let bind_addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!(
        "Auction delivery server listening on {}",
        listener.local_addr()?
    );
    tracing::info!("Connect to: ws://{}/ws", bind_addr);
    tracing::info!("Press Ctrl+C to shutdown gracefully");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    monitor.abort();
    tracing::info!("Server shutdown complete");

    Ok(())
}
