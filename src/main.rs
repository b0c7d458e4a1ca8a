//! FarmKonnect progress service binary.
//!
//! Composition root: loads configuration, wires the state store, registry
//! and broadcaster, and serves the WebSocket and polling endpoints.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use farmkonnect::adapters::http::{bulk_operation_router, BulkOperationAppState};
use farmkonnect::adapters::websocket::{websocket_router, WebSocketState};
use farmkonnect::adapters::{BulkOperationBroadcaster, InMemoryOperationStateStore, SubscriptionRegistry};
use farmkonnect::config::{AppConfig, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);

    let registry = Arc::new(SubscriptionRegistry::new(config.websocket.channel_capacity));
    let store = Arc::new(InMemoryOperationStateStore::new());
    let broadcaster = Arc::new(
        BulkOperationBroadcaster::new(registry, store)
            .with_eviction_delay(config.websocket.eviction_delay()),
    );

    let ws_state = WebSocketState::new(broadcaster.clone())
        .with_client_events(config.websocket.allow_client_events);
    let http_state = BulkOperationAppState::new(broadcaster);

    let app = Router::new()
        .merge(websocket_router().with_state(ws_state))
        .merge(bulk_operation_router().with_state(http_state))
        .layer(cors_layer(&config.server))
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        environment = ?config.server.environment,
        eviction_delay_secs = config.websocket.eviction_delay_secs,
        "FarmKonnect progress service listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any)
    } else {
        CorsLayer::new().allow_origin(origins).allow_methods(Any)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
