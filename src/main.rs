//! sketch-relay server entry point.
//!
//! Starts the Axum HTTP server with the WebSocket endpoint and a health
//! probe, backed by a PostgreSQL stroke store.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use sketch_relay::app_state::AppState;
use sketch_relay::config::RelayConfig;
use sketch_relay::domain::RoomRegistry;
use sketch_relay::store::postgres::PostgresStrokeStore;
use sketch_relay::ws::handler::ws_handler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = RelayConfig::from_env().map_err(|e| anyhow::anyhow!(e.to_string()))?;
    tracing::info!(addr = %config.listen_addr, "starting sketch-relay");

    // Connect to the stroke store and apply migrations
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("stroke store ready");

    // Build domain layer
    let store = Arc::new(PostgresStrokeStore::new(pool));
    let registry = RoomRegistry::new(store, config.room_inbox_capacity, config.max_stroke_width);

    // Build application state
    let app_state = AppState {
        registry,
        outbound_buffer: config.outbound_buffer,
    };

    // Build router
    let app = Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// `GET /health` — liveness probe.
async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}
