//! HRM Device Service - Main Application Entry Point
//!
//! A small REST API around HRM device records: devices are registered per
//! organization, authenticate with their own API key, and every change is
//! pushed to connected WebSocket clients.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server + WebSocket)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Record Shapes**: `HrmDevice` declared once and registered by name
//! - **Realtime**: best-effort broadcast handle backed by a WebSocket hub
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool and run migrations
//! 3. Register the `HrmDevice` shape
//! 4. Install the WebSocket hub into the realtime handle
//! 5. Build HTTP router and start serving

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use hrm_device_service::models::{device::HrmDevice, shape::ShapeRegistry};
use hrm_device_service::realtime::{RealtimeHandle, WsHub};
use hrm_device_service::state::AppState;
use hrm_device_service::store::postgres::PgDeviceStore;
use hrm_device_service::{config, db, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let shapes = Arc::new(ShapeRegistry::new());
    let device_shape = shapes.define(HrmDevice::shape())?;
    tracing::info!(
        shape = %device_shape.name,
        fields = device_shape.fields.len(),
        registered = ?shapes.names(),
        "Record shape registered"
    );

    let hub = Arc::new(WsHub::new(config.realtime_capacity));
    let realtime = RealtimeHandle::new();
    realtime.init_handle(hub.clone())?;

    let state = AppState {
        store: Arc::new(PgDeviceStore::new(pool)),
        shapes,
        realtime,
        hub,
        admin_token: config.admin_token.as_deref().map(Arc::from),
    };
    if state.admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN not set; device administration routes are unauthenticated");
    }

    let app = routes::build_router(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Peer addresses are needed to enforce per-device allowed IPs
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
