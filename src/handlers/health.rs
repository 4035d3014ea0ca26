//! Health check endpoint for service monitoring.

use crate::{error::AppError, state::AppState};
use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Health check response.
///
/// Returns service status, store connectivity and realtime counters.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall service status
    pub status: String,

    /// Device store status
    pub database: String,

    /// Connected WebSocket clients
    pub realtime_clients: usize,

    /// Broadcasts handed to the realtime transport since startup
    pub delivered_broadcasts: u64,

    /// Broadcasts whose failure was swallowed since startup
    pub failed_broadcasts: u64,

    /// Current server timestamp
    pub timestamp: DateTime<Utc>,
}

/// Health check handler.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "status": "healthy",
///   "database": "connected",
///   "realtime_clients": 2,
///   "delivered_broadcasts": 14,
///   "failed_broadcasts": 0,
///   "timestamp": "2025-12-21T19:00:00Z"
/// }
/// ```
///
/// # Response (500 Internal Server Error)
///
/// If the store is unreachable, returns standard error response.
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    state.store.ping().await?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        database: "connected".to_string(),
        realtime_clients: state.hub.subscriber_count(),
        delivered_broadcasts: state.realtime.delivered_broadcasts(),
        failed_broadcasts: state.realtime.failed_broadcasts(),
        timestamp: Utc::now(),
    }))
}
