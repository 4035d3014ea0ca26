use std::sync::Arc;

use crate::models::shape::ShapeRegistry;
use crate::realtime::{RealtimeHandle, WsHub};
use crate::store::DeviceStore;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone: every field is an `Arc` or wraps one.
#[derive(Clone)]
pub struct AppState {
    /// Device persistence.
    pub store: Arc<dyn DeviceStore>,
    /// Registered record shapes, keyed by name.
    pub shapes: Arc<ShapeRegistry>,
    /// Best-effort realtime broadcast slot.
    pub realtime: RealtimeHandle,
    /// WebSocket transport; clients subscribe to it on `/ws`.
    pub hub: Arc<WsHub>,
    /// Bearer token required on administration routes, if configured.
    pub admin_token: Option<Arc<str>>,
}
