//! Device-facing endpoints.

use axum::{Extension, Json, extract::State};
use serde::Serialize;
use uuid::Uuid;

use crate::{middleware::auth::DeviceContext, state::AppState};

/// Identity returned to an authenticated device.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatResponse {
    pub device_id: Uuid,
    pub organization: Uuid,
    pub name: String,
}

/// Device heartbeat.
///
/// # Endpoint
///
/// `POST /api/v1/device/heartbeat`
///
/// # Authentication
///
/// Requires the device's API key (`Authorization: Bearer <apiKey>`), an
/// active device, and a peer address allowed by the device.
///
/// Announces `device.heartbeat` to realtime subscribers.
pub async fn heartbeat(
    State(state): State<AppState>,
    Extension(device): Extension<DeviceContext>,
) -> Json<HeartbeatResponse> {
    let response = HeartbeatResponse {
        device_id: device.device_id,
        organization: device.organization,
        name: device.name,
    };

    tracing::debug!(device_id = %response.device_id, "Heartbeat received");
    state.realtime.broadcast("device.heartbeat", &response);

    Json(response)
}
