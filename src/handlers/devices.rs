//! Device administration HTTP handlers.
//!
//! This module implements the device management API endpoints:
//! - POST /api/v1/devices - Register a device
//! - GET /api/v1/devices?organization=<id> - List devices of an organization
//! - GET /api/v1/devices/{id} - Get device by ID
//! - PATCH /api/v1/devices/{id} - Update name, active flag or allowed IPs
//! - DELETE /api/v1/devices/{id} - Remove a device
//!
//! Every mutation is announced to realtime subscribers. Announcements are
//! best-effort and never affect the HTTP response.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::device::{
        CreateDeviceRequest, DeviceEventPayload, HrmDeviceResponse, ListDevicesQuery, NewHrmDevice,
        UpdateHrmDevice,
    },
    state::AppState,
};

/// Register a new device.
///
/// # Request Body
///
/// ```json
/// {
///   "organization": "550e8400-e29b-41d4-a716-446655440000",
///   "name": "Front desk reader",
///   "apiKey": "optional, generated when omitted",
///   "active": true,
///   "allowedIps": ["10.0.0.12"]
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: The device, including `apiKey` (only time it's shown)
/// - **Error (409)**: `apiKey` already in use
/// - **Error (422)**: Unknown organization
/// - **Error (400)**: Empty `name` or `apiKey`
pub async fn create_device(
    State(state): State<AppState>,
    Json(request): Json<CreateDeviceRequest>,
) -> Result<(StatusCode, Json<HrmDeviceResponse>), AppError> {
    let api_key = request.api_key.unwrap_or_else(generate_api_key);

    let device = state
        .store
        .create(NewHrmDevice {
            organization: request.organization,
            name: request.name,
            api_key,
            active: request.active,
            allowed_ips: request.allowed_ips,
        })
        .await?;

    tracing::info!(device_id = %device.id, organization = %device.organization, "Device registered");
    state
        .realtime
        .broadcast("device.created", &DeviceEventPayload::from(&device));

    let api_key = device.api_key.clone();
    Ok((
        StatusCode::CREATED,
        Json(HrmDeviceResponse::from(device).with_api_key(api_key)),
    ))
}

/// List the devices of one organization, oldest first.
pub async fn list_devices(
    State(state): State<AppState>,
    Query(query): Query<ListDevicesQuery>,
) -> Result<Json<Vec<HrmDeviceResponse>>, AppError> {
    let devices = state.store.list_by_organization(query.organization).await?;

    Ok(Json(devices.into_iter().map(Into::into).collect()))
}

/// Get a device by ID.
///
/// # Response
///
/// - **Success (200 OK)**: Device details, without `apiKey`
/// - **Error (404)**: Device not found
pub async fn get_device(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<HrmDeviceResponse>, AppError> {
    let device = state
        .store
        .get(id)
        .await?
        .ok_or(AppError::DeviceNotFound)?;

    Ok(Json(device.into()))
}

/// Update a device.
///
/// # Request Body
///
/// Any subset of `name`, `active`, `allowedIps`. An empty body is rejected.
///
/// # Response
///
/// - **Success (200 OK)**: Updated device, without `apiKey`
/// - **Error (404)**: Device not found
/// - **Error (400)**: Empty body or empty `name`
pub async fn update_device(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(changes): Json<UpdateHrmDevice>,
) -> Result<Json<HrmDeviceResponse>, AppError> {
    if changes.is_empty() {
        return Err(AppError::InvalidRequest(
            "At least one of name, active or allowedIps is required".to_string(),
        ));
    }

    let device = state
        .store
        .update(id, changes)
        .await?
        .ok_or(AppError::DeviceNotFound)?;

    tracing::info!(device_id = %device.id, active = device.active, "Device updated");
    state
        .realtime
        .broadcast("device.updated", &DeviceEventPayload::from(&device));

    Ok(Json(device.into()))
}

/// Delete a device.
///
/// # Response
///
/// - **Success (204 No Content)**
/// - **Error (404)**: Device not found
pub async fn delete_device(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.store.delete(id).await? {
        return Err(AppError::DeviceNotFound);
    }

    tracing::info!(device_id = %id, "Device deleted");
    state.realtime.broadcast("device.deleted", &json!({ "id": id }));

    Ok(StatusCode::NO_CONTENT)
}

/// Generate a device API key.
///
/// # Output
///
/// 64 hex characters (32 random bytes)
fn generate_api_key() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}
