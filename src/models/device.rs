//! HRM device model: database entity, its declared shape, and API types.
//!
//! This module defines:
//! - `HrmDevice`: Database entity representing a reporting device of an organization
//! - `HrmDevice::shape()`: The `HrmDevice` record shape (fields and constraints)
//! - `NewHrmDevice` / `UpdateHrmDevice`: Inputs accepted by the device store
//! - `HrmDeviceResponse`: Response body returned to clients
//! - `DeviceEventPayload`: Payload broadcast to realtime subscribers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::models::shape::{FieldKind, FieldSpec, RecordShape};

/// Name the device shape is registered under.
pub const HRM_DEVICE_SHAPE: &str = "HrmDevice";

/// Represents an HRM device record from the database.
///
/// # Database Table
///
/// Maps to the `hrm_devices` table. Each device:
/// - Belongs to exactly one organization (via `organization`)
/// - Authenticates with its own globally unique `api_key`
///
/// # Allowed IPs
///
/// An empty `allowed_ips` list means the device may report from any address.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HrmDevice {
    /// Unique identifier for this device
    pub id: Uuid,

    /// Organization this device reports for
    pub organization: Uuid,

    /// Human-readable device name
    pub name: String,

    /// Secret key the device presents as `Authorization: Bearer <key>`
    pub api_key: String,

    /// Inactive devices are rejected during authentication
    pub active: bool,

    /// Peer addresses the device may authenticate from
    pub allowed_ips: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HrmDevice {
    /// The declared `HrmDevice` shape.
    ///
    /// Field names match the JSON representation of the record.
    pub fn shape() -> RecordShape {
        RecordShape::new(HRM_DEVICE_SHAPE)
            .field(
                FieldSpec::new(
                    "organization",
                    FieldKind::Reference {
                        target: "Organization".to_string(),
                    },
                )
                .required()
                .indexed(),
            )
            .field(FieldSpec::new("name", FieldKind::Text).required())
            .field(FieldSpec::new("apiKey", FieldKind::Text).required().unique())
            .field(FieldSpec::new("active", FieldKind::Boolean).default_value(json!(true)))
            .field(FieldSpec::new("allowedIps", FieldKind::TextList).default_value(json!([])))
            .with_timestamps()
    }
}

/// Input for creating a device in a store.
///
/// `active` and `allowed_ips` are optional; the store applies the declared
/// defaults (`true` and the empty list) when they are omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHrmDevice {
    pub organization: Uuid,
    pub name: String,
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_ips: Option<Vec<String>>,
}

/// Partial update of a device. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateHrmDevice {
    pub name: Option<String>,
    pub active: Option<bool>,
    pub allowed_ips: Option<Vec<String>>,
}

impl UpdateHrmDevice {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.active.is_none() && self.allowed_ips.is_none()
    }
}

/// Request body for registering a device.
///
/// # JSON Example
///
/// ```json
/// {
///   "organization": "550e8400-e29b-41d4-a716-446655440000",
///   "name": "Front desk reader",
///   "allowedIps": ["10.0.0.12"]
/// }
/// ```
///
/// `apiKey` may be supplied; otherwise one is generated.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeviceRequest {
    pub organization: Uuid,
    pub name: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub allowed_ips: Option<Vec<String>>,
}

/// Query string for listing devices.
#[derive(Debug, Deserialize)]
pub struct ListDevicesQuery {
    pub organization: Uuid,
}

/// Response body for device endpoints.
///
/// The `apiKey` field is ONLY included when a device is created.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HrmDeviceResponse {
    pub id: Uuid,
    pub organization: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub active: bool,
    pub allowed_ips: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<HrmDevice> for HrmDeviceResponse {
    fn from(device: HrmDevice) -> Self {
        Self {
            id: device.id,
            organization: device.organization,
            name: device.name,
            api_key: None, // Never include the key by default
            active: device.active,
            allowed_ips: device.allowed_ips,
            created_at: device.created_at,
            updated_at: device.updated_at,
        }
    }
}

impl HrmDeviceResponse {
    /// Create response with the API key included (only for registration).
    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }
}

/// Payload sent to realtime subscribers for device events.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceEventPayload {
    pub id: Uuid,
    pub organization: Uuid,
    pub name: String,
    pub active: bool,
}

impl From<&HrmDevice> for DeviceEventPayload {
    fn from(device: &HrmDevice) -> Self {
        Self {
            id: device.id,
            organization: device.organization,
            name: device.name.clone(),
            active: device.active,
        }
    }
}
