//! Device persistence.
//!
//! [`DeviceStore`] is the boundary between request handling and storage.
//! Two implementations exist:
//! - [`postgres::PgDeviceStore`]: PostgreSQL via sqlx, constraints enforced by the schema
//! - [`memory::MemoryDeviceStore`]: in-process map, constraints enforced from the declared shape

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::device::{HrmDevice, NewHrmDevice, UpdateHrmDevice};

pub mod memory;
pub mod postgres;

/// Errors raised by a device store.
///
/// Constraint violations are reported with the shape field name
/// (e.g. `apiKey`) so callers can surface them without knowing the backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Another record already holds this value for a unique field.
    #[error("Duplicate value for unique field {field}")]
    UniqueViolation { field: String },

    /// A required field was absent or empty.
    #[error("Missing required field {field}")]
    MissingField { field: String },

    /// A reference field points at a record that does not exist.
    #[error("Unknown reference in field {field}")]
    UnknownReference { field: String },

    /// Any other database failure.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Storage operations for HRM devices.
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// Insert a new device, applying declared defaults.
    async fn create(&self, input: NewHrmDevice) -> Result<HrmDevice, StoreError>;

    /// Fetch a device by id.
    async fn get(&self, id: Uuid) -> Result<Option<HrmDevice>, StoreError>;

    /// Fetch the device owning `api_key`, active or not.
    async fn find_by_api_key(&self, api_key: &str) -> Result<Option<HrmDevice>, StoreError>;

    /// All devices of an organization, oldest first.
    async fn list_by_organization(&self, organization: Uuid)
    -> Result<Vec<HrmDevice>, StoreError>;

    /// Apply a partial update. Returns `None` if the device does not exist.
    async fn update(
        &self,
        id: Uuid,
        changes: UpdateHrmDevice,
    ) -> Result<Option<HrmDevice>, StoreError>;

    /// Remove a device. Returns whether a record was deleted.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Verify the backend is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}
