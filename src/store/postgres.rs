//! PostgreSQL device store.
//!
//! Constraints declared by the `HrmDevice` shape are enforced by the
//! `hrm_devices` DDL in `migrations/`:
//! - `apiKey` unique -> `hrm_devices_api_key_key`
//! - `organization` reference -> `hrm_devices_organization_fkey`
//! - `name` / `apiKey` required -> `NOT NULL` plus non-empty `CHECK`s
//! - `active` default -> `DEFAULT TRUE`
//!
//! Database errors raised by those constraints are mapped back to
//! [`StoreError`] variants carrying the shape field name.

use async_trait::async_trait;
use sqlx::error::ErrorKind;
use uuid::Uuid;

use crate::db::DbPool;
use crate::models::device::{HrmDevice, NewHrmDevice, UpdateHrmDevice};
use crate::store::{DeviceStore, StoreError};

const DEVICE_COLUMNS: &str =
    "id, organization, name, api_key, active, allowed_ips, created_at, updated_at";

/// Device store backed by a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PgDeviceStore {
    pool: DbPool,
}

impl PgDeviceStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeviceStore for PgDeviceStore {
    async fn create(&self, input: NewHrmDevice) -> Result<HrmDevice, StoreError> {
        let device = sqlx::query_as::<_, HrmDevice>(&format!(
            r#"
            INSERT INTO hrm_devices (organization, name, api_key, active, allowed_ips)
            VALUES ($1, $2, $3, COALESCE($4, TRUE), COALESCE($5, '{{}}'::TEXT[]))
            RETURNING {DEVICE_COLUMNS}
            "#
        ))
        .bind(input.organization)
        .bind(&input.name)
        .bind(&input.api_key)
        .bind(input.active)
        .bind(input.allowed_ips)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        tracing::debug!(device_id = %device.id, "Inserted HRM device");
        Ok(device)
    }

    async fn get(&self, id: Uuid) -> Result<Option<HrmDevice>, StoreError> {
        let device = sqlx::query_as::<_, HrmDevice>(&format!(
            "SELECT {DEVICE_COLUMNS} FROM hrm_devices WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(device)
    }

    async fn find_by_api_key(&self, api_key: &str) -> Result<Option<HrmDevice>, StoreError> {
        let device = sqlx::query_as::<_, HrmDevice>(&format!(
            "SELECT {DEVICE_COLUMNS} FROM hrm_devices WHERE api_key = $1"
        ))
        .bind(api_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(device)
    }

    async fn list_by_organization(
        &self,
        organization: Uuid,
    ) -> Result<Vec<HrmDevice>, StoreError> {
        let devices = sqlx::query_as::<_, HrmDevice>(&format!(
            "SELECT {DEVICE_COLUMNS} FROM hrm_devices WHERE organization = $1 ORDER BY created_at ASC"
        ))
        .bind(organization)
        .fetch_all(&self.pool)
        .await?;

        Ok(devices)
    }

    async fn update(
        &self,
        id: Uuid,
        changes: UpdateHrmDevice,
    ) -> Result<Option<HrmDevice>, StoreError> {
        let device = sqlx::query_as::<_, HrmDevice>(&format!(
            r#"
            UPDATE hrm_devices
            SET name = COALESCE($2, name),
                active = COALESCE($3, active),
                allowed_ips = COALESCE($4, allowed_ips),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {DEVICE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.name)
        .bind(changes.active)
        .bind(changes.allowed_ips)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(device)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM hrm_devices WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Translate constraint violations into shape-level store errors.
fn map_db_error(err: sqlx::Error) -> StoreError {
    let violation = match &err {
        sqlx::Error::Database(db_err) => Some((
            db_err.kind(),
            field_for_constraint(db_err.constraint()).to_string(),
        )),
        _ => None,
    };

    match violation {
        Some((ErrorKind::UniqueViolation, field)) => StoreError::UniqueViolation { field },
        Some((ErrorKind::ForeignKeyViolation, field)) => StoreError::UnknownReference { field },
        Some((ErrorKind::NotNullViolation | ErrorKind::CheckViolation, field)) => {
            StoreError::MissingField { field }
        }
        _ => StoreError::Database(err),
    }
}

/// Shape field name guarded by a named constraint of `hrm_devices`.
fn field_for_constraint(constraint: Option<&str>) -> &str {
    match constraint {
        Some("hrm_devices_api_key_key") | Some("hrm_devices_api_key_required") => "apiKey",
        Some("hrm_devices_organization_fkey") => "organization",
        Some("hrm_devices_name_required") => "name",
        Some(other) => other,
        None => "unknown",
    }
}
