//! In-memory device store.
//!
//! Records are kept as the JSON documents described by the `HrmDevice`
//! shape. Every write goes through the shape: declared defaults are applied,
//! required fields are checked, unique fields are compared against the other
//! documents, and reference fields must point at a registered organization.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::device::{HrmDevice, NewHrmDevice, UpdateHrmDevice};
use crate::models::shape::RecordShape;
use crate::store::{DeviceStore, StoreError};

#[derive(Default)]
struct Inner {
    documents: HashMap<Uuid, Value>,
    organizations: HashSet<Uuid>,
}

/// Device store holding documents in process memory.
pub struct MemoryDeviceStore {
    shape: Arc<RecordShape>,
    inner: RwLock<Inner>,
}

impl MemoryDeviceStore {
    /// Create an empty store enforcing `shape`.
    pub fn new(shape: Arc<RecordShape>) -> Self {
        Self {
            shape,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Make an organization id available as a reference target.
    pub async fn register_organization(&self, organization: Uuid) {
        self.inner.write().await.organizations.insert(organization);
    }

    /// Check every declared constraint of `document` against the other
    /// stored documents. `exclude` skips the document being replaced.
    fn check_constraints(
        &self,
        inner: &Inner,
        document: &Value,
        exclude: Option<Uuid>,
    ) -> Result<(), StoreError> {
        if let Some(field) = self.shape.missing_required(document) {
            return Err(StoreError::MissingField {
                field: field.name.clone(),
            });
        }

        for field in self.shape.unique_fields() {
            let Some(value) = document.get(&field.name) else {
                continue;
            };
            let taken = inner
                .documents
                .iter()
                .filter(|(id, _)| Some(**id) != exclude)
                .any(|(_, other)| other.get(&field.name) == Some(value));
            if taken {
                return Err(StoreError::UniqueViolation {
                    field: field.name.clone(),
                });
            }
        }

        for field in self.shape.reference_fields() {
            let known = document
                .get(&field.name)
                .and_then(Value::as_str)
                .and_then(|s| Uuid::parse_str(s).ok())
                .is_some_and(|id| inner.organizations.contains(&id));
            if !known {
                return Err(StoreError::UnknownReference {
                    field: field.name.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Decode a stored document. Documents are only written after passing
/// the shape checks, so decoding failures indicate a corrupted store.
fn decode(document: &Value) -> Result<HrmDevice, StoreError> {
    serde_json::from_value(document.clone())
        .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::Database(sqlx::Error::Encode(Box::new(e))))
}

#[async_trait]
impl DeviceStore for MemoryDeviceStore {
    async fn create(&self, input: NewHrmDevice) -> Result<HrmDevice, StoreError> {
        let mut document = encode(&input)?;
        self.shape.apply_defaults(&mut document);

        let mut inner = self.inner.write().await;
        self.check_constraints(&inner, &document, None)?;

        let id = Uuid::new_v4();
        let now = Utc::now();
        if let Some(object) = document.as_object_mut() {
            object.insert("id".to_string(), json!(id));
            if self.shape.timestamps {
                object.insert("createdAt".to_string(), json!(now));
                object.insert("updatedAt".to_string(), json!(now));
            }
        }

        let device = decode(&document)?;
        inner.documents.insert(id, document);
        tracing::debug!(device_id = %id, "Stored HRM device in memory");
        Ok(device)
    }

    async fn get(&self, id: Uuid) -> Result<Option<HrmDevice>, StoreError> {
        let inner = self.inner.read().await;
        inner.documents.get(&id).map(decode).transpose()
    }

    async fn find_by_api_key(&self, api_key: &str) -> Result<Option<HrmDevice>, StoreError> {
        let inner = self.inner.read().await;
        inner
            .documents
            .values()
            .find(|doc| doc.get("apiKey").and_then(Value::as_str) == Some(api_key))
            .map(decode)
            .transpose()
    }

    async fn list_by_organization(
        &self,
        organization: Uuid,
    ) -> Result<Vec<HrmDevice>, StoreError> {
        let inner = self.inner.read().await;
        let mut devices = inner
            .documents
            .values()
            .map(decode)
            .collect::<Result<Vec<_>, _>>()?;
        devices.retain(|d| d.organization == organization);
        devices.sort_by_key(|d| d.created_at);
        Ok(devices)
    }

    async fn update(
        &self,
        id: Uuid,
        changes: UpdateHrmDevice,
    ) -> Result<Option<HrmDevice>, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(current) = inner.documents.get(&id) else {
            return Ok(None);
        };

        let mut document = current.clone();
        if let Some(object) = document.as_object_mut() {
            if let Some(name) = changes.name {
                object.insert("name".to_string(), json!(name));
            }
            if let Some(active) = changes.active {
                object.insert("active".to_string(), json!(active));
            }
            if let Some(allowed_ips) = changes.allowed_ips {
                object.insert("allowedIps".to_string(), json!(allowed_ips));
            }
            if self.shape.timestamps {
                object.insert("updatedAt".to_string(), json!(Utc::now()));
            }
        }

        self.check_constraints(&inner, &document, Some(id))?;

        let device = decode(&document)?;
        inner.documents.insert(id, document);
        Ok(Some(device))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.inner.write().await.documents.remove(&id).is_some())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
