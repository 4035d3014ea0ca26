//! Declarative record shapes and the registry that names them.
//!
//! A [`RecordShape`] describes the fields of a stored record: their kinds and
//! the constraints the persistence layer is expected to enforce (required,
//! unique, indexed, default). Shapes are registered once at startup in a
//! [`ShapeRegistry`] so the rest of the application can look them up by name.
//!
//! Shapes carry no behavior of their own beyond describing constraints;
//! enforcement belongs to the store that persists the records.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use serde_json::Value;

/// The kind of value a field holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Boolean,
    TextList,
    Timestamp,
    /// Identifier of a record of another shape, e.g. `Organization`.
    Reference { target: String },
}

/// A single field declaration within a [`RecordShape`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    pub unique: bool,
    pub indexed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl FieldSpec {
    /// Declare an optional, unindexed field with no default.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            unique: false,
            indexed: false,
            default: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Unique fields are always indexed.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self.indexed = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }
}

/// Named description of a persisted record.
///
/// # Timestamps
///
/// When `timestamps` is set, the persistence layer maintains `createdAt`
/// and `updatedAt` for every record of this shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordShape {
    pub name: String,
    pub fields: Vec<FieldSpec>,
    pub timestamps: bool,
}

impl RecordShape {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            timestamps: false,
        }
    }

    /// Append a field declaration. Field order is preserved.
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_timestamps(mut self) -> Self {
        self.timestamps = true;
        self
    }

    /// Look up a field declaration by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields declared `unique`, in declaration order.
    pub fn unique_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.unique)
    }

    /// Fields that reference another shape, in declaration order.
    pub fn reference_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields
            .iter()
            .filter(|f| matches!(f.kind, FieldKind::Reference { .. }))
    }

    /// Fill in declared defaults for fields that are absent or null.
    ///
    /// Non-object documents are left untouched.
    pub fn apply_defaults(&self, document: &mut Value) {
        let Some(object) = document.as_object_mut() else {
            return;
        };

        for field in &self.fields {
            let Some(default) = &field.default else {
                continue;
            };
            let slot = object.entry(field.name.clone()).or_insert(Value::Null);
            if slot.is_null() {
                *slot = default.clone();
            }
        }
    }

    /// Return the first required field that is missing from `document`.
    ///
    /// A field counts as missing when it is absent, null, or an empty string.
    pub fn missing_required(&self, document: &Value) -> Option<&FieldSpec> {
        self.fields.iter().filter(|f| f.required).find(|field| {
            match document.get(&field.name) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.is_empty(),
                Some(_) => false,
            }
        })
    }
}

/// Errors raised when registering shapes.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ShapeError {
    /// A different shape is already registered under this name.
    #[error("Shape {0} is already registered with a different definition")]
    Conflict(String),
}

/// Registry of shapes keyed by name.
///
/// Populated at startup. Lookups hand out shared [`Arc`] handles so every
/// consumer sees the same definition.
#[derive(Debug, Default)]
pub struct ShapeRegistry {
    shapes: RwLock<HashMap<String, Arc<RecordShape>>>,
}

impl ShapeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shape under its name and return the shared handle.
    ///
    /// Registering a definition identical to the one already stored returns
    /// the existing handle.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::Conflict`] if a different definition already
    /// owns the name.
    pub fn define(&self, shape: RecordShape) -> Result<Arc<RecordShape>, ShapeError> {
        let mut shapes = self
            .shapes
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(existing) = shapes.get(&shape.name) {
            if **existing == shape {
                return Ok(existing.clone());
            }
            tracing::warn!(shape = %shape.name, "Rejected conflicting shape registration");
            return Err(ShapeError::Conflict(shape.name));
        }

        let name = shape.name.clone();
        let handle = Arc::new(shape);
        shapes.insert(name.clone(), handle.clone());
        tracing::debug!(shape = %name, "Shape registered");
        Ok(handle)
    }

    /// Fetch a registered shape by name.
    pub fn get(&self, name: &str) -> Option<Arc<RecordShape>> {
        self.shapes
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(name)
            .cloned()
    }

    /// Names of every registered shape, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .shapes
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn widget_shape() -> RecordShape {
        RecordShape::new("Widget")
            .field(FieldSpec::new("label", FieldKind::Text).required())
            .field(FieldSpec::new("serial", FieldKind::Text).required().unique())
            .field(FieldSpec::new("enabled", FieldKind::Boolean).default_value(json!(true)))
    }

    #[test]
    fn unique_implies_indexed() {
        let field = FieldSpec::new("serial", FieldKind::Text).unique();
        assert!(field.unique);
        assert!(field.indexed);
    }

    #[test]
    fn define_then_get_returns_same_handle() {
        let registry = ShapeRegistry::new();
        let defined = registry.define(widget_shape()).unwrap();
        let fetched = registry.get("Widget").expect("shape should be registered");

        assert!(Arc::ptr_eq(&defined, &fetched));
        assert_eq!(registry.names(), vec!["Widget".to_string()]);
    }

    #[test]
    fn identical_redefinition_is_accepted() {
        let registry = ShapeRegistry::new();
        let first = registry.define(widget_shape()).unwrap();
        let second = registry.define(widget_shape()).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn conflicting_redefinition_is_rejected() {
        let registry = ShapeRegistry::new();
        registry.define(widget_shape()).unwrap();

        let altered = widget_shape().field(FieldSpec::new("extra", FieldKind::Text));
        assert_eq!(
            registry.define(altered),
            Err(ShapeError::Conflict("Widget".to_string()))
        );

        // The original definition is still the registered one.
        let stored = registry.get("Widget").unwrap();
        assert!(stored.get_field("extra").is_none());
    }

    #[test]
    fn get_unknown_shape_returns_none() {
        assert!(ShapeRegistry::new().get("Missing").is_none());
    }

    #[test]
    fn apply_defaults_fills_absent_and_null_fields_only() {
        let shape = widget_shape();

        let mut absent = json!({ "label": "a" });
        shape.apply_defaults(&mut absent);
        assert_eq!(absent["enabled"], json!(true));

        let mut null = json!({ "label": "a", "enabled": null });
        shape.apply_defaults(&mut null);
        assert_eq!(null["enabled"], json!(true));

        let mut explicit = json!({ "label": "a", "enabled": false });
        shape.apply_defaults(&mut explicit);
        assert_eq!(explicit["enabled"], json!(false));
    }

    #[test]
    fn missing_required_treats_empty_text_as_missing() {
        let shape = widget_shape();

        let complete = json!({ "label": "a", "serial": "s-1" });
        assert!(shape.missing_required(&complete).is_none());

        let empty_label = json!({ "label": "", "serial": "s-1" });
        assert_eq!(shape.missing_required(&empty_label).unwrap().name, "label");

        let no_serial = json!({ "label": "a" });
        assert_eq!(shape.missing_required(&no_serial).unwrap().name, "serial");
    }
}
