//! Data models representing stored entities.
//!
//! This module contains the record shape declarations and the structures
//! that map to database tables.

/// HRM device model
pub mod device;
/// Record shapes and the shape registry
pub mod shape;
