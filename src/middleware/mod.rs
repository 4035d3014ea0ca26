//! HTTP middleware components.
//!
//! Middleware are functions that run before route handlers.
//! Here they authenticate requests and short-circuit unauthorized ones.

/// Admin token and device API key authentication
pub mod auth;
