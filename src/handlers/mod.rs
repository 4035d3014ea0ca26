//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Calls the device store
//! 3. Announces changes through the realtime handle
//! 4. Returns HTTP response (JSON, status code)

/// Device administration endpoints
pub mod devices;
/// Service health
pub mod health;
/// Device-facing endpoints
pub mod heartbeat;
/// Registered record shapes
pub mod shapes;
/// Realtime WebSocket endpoint
pub mod ws;
