//! HRM device records and realtime device events.
//!
//! - [`models`]: the `HrmDevice` record, its declared shape, and the shape registry
//! - [`store`]: device persistence (PostgreSQL and in-memory)
//! - [`realtime`]: the best-effort broadcast handle and its WebSocket hub
//! - [`routes`]: the HTTP surface tying both together

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod realtime;
pub mod routes;
pub mod state;
pub mod store;
