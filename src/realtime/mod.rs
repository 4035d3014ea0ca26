//! Realtime event delivery.
//!
//! - [`handle`]: the shared slot and its best-effort `broadcast`
//! - [`hub`]: the WebSocket fan-out transport installed into the slot

pub mod handle;
pub mod hub;

pub use handle::{BroadcastError, Broadcaster, RealtimeError, RealtimeHandle};
pub use hub::WsHub;
