//! Realtime broadcast handle.
//!
//! Holds at most one [`Broadcaster`] and exposes best-effort event emission
//! over it. The handle is shared through [`crate::state::AppState`]; clones
//! observe the same slot.
//!
//! # Failure Policy
//!
//! Realtime notification is auxiliary: [`RealtimeHandle::broadcast`] never
//! returns an error. Failures are logged and counted instead so they stay
//! visible to operators without reaching the caller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use serde_json::Value;

/// Error reported by a realtime transport when an emit fails.
#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    /// The transport is no longer accepting events.
    #[error("Realtime transport closed")]
    Closed,

    /// The payload could not be encoded for the wire.
    #[error("Failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Realtime transport error: {0}")]
    Transport(String),
}

/// Errors raised by the handle itself.
#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    #[error("Realtime handle is already initialized")]
    AlreadyInitialized,
}

/// A server able to push named events to connected clients.
#[cfg_attr(test, mockall::automock)]
pub trait Broadcaster: Send + Sync {
    /// Push `payload` to every connected client under `event`.
    fn emit(&self, event: &str, payload: &Value) -> Result<(), BroadcastError>;
}

#[derive(Default)]
struct Slot {
    instance: RwLock<Option<Arc<dyn Broadcaster>>>,
    delivered: AtomicU64,
    failed: AtomicU64,
}

/// Shared slot holding the process's realtime broadcaster.
#[derive(Clone, Default)]
pub struct RealtimeHandle {
    slot: Arc<Slot>,
}

impl RealtimeHandle {
    /// Create a handle with an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the broadcaster unconditionally.
    pub fn set_handle(&self, instance: Arc<dyn Broadcaster>) {
        let mut slot = self
            .slot
            .instance
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.is_some() {
            tracing::warn!("Replacing existing realtime broadcaster");
        }
        *slot = Some(instance);
    }

    /// Install the broadcaster if none is set yet.
    ///
    /// Used by bootstrap code so that a second installation is rejected
    /// rather than silently replacing the first.
    ///
    /// # Errors
    ///
    /// Returns [`RealtimeError::AlreadyInitialized`] if the slot is occupied.
    pub fn init_handle(&self, instance: Arc<dyn Broadcaster>) -> Result<(), RealtimeError> {
        let mut slot = self
            .slot
            .instance
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.is_some() {
            return Err(RealtimeError::AlreadyInitialized);
        }
        *slot = Some(instance);
        tracing::info!("Realtime broadcaster installed");
        Ok(())
    }

    /// Current broadcaster, or `None` while unset.
    pub fn get_handle(&self) -> Option<Arc<dyn Broadcaster>> {
        self.slot
            .instance
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Emit `event` with `payload` through the current broadcaster.
    ///
    /// No-op while unset. Never fails: encoding and transport errors are
    /// logged and counted in [`RealtimeHandle::failed_broadcasts`].
    pub fn broadcast<T: Serialize + ?Sized>(&self, event: &str, payload: &T) {
        let Some(instance) = self.get_handle() else {
            tracing::trace!(event, "No realtime broadcaster set; dropping event");
            return;
        };

        let result = serde_json::to_value(payload)
            .map_err(BroadcastError::from)
            .and_then(|payload| instance.emit(event, &payload));

        match result {
            Ok(()) => {
                self.slot.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.slot.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(event, error = %e, "Realtime broadcast failed");
            }
        }
    }

    /// Number of broadcasts handed to the broadcaster successfully.
    pub fn delivered_broadcasts(&self) -> u64 {
        self.slot.delivered.load(Ordering::Relaxed)
    }

    /// Number of broadcasts whose failure was swallowed.
    pub fn failed_broadcasts(&self) -> u64 {
        self.slot.failed.load(Ordering::Relaxed)
    }
}
