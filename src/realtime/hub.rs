//! WebSocket fan-out hub backed by a `tokio::sync::broadcast` channel.
//!
//! [`WsHub`] is the realtime transport installed into the
//! [`RealtimeHandle`](crate::realtime::RealtimeHandle) at startup. Every
//! connected WebSocket client subscribes to the hub and receives each emitted
//! event as a JSON text frame.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::realtime::handle::{BroadcastError, Broadcaster};

/// Frame pushed to WebSocket clients.
///
/// # Example
///
/// ```json
/// {
///   "event": "device.updated",
///   "payload": { "id": "..." },
///   "timestamp": "2025-01-15T10:30:00Z"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct RealtimeFrame {
    pub event: String,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

/// In-process fan-out for realtime frames.
///
/// Frames are serialized once on emit and shared as text with every
/// subscriber. Subscribers that fall more than `capacity` frames behind skip
/// the frames they missed.
pub struct WsHub {
    sender: broadcast::Sender<String>,
}

impl WsHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Register a new client and return its frame receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.sender.subscribe()
    }

    /// Number of currently connected clients.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Broadcaster for WsHub {
    fn emit(&self, event: &str, payload: &Value) -> Result<(), BroadcastError> {
        let frame = RealtimeFrame {
            event: event.to_string(),
            payload: payload.clone(),
            timestamp: Utc::now(),
        };
        let text = serde_json::to_string(&frame)?;

        // A send error only means nobody is connected right now.
        match self.sender.send(text) {
            Ok(receivers) => tracing::debug!(event, receivers, "Realtime frame sent"),
            Err(_) => tracing::trace!(event, "No realtime subscribers"),
        }
        Ok(())
    }
}
