//! WebSocket endpoint for realtime subscribers.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;

use crate::realtime::WsHub;
use crate::state::AppState;

/// HTTP handler that upgrades the connection to WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.hub))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Subscribes to the hub.
///   2. Spawns a sender task that forwards hub frames to the sink.
///   3. Drains inbound messages on the current task until the client leaves.
async fn handle_socket(socket: WebSocket, hub: Arc<WsHub>) {
    let conn_id = uuid::Uuid::new_v4();
    tracing::info!(conn_id = %conn_id, "WebSocket connected");

    let mut rx = hub.subscribe();
    let (mut sink, mut stream) = socket.split();

    let send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(text) => {
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        tracing::debug!(conn_id = %conn_id, "WebSocket sink closed");
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(conn_id = %conn_id, skipped, "Realtime subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}
