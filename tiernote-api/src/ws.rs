//! WebSocket Real-Time Channel
//!
//! Clients connect to `/ws`, send `add`/`delete` frames and receive the full
//! note list after every successful mutation from any client.
//!
//! ## Architecture
//!
//! - Mutations go through the shared [`NoteStore`], which publishes on its
//!   [`NotificationBus`](tiernote_storage::NotificationBus)
//! - Each connection subscribes to the bus and forwards `notesChanged` frames
//! - Acknowledgements travel on a per-connection channel, so only the
//!   originating client sees them
//! - A client that falls behind gets an `error` frame; the next
//!   `notesChanged` carries the full list again

use crate::events::{ClientMessage, MutationOp, WsEvent};
use crate::telemetry::METRICS;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tiernote_storage::NoteStore;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

/// WebSocket state shared across the application.
#[derive(Clone)]
pub struct WsState {
    store: Arc<NoteStore>,
}

impl WsState {
    pub fn new(store: Arc<NoteStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<NoteStore> {
        &self.store
    }

    /// Number of connected clients.
    pub fn client_count(&self) -> usize {
        self.store.bus().receiver_count()
    }

    /// Apply one client frame and build the acknowledgement for its sender.
    pub async fn apply(&self, message: ClientMessage) -> WsEvent {
        let op = message.op();
        let request_id = message.request_id().map(str::to_string);

        let result = match message {
            ClientMessage::Add { text, .. } => self.store.add(text).await,
            ClientMessage::Delete { id, .. } => self.store.delete(&id).await,
        };

        if let Ok(metrics) = METRICS.as_ref() {
            metrics.record_mutation(op.as_str(), result.is_ok());
            if let Ok(mutation) = &result {
                if let Some(eviction) = &mutation.eviction {
                    metrics.record_eviction(eviction);
                }
            }
        }

        match result {
            Ok(_) => WsEvent::Ack {
                request_id,
                op,
                ok: true,
                error: None,
            },
            Err(e) => WsEvent::Ack {
                request_id,
                op,
                ok: false,
                error: Some(e.to_string()),
            },
        }
    }
}

/// WebSocket upgrade handler.
///
/// ## Protocol
///
/// 1. Connection upgraded to WebSocket
/// 2. Server sends `connected`
/// 3. Client sends `add` / `delete` frames, optionally with a `requestId`
/// 4. Server answers each frame with an `ack` to that client only
/// 5. Server streams `notesChanged` to every client after each mutation
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<WsState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an individual WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<WsState>) {
    info!(clients = state.client_count() + 1, "WebSocket connected");
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.ws_connected();
    }

    let (mut sender, mut receiver) = socket.split();

    // Subscribe before announcing so no publication after `connected` is missed.
    let mut rx = state.store().bus().subscribe();

    if let Err(e) = send_event(&mut sender, &WsEvent::Connected).await {
        error!(error = %e, "Failed to send Connected event");
        disconnect_metrics();
        return;
    }

    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<WsEvent>();

    let recv_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => {
                    debug!("Client sent close frame");
                    break;
                }
                Ok(Message::Text(text)) => {
                    let reply = match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(message) => recv_state.apply(message).await,
                        Err(e) => {
                            warn!(error = %e, "Malformed client frame");
                            WsEvent::Error {
                                message: format!("Malformed message: {}", e),
                            }
                        }
                    };
                    if reply_tx.send(reply).is_err() {
                        break;
                    }
                }
                Ok(Message::Binary(data)) => {
                    debug!(len = data.len(), "Received binary message (ignored)");
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                    // Pong is automatically sent by axum
                }
                Err(e) => {
                    warn!(error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(changed) => {
                        if let Err(e) = send_event(&mut sender, &WsEvent::from(changed)).await {
                            error!(error = %e, "Failed to send event, closing connection");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped = skipped, "Client lagged, some updates were dropped");
                        let error_event = WsEvent::Error {
                            message: format!("Lagged: {} updates dropped", skipped),
                        };
                        if let Err(e) = send_event(&mut sender, &error_event).await {
                            error!(error = %e, "Failed to send error event");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Broadcast channel closed");
                        break;
                    }
                }
            }

            Some(reply) = reply_rx.recv() => {
                if let Err(e) = send_event(&mut sender, &reply).await {
                    error!(error = %e, "Failed to send reply, closing connection");
                    break;
                }
            }

            _ = &mut recv_task => {
                debug!("Receiver task finished");
                break;
            }
        }
    }

    recv_task.abort();
    disconnect_metrics();
    info!("WebSocket disconnected");
}

fn disconnect_metrics() {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.ws_disconnected();
    }
}

/// Serialize the event to JSON and send it as a text message.
async fn send_event(
    sender: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    event: &WsEvent,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(event).map_err(|e| {
        error!(error = %e, "Failed to serialize event");
        axum::Error::new(e)
    })?;

    sender.send(Message::Text(json)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiernote_test_utils::fixtures::memory_store;

    fn ws_state(threshold: usize) -> (WsState, tiernote_test_utils::fixtures::MemoryTiers) {
        let tiers = memory_store(threshold);
        (WsState::new(tiers.store.clone()), tiers)
    }

    #[tokio::test]
    async fn test_apply_add_acks_and_publishes() {
        let (state, tiers) = ws_state(2);
        let mut rx = tiers.bus().subscribe();

        let ack = state
            .apply(ClientMessage::Add {
                text: "buy milk".to_string(),
                request_id: Some("r1".to_string()),
            })
            .await;
        assert_eq!(
            ack,
            WsEvent::Ack {
                request_id: Some("r1".to_string()),
                op: MutationOp::Add,
                ok: true,
                error: None
            }
        );
        assert_eq!(rx.try_recv().unwrap().notes.len(), 1);
    }

    #[tokio::test]
    async fn test_apply_failure_acks_with_error() {
        let (state, tiers) = ws_state(2);
        let mut rx = tiers.bus().subscribe();
        tiers.cache.set_available(false);

        let ack = state
            .apply(ClientMessage::Delete {
                id: "zzz".to_string(),
                request_id: None,
            })
            .await;
        match ack {
            WsEvent::Ack { ok, error, op, .. } => {
                assert!(!ok);
                assert_eq!(op, MutationOp::Delete);
                assert!(error.unwrap_or_default().contains("cache"));
            }
            other => panic!("expected ack, got {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }
}
