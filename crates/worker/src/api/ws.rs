//! WebSocket stream of generation progress events.
//!
//! The pipeline publishes through the core [`RealtimeChannel`] trait;
//! here that lands on a tokio broadcast channel fanned out to every
//! connected client. Clients may pass `?topic=<course-or-session-id>` to
//! receive only one course's events, otherwise they get the full stream.

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use courseforge_core::progress::{RealtimeChannel, RealtimeError};

use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_LAG_EVENTS, WS_MESSAGES_SENT};
use crate::state::AppState;

/// One progress event as delivered to WebSocket clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WsEvent {
    /// Course id when the job knows it, otherwise the submitting session id.
    pub topic: String,
    pub event: String,
    pub payload: Value,
}

/// Broadcaster for progress events using a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct WsBroadcaster {
    sender: broadcast::Sender<WsEvent>,
}

impl WsBroadcaster {
    /// Create a new broadcaster with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Broadcast an event to all connected clients. A send error just
    /// means no one is listening.
    pub fn broadcast(&self, event: WsEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<WsEvent> {
        self.sender.subscribe()
    }
}

impl Default for WsBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl RealtimeChannel for WsBroadcaster {
    async fn publish(
        &self,
        topic: &str,
        event: &str,
        payload: &Value,
    ) -> Result<(), RealtimeError> {
        self.broadcast(WsEvent {
            topic: topic.to_string(),
            event: event.to_string(),
            payload: payload.clone(),
        });
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct WsParams {
    /// Restrict the stream to one topic (course id or session id).
    pub topic: Option<String>,
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params.topic))
}

/// Handle a single WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, topic: Option<String>) {
    let (mut sender, mut receiver) = socket.split();

    let mut rx = state.ws_broadcaster().subscribe();

    WS_CONNECTIONS_TOTAL.inc();
    WS_CONNECTIONS_ACTIVE.inc();

    info!(topic = topic.as_deref().unwrap_or("*"), "WebSocket client connected");

    // Forward broadcast events to this client, filtered by topic when one
    // was requested.
    let send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Some(ref wanted) = topic {
                        if event.topic != *wanted {
                            continue;
                        }
                    }

                    WS_MESSAGES_SENT.with_label_values(&[event.event.as_str()]).inc();

                    match serde_json::to_string(&event) {
                        Ok(json) => {
                            if sender.send(Message::Text(json.into())).await.is_err() {
                                debug!("WebSocket send failed, client disconnected");
                                break;
                            }
                        }
                        Err(e) => {
                            error!("Failed to serialize WsEvent: {}", e);
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("WebSocket client lagged, skipped {} events", n);
                    WS_LAG_EVENTS.inc();
                    // Keep receiving; the client just misses the skipped events.
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Broadcast channel closed");
                    break;
                }
            }
        }
    });

    // Handle incoming messages from the client (ping/pong, close).
    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Close(_)) => {
                debug!("WebSocket client requested close");
                break;
            }
            Ok(Message::Ping(data)) => {
                // Pong is handled automatically by axum
                debug!("Received ping: {:?}", data);
            }
            Ok(Message::Text(text)) => {
                // No client messages are expected on this stream.
                debug!("Received text message: {}", text);
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        }
    }

    send_task.abort();
    WS_CONNECTIONS_ACTIVE.dec();
    info!("WebSocket client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let broadcaster = WsBroadcaster::default();
        let mut rx = broadcaster.subscribe();

        broadcaster
            .publish("course-1", "generation_progress", &json!({"pct": 12.5}))
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.topic, "course-1");
        assert_eq!(event.event, "generation_progress");
        assert_eq!(event.payload["pct"], json!(12.5));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let broadcaster = WsBroadcaster::default();
        let result = broadcaster
            .publish("course-1", "generation_completed", &json!({}))
            .await;
        assert!(result.is_ok());
    }

    #[test]
    fn test_event_serializes_with_camel_case_fields() {
        let event = WsEvent {
            topic: "sess-1".to_string(),
            event: "generation_failed".to_string(),
            payload: json!({"errors": ["boom"]}),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"topic\":\"sess-1\""));
        assert!(json.contains("\"event\":\"generation_failed\""));
        assert!(json.contains("\"errors\""));
    }
}
