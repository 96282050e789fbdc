//! WebSocket chat relay at `/ws`.
//!
//! One process-wide broadcast hub; every connection subscribes on upgrade.
//! An inbound `chat_message` envelope is persisted through the storage
//! driver, then the stored record is rebroadcast to every open connection,
//! the sender included. Malformed frames are logged and skipped without
//! closing the connection.

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::models::{Message, NewMessage};
use crate::state::AppState;

const CHAT_MESSAGE: &str = "chat_message";
const HUB_CAPACITY: usize = 256;

/// Inbound client envelope.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    job_id: String,
    sender_id: String,
    content: String,
}

/// Outbound broadcast frame wrapping the persisted message.
#[derive(Debug, Serialize)]
struct Outbound<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    data: &'a Message,
}

/// Process-wide broadcast registry for chat frames.
#[derive(Clone)]
pub struct ChatHub {
    tx: broadcast::Sender<String>,
}

impl Default for ChatHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(HUB_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    pub fn broadcast(&self, frame: String) {
        // No receivers connected is not an error.
        let _ = self.tx.send(frame);
    }
}

pub async fn ws_handler(
    State(state): State<AppState>,
    upgrade: WebSocketUpgrade,
) -> impl IntoResponse {
    upgrade.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    debug!("WebSocket client connected");
    let mut rx = state.chat.subscribe();
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            frame = rx.recv() => match frame {
                Ok(text) => {
                    if sink.send(WsMessage::Text(text)).await.is_err() {
                        break;
                    }
                }
                // Slow consumer fell behind the hub; skip the lost frames.
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "WebSocket client lagged behind chat hub");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            inbound = stream.next() => match inbound {
                Some(Ok(WsMessage::Text(text))) => {
                    handle_chat_frame(&state, &text).await;
                }
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => {} // ignore binary/ping/pong
                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket receive error");
                    break;
                }
            },
        }
    }
    debug!("WebSocket client disconnected");
}

async fn handle_chat_frame(state: &AppState, text: &str) {
    let envelope: Envelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, "malformed WebSocket payload");
            return;
        }
    };
    if envelope.kind != CHAT_MESSAGE {
        return;
    }

    let saved = state
        .storage
        .create_message(NewMessage {
            job_id: envelope.job_id,
            sender_id: envelope.sender_id,
            content: envelope.content,
        })
        .await;

    match saved {
        Ok(message) => {
            let frame = Outbound {
                kind: CHAT_MESSAGE,
                data: &message,
            };
            match serde_json::to_string(&frame) {
                Ok(json) => state.chat.broadcast(json),
                Err(e) => warn!(error = %e, "failed to encode chat frame"),
            }
        }
        Err(e) => warn!(error = %e, "failed to persist chat message"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_parses_wire_format() {
        let envelope: Envelope = serde_json::from_str(
            r#"{"type":"chat_message","jobId":"j1","senderId":"u1","content":"hi"}"#,
        )
        .unwrap();
        assert_eq!(envelope.kind, "chat_message");
        assert_eq!(envelope.job_id, "j1");
        assert_eq!(envelope.sender_id, "u1");
        assert_eq!(envelope.content, "hi");
    }

    #[tokio::test]
    async fn chat_frame_is_persisted_and_broadcast() {
        let state = AppState::fake();
        let mut rx = state.chat.subscribe();

        handle_chat_frame(
            &state,
            r#"{"type":"chat_message","jobId":"j1","senderId":"u1","content":"hi"}"#,
        )
        .await;

        let frame = rx.try_recv().unwrap();
        let v: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(v["type"], "chat_message");
        assert_eq!(v["data"]["content"], "hi");

        let stored = state.storage.get_messages("j1").await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn malformed_frame_is_ignored() {
        let state = AppState::fake();
        let mut rx = state.chat.subscribe();
        handle_chat_frame(&state, "not json").await;
        handle_chat_frame(&state, r#"{"type":"other","jobId":"j","senderId":"u","content":"x"}"#)
            .await;
        assert!(rx.try_recv().is_err());
    }
}
