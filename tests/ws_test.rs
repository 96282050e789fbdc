//! Chat relay test over a real socket: two clients, one sender, both
//! receive the persisted broadcast.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use taskgrid::app::build_app;
use taskgrid::state::AppState;

type WsClient = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

async fn spawn_server(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_app(state)).await.unwrap();
    });
    format!("ws://{addr}/ws")
}

/// Read frames until a `chat_message` arrives; panics on timeout.
async fn next_chat_frame(client: &mut WsClient) -> Value {
    loop {
        let frame = timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for chat frame")
            .expect("connection closed")
            .expect("receive error");
        if let WsMessage::Text(text) = frame {
            let v: Value = serde_json::from_str(&text).unwrap();
            if v["type"] == "chat_message" {
                return v;
            }
        }
    }
}

#[tokio::test]
async fn chat_message_is_echoed_to_both_clients() {
    let state = AppState::fake();
    let url = spawn_server(state.clone()).await;

    let (mut alice, _) = connect_async(&url).await.unwrap();
    let (mut bob, _) = connect_async(&url).await.unwrap();

    alice
        .send(WsMessage::Text(
            r#"{"type":"chat_message","jobId":"j1","senderId":"u1","content":"hi"}"#.into(),
        ))
        .await
        .unwrap();

    let for_alice = next_chat_frame(&mut alice).await;
    let for_bob = next_chat_frame(&mut bob).await;

    for frame in [&for_alice, &for_bob] {
        assert_eq!(frame["type"], "chat_message");
        assert_eq!(frame["data"]["jobId"], "j1");
        assert_eq!(frame["data"]["senderId"], "u1");
        assert_eq!(frame["data"]["content"], "hi");
        assert!(frame["data"]["id"].is_string());
    }

    let stored = state.storage.get_messages("j1").await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].content, "hi");
}

#[tokio::test]
async fn malformed_frame_leaves_the_connection_open() {
    let state = AppState::fake();
    let url = spawn_server(state.clone()).await;

    let (mut client, _) = connect_async(&url).await.unwrap();
    client
        .send(WsMessage::Text("not json".into()))
        .await
        .unwrap();

    // The connection survives and still relays the next valid message.
    client
        .send(WsMessage::Text(
            r#"{"type":"chat_message","jobId":"j2","senderId":"u2","content":"still here"}"#
                .into(),
        ))
        .await
        .unwrap();

    let frame = next_chat_frame(&mut client).await;
    assert_eq!(frame["data"]["content"], "still here");
}
