//! Shared wiring for the API integration tests: a router over in-memory
//! tiers, a live server on an ephemeral port and WebSocket helpers.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tiernote_api::{create_api_router, ApiConfig, AppState};
use tiernote_test_utils::fixtures::{memory_store, MemoryTiers};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

pub fn test_config() -> ApiConfig {
    ApiConfig::from_lookup(|_| None).expect("default config")
}

pub fn test_router(threshold: usize) -> (Router, MemoryTiers) {
    test_router_with_config(threshold, &test_config())
}

pub fn test_router_with_config(threshold: usize, config: &ApiConfig) -> (Router, MemoryTiers) {
    let tiers = memory_store(threshold);
    let router = create_api_router(AppState::new(tiers.store.clone()), config);
    (router, tiers)
}

/// Serve the router on 127.0.0.1 with an ephemeral port.
pub async fn spawn_server(threshold: usize) -> (SocketAddr, MemoryTiers) {
    let (router, tiers) = test_router(threshold);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    (addr, tiers)
}

/// Open a client and consume the `connected` greeting.
pub async fn connect(addr: SocketAddr) -> WsClient {
    let (mut ws, _) = connect_async(format!("ws://{}/ws", addr))
        .await
        .expect("websocket handshake");
    let greeting = next_event(&mut ws).await;
    assert_eq!(greeting["type"], "connected");
    ws
}

pub async fn send_json(ws: &mut WsClient, value: Value) {
    ws.send(Message::Text(value.to_string()))
        .await
        .expect("send frame");
}

pub async fn send_raw(ws: &mut WsClient, text: &str) {
    ws.send(Message::Text(text.to_string()))
        .await
        .expect("send frame");
}

/// Next text frame as JSON, skipping control frames.
pub async fn next_event(ws: &mut WsClient) -> Value {
    tokio::time::timeout(FRAME_TIMEOUT, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str::<Value>(&text).expect("json frame")
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => panic!("websocket error: {}", e),
                None => panic!("websocket closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for frame")
}

/// Next two frames, returned as (ack, notesChanged) whatever order they arrive in.
pub async fn ack_and_change(ws: &mut WsClient) -> (Value, Value) {
    let first = next_event(ws).await;
    let second = next_event(ws).await;
    if first["type"] == "ack" {
        (first, second)
    } else {
        (second, first)
    }
}

/// Assert no text frame arrives within `wait`.
pub async fn assert_silent(ws: &mut WsClient, wait: Duration) {
    let result = tokio::time::timeout(wait, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return text,
                Some(Ok(_)) => continue,
                _ => std::future::pending::<()>().await,
            }
        }
    })
    .await;
    if let Ok(text) = result {
        panic!("unexpected frame: {}", text);
    }
}
