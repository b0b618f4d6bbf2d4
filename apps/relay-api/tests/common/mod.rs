//! Shared helpers for integration tests: in-memory app state, a real bound
//! server, and a small WebSocket client vocabulary.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tempfile::TempDir;
use tokio::time;
use tokio_tungstenite::tungstenite;

use relay_api::auth::StoreAuthenticator;
use relay_api::config::Config;
use relay_api::gateway::calls::CallRegistry;
use relay_api::gateway::fanout::RelayBroadcast;
use relay_api::gateway::presence::PresenceRegistry;
use relay_api::gateway::relay::MessageRelay;
use relay_api::store::backup::BackupStore;
use relay_api::store::memory::MemoryStore;
use relay_api::store::MessageStore;
use relay_api::AppState;

pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Build an AppState over the given primary store, with backups under the
/// temp dir and no mirror.
pub fn test_state_with_store(store: Arc<dyn MessageStore>, dir: &TempDir) -> AppState {
    let broadcast = RelayBroadcast::new();
    let backups = Arc::new(BackupStore::new(dir.path().join("backups")));
    let relay = Arc::new(MessageRelay::new(
        store.clone(),
        None,
        backups,
        broadcast.clone(),
    ));
    AppState {
        config: Arc::new(Config {
            port: 0,
            database_url: None,
            backup_dir: dir.path().join("backups"),
            mirror_dir: None,
        }),
        auth: Arc::new(StoreAuthenticator::new(store.clone())),
        store,
        presence: Arc::new(PresenceRegistry::new()),
        calls: Arc::new(CallRegistry::new()),
        relay,
        broadcast,
    }
}

pub fn test_state(dir: &TempDir) -> AppState {
    test_state_with_store(Arc::new(MemoryStore::new()), dir)
}

/// Bind the app on an ephemeral port and serve it in the background.
pub async fn start_server(state: AppState) -> SocketAddr {
    let app = relay_api::routes::router().with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}

pub async fn connect(addr: SocketAddr) -> WsStream {
    let url = format!("ws://{addr}/gateway");
    let (ws_stream, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("ws connect");
    ws_stream
}

pub async fn send_event(ws: &mut WsStream, event: &str, data: serde_json::Value) {
    let frame = serde_json::json!({ "event": event, "data": data });
    ws.send(tungstenite::Message::Text(frame.to_string().into()))
        .await
        .expect("send frame");
}

/// Read frames until one with the wanted event name arrives; returns its
/// `data`. Unrelated events (presence churn etc.) are skipped.
pub async fn recv_event(ws: &mut WsStream, want: &str) -> serde_json::Value {
    loop {
        let msg = time::timeout(Duration::from_secs(5), ws.next())
            .await
            .unwrap_or_else(|_| panic!("timeout waiting for `{want}`"))
            .unwrap_or_else(|| panic!("stream ended waiting for `{want}`"))
            .expect("ws read error");

        let text = match msg {
            tungstenite::Message::Text(t) => t,
            tungstenite::Message::Close(frame) => {
                panic!("connection closed waiting for `{want}`: {frame:?}")
            }
            _ => continue,
        };

        let frame: serde_json::Value = serde_json::from_str(&text).expect("parse frame");
        if frame["event"] == want {
            return frame["data"].clone();
        }
    }
}

/// Read the next text frame, whatever its event name.
pub async fn recv_any(ws: &mut WsStream) -> serde_json::Value {
    loop {
        let msg = time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timeout waiting for a frame")
            .expect("stream ended waiting for a frame")
            .expect("ws read error");

        if let tungstenite::Message::Text(text) = msg {
            return serde_json::from_str(&text).expect("parse frame");
        }
    }
}

/// Wait for the server to close the connection; returns the close frame.
pub async fn recv_close(ws: &mut WsStream) -> Option<tungstenite::protocol::CloseFrame> {
    loop {
        let msg = time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timeout waiting for close");

        match msg {
            Some(Ok(tungstenite::Message::Close(frame))) => return frame,
            Some(Ok(_)) => continue,
            Some(Err(_)) | None => return None,
        }
    }
}

/// Connect and run the authenticate handshake; panics unless it succeeds.
pub async fn connect_and_authenticate(addr: SocketAddr, username: &str, password: &str) -> WsStream {
    let mut ws = connect(addr).await;
    send_event(
        &mut ws,
        "authenticate",
        serde_json::json!({ "username": username, "password": password }),
    )
    .await;

    let data = recv_event(&mut ws, "authenticated").await;
    assert_eq!(data["success"], true);
    assert_eq!(data["user"]["username"], username);

    ws
}
