//! WebSocket upgrade handler and per-connection event loop.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::broadcast;
use tokio::time;

use crate::AppState;

use super::events::{AuthenticatePayload, ClientEvent, EventName, ServerEvent};
use super::fanout::{OutboundEvent, Recipient};
use super::handler::handle_event;
use super::session::GatewaySession;

/// Close codes (4000-range for application-level).
const CLOSE_UNKNOWN_ERROR: u16 = 4000;
const CLOSE_NOT_AUTHENTICATED: u16 = 4003;
const CLOSE_AUTH_FAILED: u16 = 4004;
const CLOSE_SESSION_TIMEOUT: u16 = 4009;
const CLOSE_SESSION_REPLACED: u16 = 4010;

/// Timeout for receiving the authenticate frame after connection (seconds).
const AUTH_TIMEOUT_SECS: u64 = 10;

pub fn router() -> Router<AppState> {
    Router::new().route("/gateway", get(ws_upgrade))
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Step 1: the first frame must be `authenticate`, within the timeout.
    let handshake = time::timeout(Duration::from_secs(AUTH_TIMEOUT_SECS), async {
        while let Some(msg) = ws_rx.next().await {
            let msg = match msg {
                Ok(m) => m,
                Err(e) => {
                    tracing::debug!(?e, "ws read error during handshake");
                    return Err("read error");
                }
            };

            let text = match msg {
                Message::Text(t) => t,
                Message::Close(_) => return Err("client closed"),
                Message::Ping(_) | Message::Pong(_) => continue,
                _ => continue,
            };

            let frame: ClientEvent = match serde_json::from_str(&text) {
                Ok(f) => f,
                Err(_) => return Err("invalid json"),
            };

            if frame.event != "authenticate" {
                return Err("expected authenticate");
            }

            let payload: AuthenticatePayload =
                serde_json::from_value(frame.data).map_err(|_| "invalid authenticate payload")?;
            return Ok(payload);
        }
        Err("connection closed before authenticate")
    })
    .await;

    let payload = match handshake {
        Ok(Ok(p)) => p,
        Ok(Err(reason)) => {
            tracing::debug!(%reason, "handshake failed");
            let _ = send_close(&mut ws_tx, CLOSE_NOT_AUTHENTICATED, reason).await;
            return;
        }
        Err(_timeout) => {
            let _ = send_close(&mut ws_tx, CLOSE_SESSION_TIMEOUT, "Handshake timeout").await;
            return;
        }
    };

    // Step 2: resolve the credentials to a verified identity.
    let identity = match state
        .auth
        .authenticate(&payload.username, &payload.password)
        .await
    {
        Ok(identity) => identity,
        Err(err) => {
            tracing::debug!(%err, username = %payload.username, "authentication failed");
            // The client gets a structured failure reply before the close.
            let reply = ServerEvent::new(
                EventName::AUTHENTICATED,
                json!({ "success": false, "message": err.to_string() }),
            );
            let reply_json = serde_json::to_string(&reply).unwrap();
            let _ = ws_tx.send(Message::Text(reply_json.into())).await;
            let _ = send_close(&mut ws_tx, CLOSE_AUTH_FAILED, &err.to_string()).await;
            return;
        }
    };

    let session = Arc::new(GatewaySession::new(identity));

    // Subscribe before registering so this session cannot miss presence
    // traffic that follows its own join.
    let broadcast_rx = state.broadcast.subscribe();

    // Last connection wins; the evicted login is told why and closed.
    if let Some(evicted) = state.presence.register(&session.connection_id, &session.username) {
        tracing::info!(
            username = %session.username,
            evicted_connection = %evicted,
            "prior session evicted by new login"
        );
        state.broadcast.dispatch_terminate(
            &evicted,
            EventName::ERROR,
            json!({ "message": "signed in from another location" }),
        );
    }

    // Ack the handshake on the socket directly so it precedes any broadcast.
    let ack = ServerEvent::new(
        EventName::AUTHENTICATED,
        json!({
            "success": true,
            "user": { "id": session.user_id, "username": session.username },
        }),
    );
    let ack_json = serde_json::to_string(&ack).unwrap();
    if ws_tx.send(Message::Text(ack_json.into())).await.is_err() {
        state.presence.unregister(&session.connection_id);
        return;
    }

    tracing::info!(
        connection_id = %session.connection_id,
        username = %session.username,
        "gateway session established"
    );

    state.broadcast.dispatch(
        Recipient::AllExcept(session.connection_id.clone()),
        EventName::USER_JOINED,
        json!({ "username": session.username }),
    );
    broadcast_snapshot(&state);

    run_session(&state, &session, ws_tx, ws_rx, broadcast_rx).await;

    // Tear down presence, then any call attempts the user was part of. An
    // evicted connection unregisters to None and must not announce a leave.
    if let Some(username) = state.presence.unregister(&session.connection_id) {
        state.broadcast.dispatch(
            Recipient::All,
            EventName::USER_LEFT,
            json!({ "username": username }),
        );
        broadcast_snapshot(&state);

        for attempt in state.calls.drop_user(&username) {
            let peer = attempt.peer(&username).to_string();
            if let Some(peer_conn) = state.presence.resolve(&peer) {
                state.broadcast.dispatch(
                    Recipient::Connection(peer_conn),
                    EventName::CALL_ENDED,
                    json!({ "from": username, "reason": "disconnected" }),
                );
            }
        }
    }

    tracing::info!(
        connection_id = %session.connection_id,
        username = %session.username,
        "gateway session ended"
    );
}

/// Full presence snapshot to everyone; sent after every join and leave.
fn broadcast_snapshot(state: &AppState) {
    state.broadcast.dispatch(
        Recipient::All,
        EventName::USER_STATUS_UPDATE,
        json!({ "users": state.presence.snapshot() }),
    );
}

/// Main session event loop: read client frames, forward broadcasts.
async fn run_session(
    state: &AppState,
    session: &Arc<GatewaySession>,
    mut ws_tx: futures_util::stream::SplitSink<WebSocket, Message>,
    mut ws_rx: futures_util::stream::SplitStream<WebSocket>,
    mut broadcast_rx: broadcast::Receiver<Arc<OutboundEvent>>,
) {
    loop {
        tokio::select! {
            // Client sends us a frame.
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let frame: ClientEvent = match serde_json::from_str(&text) {
                            Ok(f) => f,
                            Err(_) => {
                                let _ = send_close(&mut ws_tx, CLOSE_UNKNOWN_ERROR, "Invalid JSON").await;
                                break;
                            }
                        };
                        handle_event(state, session, frame);
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(?e, connection_id = %session.connection_id, "ws read error");
                        break;
                    }
                    _ => continue,
                }
            }

            // Event from the fanout hub.
            result = broadcast_rx.recv() => {
                match result {
                    Ok(payload) => {
                        if !payload.is_for(&session.connection_id) {
                            continue;
                        }

                        let msg = ServerEvent::new(&payload.event, payload.data.clone());
                        let json = serde_json::to_string(&msg).unwrap();
                        if ws_tx.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }

                        if payload.terminate {
                            let _ = send_close(&mut ws_tx, CLOSE_SESSION_REPLACED, "session replaced").await;
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(
                            connection_id = %session.connection_id,
                            skipped = n,
                            "gateway session lagged behind broadcast"
                        );
                        // Keep the session alive; the missed events are dropped.
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        }
    }
}

/// Send a WebSocket close frame with a code and reason.
async fn send_close(
    ws_tx: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    code: u16,
    reason: &str,
) -> Result<(), axum::Error> {
    let close_msg = Message::Close(Some(axum::extract::ws::CloseFrame {
        code,
        reason: reason.to_string().into(),
    }));
    ws_tx.send(close_msg).await
}
