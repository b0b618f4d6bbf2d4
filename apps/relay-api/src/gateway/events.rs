//! Wire-format frames and typed event payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// A frame received from the client: `{"event": "...", "data": {...}}`.
#[derive(Debug, Deserialize)]
pub struct ClientEvent {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

/// A frame sent to the client, same shape as [`ClientEvent`].
#[derive(Debug, Clone, Serialize)]
pub struct ServerEvent {
    pub event: String,
    pub data: Value,
}

impl ServerEvent {
    pub fn new(event: &str, data: Value) -> Self {
        Self {
            event: event.to_string(),
            data,
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AuthenticatePayload {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SendMessagePayload {
    pub content: Option<String>,
    #[serde(default)]
    pub encrypted: bool,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdatePayload {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct CallOfferPayload {
    pub target: String,
    #[serde(default)]
    pub offer: Value,
}

#[derive(Debug, Deserialize)]
pub struct CallAnswerPayload {
    pub target: String,
    #[serde(default)]
    pub answer: Value,
}

#[derive(Debug, Deserialize)]
pub struct IceCandidatePayload {
    pub target: String,
    #[serde(default)]
    pub candidate: Value,
}

#[derive(Debug, Deserialize)]
pub struct CallControlPayload {
    pub target: String,
    #[serde(default)]
    pub reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Outbound event names
// ---------------------------------------------------------------------------

/// Event names emitted to clients.
pub struct EventName;

impl EventName {
    pub const AUTHENTICATED: &'static str = "authenticated";
    pub const NEW_MESSAGE: &'static str = "new-message";
    pub const MESSAGE_HISTORY: &'static str = "message-history";
    pub const USER_JOINED: &'static str = "user-joined";
    pub const USER_LEFT: &'static str = "user-left";
    pub const USER_STATUS_UPDATE: &'static str = "user-status-update";
    pub const USER_STATUS_CHANGE: &'static str = "user-status-change";
    pub const USER_TYPING: &'static str = "user-typing";
    pub const USER_STOPPED_TYPING: &'static str = "user-stopped-typing";
    pub const CALL_OFFER: &'static str = "call-offer";
    pub const CALL_ANSWER: &'static str = "call-answer";
    pub const ICE_CANDIDATE: &'static str = "ice-candidate";
    pub const CALL_DECLINED: &'static str = "call-declined";
    pub const CALL_ENDED: &'static str = "call-ended";
    pub const CALL_ERROR: &'static str = "call-error";
    pub const ERROR: &'static str = "error";
}
