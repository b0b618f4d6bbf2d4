//! Broadcast hub for dispatching relay events to connected sessions.
//!
//! Uses a single `tokio::sync::broadcast` channel. Each connected session
//! subscribes and filters payloads locally against the [`Recipient`], which
//! keeps targeted delivery and fan-out on one primitive.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;

/// Capacity of the broadcast channel. Slow receivers that fall behind will
/// skip messages (RecvError::Lagged).
const BROADCAST_CAPACITY: usize = 4096;

/// Who a payload is addressed to. Sessions compare against their own
/// connection id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    All,
    AllExcept(String),
    Connection(String),
}

/// A payload published to the hub.
#[derive(Debug, Clone)]
pub struct OutboundEvent {
    pub recipient: Recipient,
    pub event: String,
    pub data: Value,
    /// When set, the receiving session delivers the event and then closes
    /// its socket. Used to force-disconnect an evicted login.
    pub terminate: bool,
}

impl OutboundEvent {
    pub fn is_for(&self, connection_id: &str) -> bool {
        match &self.recipient {
            Recipient::All => true,
            Recipient::AllExcept(skip) => skip != connection_id,
            Recipient::Connection(target) => target == connection_id,
        }
    }
}

/// The global broadcast hub. Cheap to clone; lives in AppState.
#[derive(Clone)]
pub struct RelayBroadcast {
    sender: broadcast::Sender<Arc<OutboundEvent>>,
}

impl RelayBroadcast {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { sender }
    }

    /// Subscribe to the hub. Each session calls this once.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<OutboundEvent>> {
        self.sender.subscribe()
    }

    pub fn dispatch(&self, recipient: Recipient, event: &str, data: Value) {
        // send() returns Err when no receivers exist, which is fine.
        let _ = self.sender.send(Arc::new(OutboundEvent {
            recipient,
            event: event.to_string(),
            data,
            terminate: false,
        }));
    }

    /// Deliver one final event to a connection and have it close afterwards.
    pub fn dispatch_terminate(&self, connection_id: &str, event: &str, data: Value) {
        let _ = self.sender.send(Arc::new(OutboundEvent {
            recipient: Recipient::Connection(connection_id.to_string()),
            event: event.to_string(),
            data,
            terminate: true,
        }));
    }
}

impl Default for RelayBroadcast {
    fn default() -> Self {
        Self::new()
    }
}
