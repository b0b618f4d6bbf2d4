//! Message relay: the append-only log and the write-through storage tiers.
//!
//! A message becomes visible to peers as soon as it is appended; the storage
//! tiers run afterwards on their own task so a slow or failing backend never
//! holds up the broadcast.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde_json::json;
use tracing::{error, info, warn};

use homies_common::id::{prefix, prefixed_ulid};

use super::events::EventName;
use super::fanout::{Recipient, RelayBroadcast};
use crate::models::message::ChatMessage;
use crate::store::backup::BackupStore;
use crate::store::mirror::ObjectStore;
use crate::store::MessageStore;

pub struct MessageRelay {
    log: Mutex<Vec<ChatMessage>>,
    store: Arc<dyn MessageStore>,
    mirror: Option<Arc<dyn ObjectStore>>,
    backups: Arc<BackupStore>,
    broadcast: RelayBroadcast,
}

impl MessageRelay {
    pub fn new(
        store: Arc<dyn MessageStore>,
        mirror: Option<Arc<dyn ObjectStore>>,
        backups: Arc<BackupStore>,
        broadcast: RelayBroadcast,
    ) -> Self {
        Self {
            log: Mutex::new(Vec::new()),
            store,
            mirror,
            backups,
            broadcast,
        }
    }

    /// Restore the log after a restart: the primary store is preferred, the
    /// most recent readable local backup is the fallback.
    pub async fn rehydrate(&self) {
        match self.store.list_messages().await {
            Ok(messages) if !messages.is_empty() => {
                info!(count = messages.len(), "message log restored from primary store");
                *self.log.lock() = messages;
                return;
            }
            Ok(_) => {}
            Err(err) => {
                warn!(%err, "primary store unavailable during rehydration");
            }
        }

        match self.backups.load_latest().await {
            Ok(Some(messages)) => {
                info!(count = messages.len(), "message log restored from local backup");
                *self.log.lock() = messages;
            }
            Ok(None) => {}
            Err(err) => {
                warn!(%err, "backup load failed during rehydration");
            }
        }
    }

    /// Enrich, append, broadcast, then persist in the background. `sender`
    /// must already be registry-resolved; the relay never trusts a
    /// client-claimed sender.
    pub fn send(self: &Arc<Self>, sender: &str, content: &str, encrypted: bool) -> ChatMessage {
        let message = {
            let mut log = self.log.lock();
            let now = Utc::now();
            // Clamp against the previous append so timestamps never regress
            // even if the wall clock does.
            let timestamp = match log.last() {
                Some(prev) => prev.timestamp.max(now),
                None => now,
            };
            let message = ChatMessage {
                id: prefixed_ulid(prefix::MESSAGE),
                sender: sender.to_string(),
                content: content.to_string(),
                timestamp,
                encrypted,
            };
            log.push(message.clone());

            // Publish while still holding the log lock: `broadcast::Sender`
            // is synchronous, and keeping append + publish in one critical
            // section is what guarantees peers see the append order.
            self.broadcast.dispatch(
                Recipient::All,
                EventName::NEW_MESSAGE,
                serde_json::to_value(&message).unwrap_or(json!({})),
            );

            message
        };

        let relay = Arc::clone(self);
        let to_persist = message.clone();
        tokio::spawn(async move {
            relay.persist(to_persist).await;
        });

        message
    }

    /// Full ordered log, bounded by process lifetime.
    pub fn history(&self) -> Vec<ChatMessage> {
        self.log.lock().clone()
    }

    /// Write-through: primary store, mirror on primary failure, local backup
    /// in every case. Failures here are logged and go no further.
    async fn persist(&self, message: ChatMessage) {
        if let Err(err) = self.store.insert_message(&message).await {
            warn!(%err, id = %message.id, "primary store write failed");

            if let Some(mirror) = &self.mirror {
                match serde_json::to_vec(&message) {
                    Ok(bytes) => {
                        let key = format!("{}.json", message.id);
                        if let Err(err) = mirror.write_blob(&key, &bytes).await {
                            warn!(%err, id = %message.id, "mirror write failed");
                        }
                    }
                    Err(err) => warn!(%err, id = %message.id, "could not serialize message for mirror"),
                }
            }
        }

        let full_log = self.history();
        if let Err(err) = self.backups.snapshot(&full_log).await {
            error!(%err, "backup snapshot failed");
        }
    }
}
