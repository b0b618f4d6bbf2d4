use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::schema::messages;

/// A relayed chat message. Created exactly once by the relay (id, sender and
/// timestamp are server-assigned, never client-supplied) and immutable after
/// the append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub sender: String,
    /// Opaque text payload; may be a client-encrypted blob the relay never
    /// decrypts.
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub encrypted: bool,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = messages)]
pub struct MessageRow {
    pub id: String,
    pub sender: String,
    pub content: String,
    pub encrypted: bool,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = messages)]
pub struct NewMessageRow<'a> {
    pub id: &'a str,
    pub sender: &'a str,
    pub content: &'a str,
    pub encrypted: bool,
    pub sent_at: DateTime<Utc>,
}

impl From<MessageRow> for ChatMessage {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            sender: row.sender,
            content: row.content,
            timestamp: row.sent_at,
            encrypted: row.encrypted,
        }
    }
}

impl<'a> From<&'a ChatMessage> for NewMessageRow<'a> {
    fn from(message: &'a ChatMessage) -> Self {
        Self {
            id: &message.id,
            sender: &message.sender,
            content: &message.content,
            encrypted: message.encrypted,
            sent_at: message.timestamp,
        }
    }
}
