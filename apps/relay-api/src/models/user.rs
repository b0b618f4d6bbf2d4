use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::schema::users;
use homies_common::id::{prefix, prefixed_ulid};

/// Presence status a user can advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Online,
    Away,
    Busy,
    Offline,
}

impl Status {
    /// Parse a client-sent status string. Anything outside the recognized set
    /// is rejected rather than defaulted.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "online" => Some(Self::Online),
            "away" => Some(Self::Away),
            "busy" => Some(Self::Busy),
            "offline" => Some(Self::Offline),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Away => "away",
            Self::Busy => "busy",
            Self::Offline => "offline",
        }
    }
}

/// A stored user account. The relay only ever reads the identity fields;
/// password verification happens behind the `Authenticator` seam.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = users)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub status: String,
    pub last_seen_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(username: &str, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: prefixed_ulid(prefix::USER),
            username: username.to_string(),
            password_hash,
            status: Status::Offline.as_str().to_string(),
            last_seen_at: now,
            created_at: now,
        }
    }
}
