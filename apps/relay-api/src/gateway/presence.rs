//! In-memory presence registry: who is online right now.
//!
//! Keeps the `username -> connection` and `connection -> username` maps
//! mutually consistent; every operation that touches one touches the other
//! before returning.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

use crate::models::user::Status;

/// Live per-user state. Only users with an active connection are tracked.
struct UserState {
    connection_id: String,
    status: Status,
    last_seen: DateTime<Utc>,
}

/// One row of a presence snapshot broadcast.
#[derive(Debug, Clone, Serialize)]
pub struct PresenceEntry {
    pub username: String,
    pub status: Status,
    pub last_seen: DateTime<Utc>,
}

pub struct PresenceRegistry {
    by_user: DashMap<String, UserState>,
    by_connection: DashMap<String, String>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self {
            by_user: DashMap::new(),
            by_connection: DashMap::new(),
        }
    }

    /// Record a connection for a username. A prior connection registered for
    /// the same username is evicted (last connection wins) and its id is
    /// returned so the caller can notify and close it.
    pub fn register(&self, connection_id: &str, username: &str) -> Option<String> {
        let evicted = self
            .by_user
            .insert(
                username.to_string(),
                UserState {
                    connection_id: connection_id.to_string(),
                    status: Status::Online,
                    last_seen: Utc::now(),
                },
            )
            .map(|prev| prev.connection_id);

        if let Some(old) = &evicted {
            self.by_connection.remove(old);
        }
        self.by_connection
            .insert(connection_id.to_string(), username.to_string());

        evicted
    }

    /// Remove a connection. Returns the username it carried only when that
    /// connection was still the current one for the user; an evicted
    /// connection unregisters to `None` because the user is still online.
    pub fn unregister(&self, connection_id: &str) -> Option<String> {
        let (_, username) = self.by_connection.remove(connection_id)?;
        self.by_user
            .remove_if(&username, |_, state| state.connection_id == connection_id)
            .map(|_| username)
    }

    /// Connection id for a username, or `None` when the user is offline.
    pub fn resolve(&self, username: &str) -> Option<String> {
        self.by_user
            .get(username)
            .map(|state| state.connection_id.clone())
    }

    /// Username behind a connection, or `None` when unregistered.
    pub fn resolve_connection(&self, connection_id: &str) -> Option<String> {
        self.by_connection
            .get(connection_id)
            .map(|name| name.clone())
    }

    /// Update a user's status. Returns the previous status, or `None` when
    /// the user is not online.
    pub fn set_status(&self, username: &str, status: Status) -> Option<Status> {
        let mut state = self.by_user.get_mut(username)?;
        let prev = state.status;
        state.status = status;
        state.last_seen = Utc::now();
        Some(prev)
    }

    /// Full presence snapshot, sorted by username for stable broadcasts.
    pub fn snapshot(&self) -> Vec<PresenceEntry> {
        let mut entries: Vec<PresenceEntry> = self
            .by_user
            .iter()
            .map(|entry| PresenceEntry {
                username: entry.key().clone(),
                status: entry.value().status,
                last_seen: entry.value().last_seen,
            })
            .collect();
        entries.sort_by(|a, b| a.username.cmp(&b.username));
        entries
    }
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_resolve_both_directions() {
        let reg = PresenceRegistry::new();
        assert!(reg.register("conn_1", "alice").is_none());

        assert_eq!(reg.resolve("alice").as_deref(), Some("conn_1"));
        assert_eq!(reg.resolve_connection("conn_1").as_deref(), Some("alice"));
    }

    #[test]
    fn unregister_removes_both_directions() {
        let reg = PresenceRegistry::new();
        reg.register("conn_1", "alice");

        assert_eq!(reg.unregister("conn_1").as_deref(), Some("alice"));
        assert!(reg.resolve("alice").is_none());
        assert!(reg.resolve_connection("conn_1").is_none());
    }

    #[test]
    fn unknown_keys_resolve_to_none() {
        let reg = PresenceRegistry::new();
        assert!(reg.resolve("nobody").is_none());
        assert!(reg.resolve_connection("conn_x").is_none());
        assert!(reg.unregister("conn_x").is_none());
        assert!(reg.set_status("nobody", Status::Away).is_none());
    }

    #[test]
    fn second_login_evicts_the_first() {
        let reg = PresenceRegistry::new();
        reg.register("conn_1", "alice");

        let evicted = reg.register("conn_2", "alice");
        assert_eq!(evicted.as_deref(), Some("conn_1"));
        assert_eq!(reg.resolve("alice").as_deref(), Some("conn_2"));
        assert!(reg.resolve_connection("conn_1").is_none());
    }

    #[test]
    fn evicted_connection_unregisters_to_none() {
        let reg = PresenceRegistry::new();
        reg.register("conn_1", "alice");
        reg.register("conn_2", "alice");

        // The evicted socket closing must not take the user offline.
        assert!(reg.unregister("conn_1").is_none());
        assert_eq!(reg.resolve("alice").as_deref(), Some("conn_2"));
    }

    #[test]
    fn set_status_returns_previous() {
        let reg = PresenceRegistry::new();
        reg.register("conn_1", "alice");

        assert_eq!(reg.set_status("alice", Status::Busy), Some(Status::Online));
        assert_eq!(reg.set_status("alice", Status::Away), Some(Status::Busy));
    }

    #[test]
    fn snapshot_is_sorted_and_current() {
        let reg = PresenceRegistry::new();
        reg.register("conn_2", "bob");
        reg.register("conn_1", "alice");
        reg.set_status("bob", Status::Away);

        let snap = reg.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].username, "alice");
        assert_eq!(snap[0].status, Status::Online);
        assert_eq!(snap[1].username, "bob");
        assert_eq!(snap[1].status, Status::Away);
    }
}
