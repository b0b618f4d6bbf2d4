//! Per-connection session state.

use homies_common::id::{prefix, prefixed_ulid};

use crate::auth::Identity;

/// State for a single WebSocket connection, fixed at handshake time.
pub struct GatewaySession {
    /// Ephemeral transport identifier (`conn_` prefixed ULID). Never
    /// persisted; dies with the connection.
    pub connection_id: String,
    /// Authenticated user id.
    pub user_id: String,
    /// Authenticated username (cached at handshake time).
    pub username: String,
}

impl GatewaySession {
    pub fn new(identity: Identity) -> Self {
        Self {
            connection_id: prefixed_ulid(prefix::CONNECTION),
            user_id: identity.user_id,
            username: identity.username,
        }
    }
}
