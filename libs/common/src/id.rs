//! Prefixed ULID identifiers shared across the workspace.
//!
//! Ids take the form `<prefix>_<ULID>`: sortable by creation time and
//! unambiguous about the kind of entity they name.

use ulid::Ulid;

/// Length of the textual ULID component.
const ULID_LEN: usize = 26;

/// Well-known id prefixes.
pub mod prefix {
    /// Persistent user account.
    pub const USER: &str = "usr";
    /// Ephemeral WebSocket connection; never persisted.
    pub const CONNECTION: &str = "conn";
    /// Relayed chat message.
    pub const MESSAGE: &str = "msg";
}

/// Mint a fresh id for the given prefix.
pub fn prefixed_ulid(prefix: &str) -> String {
    format!("{prefix}_{}", Ulid::new())
}

/// True when `id` is a well-formed `<prefix>_<ULID>` for the given prefix.
pub fn has_prefix(id: &str, prefix: &str) -> bool {
    id.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('_'))
        .map(|ulid| ulid.len() == ULID_LEN && Ulid::from_string(ulid).is_ok())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_ids_carry_their_prefix() {
        let id = prefixed_ulid(prefix::MESSAGE);
        assert!(has_prefix(&id, prefix::MESSAGE));
        assert!(!has_prefix(&id, prefix::USER));
    }

    #[test]
    fn malformed_ids_are_rejected() {
        assert!(!has_prefix("msg-noseparator", prefix::MESSAGE));
        assert!(!has_prefix("msg_tooshort", prefix::MESSAGE));
        assert!(!has_prefix("", prefix::MESSAGE));
        // Right shape, wrong alphabet.
        assert!(!has_prefix("msg_!!!!!!!!!!!!!!!!!!!!!!!!!!", prefix::MESSAGE));
    }

    #[test]
    fn ids_are_unique_and_time_sortable() {
        let a = prefixed_ulid(prefix::USER);
        let b = prefixed_ulid(prefix::USER);
        assert_ne!(a, b);
        assert!(b >= a);
    }
}
