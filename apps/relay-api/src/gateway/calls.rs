//! Call-attempt registry for the WebRTC signaling relay.
//!
//! All state is ephemeral; an in-progress call cannot survive a server
//! restart. At most one attempt may exist per unordered username pair.

use dashmap::DashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    Ringing,
    Connected,
}

#[derive(Debug, Clone)]
pub struct CallAttempt {
    pub caller: String,
    pub callee: String,
    pub phase: CallPhase,
}

impl CallAttempt {
    /// The other participant, from `username`'s point of view.
    pub fn peer(&self, username: &str) -> &str {
        if self.caller == username {
            &self.callee
        } else {
            &self.caller
        }
    }
}

/// Normalize the pair so lookups are order-independent.
fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

pub struct CallRegistry {
    attempts: DashMap<(String, String), CallAttempt>,
}

impl CallRegistry {
    pub fn new() -> Self {
        Self {
            attempts: DashMap::new(),
        }
    }

    /// Record a new ringing attempt. Returns `false` when the pair already
    /// has an active attempt (single-call-per-pair).
    pub fn offer(&self, caller: &str, callee: &str) -> bool {
        match self.attempts.entry(pair_key(caller, callee)) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(CallAttempt {
                    caller: caller.to_string(),
                    callee: callee.to_string(),
                    phase: CallPhase::Ringing,
                });
                true
            }
        }
    }

    /// Move the pair's attempt to Connected. Returns `false` when no attempt
    /// exists for the pair.
    pub fn answer(&self, a: &str, b: &str) -> bool {
        match self.attempts.get_mut(&pair_key(a, b)) {
            Some(mut attempt) => {
                attempt.phase = CallPhase::Connected;
                true
            }
            None => false,
        }
    }

    /// Remove the pair's attempt (decline, hangup, or error).
    pub fn clear(&self, a: &str, b: &str) -> Option<CallAttempt> {
        self.attempts.remove(&pair_key(a, b)).map(|(_, v)| v)
    }

    pub fn active(&self, a: &str, b: &str) -> Option<CallAttempt> {
        self.attempts.get(&pair_key(a, b)).map(|v| v.clone())
    }

    /// Remove every attempt involving `username`. Returns the removed
    /// attempts so the caller can signal each remaining peer.
    pub fn drop_user(&self, username: &str) -> Vec<CallAttempt> {
        let keys: Vec<(String, String)> = self
            .attempts
            .iter()
            .filter(|entry| entry.caller == username || entry.callee == username)
            .map(|entry| entry.key().clone())
            .collect();

        keys.into_iter()
            .filter_map(|key| self.attempts.remove(&key).map(|(_, v)| v))
            .collect()
    }
}

impl Default for CallRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offer_answer_clear_lifecycle() {
        let calls = CallRegistry::new();

        assert!(calls.offer("alice", "bob"));
        assert_eq!(calls.active("bob", "alice").unwrap().phase, CallPhase::Ringing);

        assert!(calls.answer("bob", "alice"));
        assert_eq!(calls.active("alice", "bob").unwrap().phase, CallPhase::Connected);

        let attempt = calls.clear("alice", "bob").unwrap();
        assert_eq!(attempt.caller, "alice");
        assert!(calls.active("alice", "bob").is_none());
    }

    #[test]
    fn second_offer_for_pair_is_rejected() {
        let calls = CallRegistry::new();
        assert!(calls.offer("alice", "bob"));
        assert!(!calls.offer("alice", "bob"));
        // Direction doesn't matter.
        assert!(!calls.offer("bob", "alice"));
        // A different callee is a different pair.
        assert!(calls.offer("alice", "carol"));
    }

    #[test]
    fn answer_without_offer_fails() {
        let calls = CallRegistry::new();
        assert!(!calls.answer("alice", "bob"));
    }

    #[test]
    fn drop_user_returns_peers_to_notify() {
        let calls = CallRegistry::new();
        calls.offer("alice", "bob");
        calls.offer("carol", "alice");
        calls.offer("bob", "carol");

        let mut dropped = calls.drop_user("alice");
        dropped.sort_by(|a, b| a.peer("alice").cmp(b.peer("alice")));
        assert_eq!(dropped.len(), 2);
        assert_eq!(dropped[0].peer("alice"), "bob");
        assert_eq!(dropped[1].peer("alice"), "carol");

        // The bob↔carol call is untouched.
        assert!(calls.active("bob", "carol").is_some());
        assert!(calls.active("alice", "bob").is_none());
    }
}
