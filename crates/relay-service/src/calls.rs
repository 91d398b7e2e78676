//! Call table: active and ringing calls by client-chosen call id.
//!
//! Owned exclusively by the relay actor. Terminal calls (declined, ended)
//! are removed immediately rather than marked, so the table only ever holds
//! calls a signaling frame can still legitimately reference.

use crate::protocol::CallKind;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Lifecycle state of a tracked call.
///
/// There is no terminal variant: declined and ended calls leave the table
/// instead of being marked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    /// `call:start` routed, waiting for the receiver's answer.
    Ringing,
    /// Receiver accepted; peers are exchanging negotiation frames.
    Connecting,
}

impl CallStatus {
    /// Stable label for logs and metrics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CallStatus::Ringing => "ringing",
            CallStatus::Connecting => "connecting",
        }
    }
}

/// One tracked call between two users.
#[derive(Debug, Clone)]
pub struct Call {
    /// Client-chosen call id, the routing key for every later frame.
    pub id: String,
    pub caller_id: String,
    pub receiver_id: String,
    pub kind: CallKind,
    pub status: CallStatus,
    pub started_at: DateTime<Utc>,
}

impl Call {
    /// The other participant of the call, or None if `user_id` is not a
    /// participant.
    #[must_use]
    pub fn peer_of(&self, user_id: &str) -> Option<&str> {
        if user_id == self.caller_id {
            Some(&self.receiver_id)
        } else if user_id == self.receiver_id {
            Some(&self.caller_id)
        } else {
            None
        }
    }
}

/// All calls currently ringing or connecting, keyed by call id.
#[derive(Debug, Default)]
pub struct CallTable {
    calls: HashMap<String, Call>,
}

impl CallTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new ringing call. Returns false if the id is already taken,
    /// leaving the existing call untouched.
    pub fn create(
        &mut self,
        id: String,
        caller_id: String,
        receiver_id: String,
        kind: CallKind,
    ) -> bool {
        if self.calls.contains_key(&id) {
            return false;
        }
        self.calls.insert(
            id.clone(),
            Call {
                id,
                caller_id,
                receiver_id,
                kind,
                status: CallStatus::Ringing,
                started_at: Utc::now(),
            },
        );
        true
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Call> {
        self.calls.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Call> {
        self.calls.get_mut(id)
    }

    /// Remove a call, returning it if it existed.
    pub fn remove(&mut self, id: &str) -> Option<Call> {
        self.calls.remove(id)
    }

    /// Remove and return every call `user_id` participates in, as caller or
    /// receiver. Used by the disconnect reaper.
    pub fn remove_involving(&mut self, user_id: &str) -> Vec<Call> {
        let ids: Vec<String> = self
            .calls
            .values()
            .filter(|c| c.caller_id == user_id || c.receiver_id == user_id)
            .map(|c| c.id.clone())
            .collect();

        ids.iter().filter_map(|id| self.calls.remove(id)).collect()
    }

    /// Number of tracked calls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn table_with_call(id: &str, caller: &str, receiver: &str) -> CallTable {
        let mut table = CallTable::new();
        assert!(table.create(
            id.to_string(),
            caller.to_string(),
            receiver.to_string(),
            CallKind::Video,
        ));
        table
    }

    #[test]
    fn test_create_starts_ringing() {
        let table = table_with_call("c1", "alice", "bob");

        let call = table.get("c1").expect("call should exist");
        assert_eq!(call.status, CallStatus::Ringing);
        assert_eq!(call.caller_id, "alice");
        assert_eq!(call.receiver_id, "bob");
        assert_eq!(call.kind, CallKind::Video);
    }

    #[test]
    fn test_create_rejects_duplicate_id() {
        let mut table = table_with_call("c1", "alice", "bob");

        assert!(!table.create(
            "c1".to_string(),
            "mallory".to_string(),
            "bob".to_string(),
            CallKind::Audio,
        ));
        // Original call untouched
        assert_eq!(table.get("c1").expect("call").caller_id, "alice");
    }

    #[test]
    fn test_peer_of() {
        let table = table_with_call("c1", "alice", "bob");
        let call = table.get("c1").expect("call");

        assert_eq!(call.peer_of("alice"), Some("bob"));
        assert_eq!(call.peer_of("bob"), Some("alice"));
        assert_eq!(call.peer_of("mallory"), None);
    }

    #[test]
    fn test_remove_returns_call() {
        let mut table = table_with_call("c1", "alice", "bob");

        let removed = table.remove("c1").expect("call should be removed");
        assert_eq!(removed.id, "c1");
        assert!(table.get("c1").is_none());
        assert!(table.remove("c1").is_none());
    }

    #[test]
    fn test_remove_involving_reaps_both_roles() {
        let mut table = CallTable::new();
        table.create("c1".into(), "alice".into(), "bob".into(), CallKind::Video);
        table.create("c2".into(), "carol".into(), "alice".into(), CallKind::Audio);
        table.create("c3".into(), "carol".into(), "dave".into(), CallKind::Audio);

        let mut reaped: Vec<String> = table
            .remove_involving("alice")
            .into_iter()
            .map(|c| c.id)
            .collect();
        reaped.sort();

        assert_eq!(reaped, vec!["c1", "c2"]);
        assert_eq!(table.len(), 1);
        assert!(table.get("c3").is_some());
    }

    #[test]
    fn test_remove_involving_uninvolved_user_is_noop() {
        let mut table = table_with_call("c1", "alice", "bob");
        assert!(table.remove_involving("mallory").is_empty());
        assert_eq!(table.len(), 1);
    }
}
