//! Connection registry: user id to live session mapping.
//!
//! Owned exclusively by the relay actor, so there is no interior locking.
//! A user has at most one bound session; a second login silently replaces
//! the first. Unbinding on disconnect is session-guarded so a displaced
//! socket closing late cannot evict its successor's binding.

use tokio::sync::mpsc;
use uuid::Uuid;

/// Handle to one authenticated WebSocket session.
///
/// Cloning is cheap; the outbound sender fans into the per-connection write
/// task. Sends are fire-and-forget: a full or closed queue drops the frame.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    /// Unique per-socket id, distinguishes successive sessions of one user.
    pub session_id: Uuid,

    /// Authenticated user id from the bearer token.
    pub user_id: String,

    /// Outbound frame queue, drained by the connection's write task.
    pub outbound: mpsc::Sender<String>,
}

impl SessionHandle {
    /// Queue a frame for delivery, dropping it if the session is gone or
    /// its queue is full. Returns whether the frame was queued.
    pub fn send(&self, frame: String) -> bool {
        match self.outbound.try_send(frame) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(
                    target: "relay.conn",
                    session_id = %self.session_id,
                    error = %e,
                    "Dropped outbound frame"
                );
                crate::observability::metrics::increment_frames_dropped();
                false
            }
        }
    }
}

/// Map of user id to the session currently speaking for that user.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    sessions: std::collections::HashMap<String, SessionHandle>,
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a session to its user id, displacing any previous session for
    /// the same user. Returns the displaced session, if any.
    pub fn bind(&mut self, session: SessionHandle) -> Option<SessionHandle> {
        let previous = self.sessions.insert(session.user_id.clone(), session);
        if let Some(prev) = &previous {
            tracing::info!(
                target: "relay.conn",
                user_id = %prev.user_id,
                old_session_id = %prev.session_id,
                "Session displaced by newer login"
            );
        }
        previous
    }

    /// Look up the live session for a user.
    #[must_use]
    pub fn lookup(&self, user_id: &str) -> Option<&SessionHandle> {
        self.sessions.get(user_id)
    }

    /// Remove a user's binding only if it still belongs to `session_id`.
    ///
    /// Returns true if a binding was removed. A mismatch means the user
    /// already rebound with a newer session; that binding is left alone.
    pub fn unbind_session(&mut self, user_id: &str, session_id: Uuid) -> bool {
        match self.sessions.get(user_id) {
            Some(current) if current.session_id == session_id => {
                self.sessions.remove(user_id);
                true
            }
            _ => false,
        }
    }

    /// Number of bound sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn session(user_id: &str) -> SessionHandle {
        let (tx, _rx) = mpsc::channel(8);
        SessionHandle {
            session_id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            outbound: tx,
        }
    }

    #[test]
    fn test_bind_and_lookup() {
        let mut registry = ConnectionRegistry::new();
        let alice = session("alice");

        assert!(registry.bind(alice.clone()).is_none());

        let found = registry.lookup("alice").expect("alice should be bound");
        assert_eq!(found.session_id, alice.session_id);
        assert!(registry.lookup("bob").is_none());
    }

    #[test]
    fn test_rebind_displaces_previous_session() {
        let mut registry = ConnectionRegistry::new();
        let first = session("alice");
        let second = session("alice");

        registry.bind(first.clone());
        let displaced = registry.bind(second.clone()).expect("should displace");

        assert_eq!(displaced.session_id, first.session_id);
        assert_eq!(
            registry.lookup("alice").expect("bound").session_id,
            second.session_id
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unbind_session_removes_matching_binding() {
        let mut registry = ConnectionRegistry::new();
        let alice = session("alice");
        registry.bind(alice.clone());

        assert!(registry.unbind_session("alice", alice.session_id));
        assert!(registry.lookup("alice").is_none());
    }

    #[test]
    fn test_unbind_session_ignores_stale_session_id() {
        let mut registry = ConnectionRegistry::new();
        let old = session("alice");
        let new = session("alice");

        registry.bind(old.clone());
        registry.bind(new.clone());

        // The displaced socket closes late; the new binding must survive.
        assert!(!registry.unbind_session("alice", old.session_id));
        assert_eq!(
            registry.lookup("alice").expect("bound").session_id,
            new.session_id
        );
    }

    #[test]
    fn test_unbind_unknown_user_is_noop() {
        let mut registry = ConnectionRegistry::new();
        assert!(!registry.unbind_session("ghost", Uuid::new_v4()));
    }

    #[tokio::test]
    async fn test_send_delivers_frame() {
        let (tx, mut rx) = mpsc::channel(8);
        let handle = SessionHandle {
            session_id: Uuid::new_v4(),
            user_id: "alice".to_string(),
            outbound: tx,
        };

        assert!(handle.send("hello".to_string()));
        assert_eq!(rx.recv().await.expect("frame"), "hello");
    }

    #[tokio::test]
    async fn test_send_to_closed_session_reports_drop() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let handle = SessionHandle {
            session_id: Uuid::new_v4(),
            user_id: "alice".to_string(),
            outbound: tx,
        };

        assert!(!handle.send("hello".to_string()));
    }
}
