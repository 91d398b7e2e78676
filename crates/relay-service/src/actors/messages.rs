//! Message types for the relay actor mailbox.

use crate::calls::CallStatus;
use crate::protocol::{CallKind, InboundFrame};
use crate::registry::SessionHandle;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Messages handled by the relay actor.
#[derive(Debug)]
pub enum RelayMessage {
    /// Bind an authenticated session to its user id.
    Bind { session: SessionHandle },

    /// One parsed signaling frame from an authenticated session.
    ///
    /// `raw` is the sender's original wire text; negotiation frames are
    /// forwarded from it byte-for-byte.
    Frame {
        from: SessionHandle,
        frame: InboundFrame,
        raw: String,
    },

    /// A session's socket closed.
    Disconnected { user_id: String, session_id: Uuid },

    /// Snapshot one call for inspection.
    GetCall {
        call_id: String,
        respond_to: oneshot::Sender<Option<CallSnapshot>>,
    },

    /// Current registry and call table sizes.
    GetStats {
        respond_to: oneshot::Sender<RelayStats>,
    },
}

/// Point-in-time copy of one call's routing state.
#[derive(Debug, Clone)]
pub struct CallSnapshot {
    pub id: String,
    pub caller_id: String,
    pub receiver_id: String,
    pub kind: CallKind,
    pub status: CallStatus,
}

/// Current relay state sizes.
#[derive(Debug, Clone, Copy)]
pub struct RelayStats {
    /// Bound sessions in the connection registry.
    pub sessions: usize,
    /// Ringing or connecting calls in the call table.
    pub calls: usize,
}
