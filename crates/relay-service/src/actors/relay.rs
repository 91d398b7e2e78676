//! `RelayActor` - singleton actor that owns all signaling state.
//!
//! The actor owns the connection registry (user id -> live session) and the
//! call table (call id -> ringing/connecting call). Every signaling frame
//! from every connection flows through its mailbox, so routing decisions
//! are serialized and the state needs no locks.
//!
//! # Error asymmetry
//!
//! Only two failures are reported back to the sender:
//! - `call:start` to a user with no bound session -> `call:error` "user not available"
//! - `call:answer` for an unknown call id -> `call:error` "call not found"
//!
//! Everything else (declining or ending an unknown call, relaying into a
//! dead call, a frame from a non-participant) is dropped silently. Clients
//! hitting those races have nothing actionable to do.

use super::messages::{CallSnapshot, RelayMessage, RelayStats};
use crate::calls::{CallStatus, CallTable};
use crate::errors::RelayError;
use crate::observability::metrics;
use crate::protocol::{
    CallKind, InboundFrame, OutboundFrame, RelayKind, MSG_CALL_NOT_FOUND, MSG_USER_NOT_AVAILABLE,
};
use crate::registry::{ConnectionRegistry, SessionHandle};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Channel buffer size for the relay mailbox.
const RELAY_CHANNEL_BUFFER: usize = 1024;

/// Handle to the relay actor.
#[derive(Clone)]
pub struct RelayActorHandle {
    sender: mpsc::Sender<RelayMessage>,
    cancel_token: CancellationToken,
}

impl RelayActorHandle {
    /// Bind an authenticated session to its user id.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Internal` if the actor is gone.
    pub async fn bind(&self, session: SessionHandle) -> Result<(), RelayError> {
        self.sender
            .send(RelayMessage::Bind { session })
            .await
            .map_err(|e| RelayError::Internal(format!("channel send failed: {e}")))
    }

    /// Submit one parsed frame from an authenticated session.
    ///
    /// `raw` is the original wire text, kept for verbatim forwarding.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Internal` if the actor is gone.
    pub async fn frame(
        &self,
        from: SessionHandle,
        frame: InboundFrame,
        raw: String,
    ) -> Result<(), RelayError> {
        self.sender
            .send(RelayMessage::Frame { from, frame, raw })
            .await
            .map_err(|e| RelayError::Internal(format!("channel send failed: {e}")))
    }

    /// Notify that a session's socket closed.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Internal` if the actor is gone.
    pub async fn disconnected(&self, user_id: String, session_id: Uuid) -> Result<(), RelayError> {
        self.sender
            .send(RelayMessage::Disconnected {
                user_id,
                session_id,
            })
            .await
            .map_err(|e| RelayError::Internal(format!("channel send failed: {e}")))
    }

    /// Snapshot one call's routing state.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Internal` if the actor is gone.
    pub async fn call_snapshot(&self, call_id: String) -> Result<Option<CallSnapshot>, RelayError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RelayMessage::GetCall {
                call_id,
                respond_to: tx,
            })
            .await
            .map_err(|e| RelayError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RelayError::Internal(format!("response receive failed: {e}")))
    }

    /// Current registry and call table sizes.
    ///
    /// Because the mailbox is FIFO, awaiting this also guarantees every
    /// previously submitted message has been processed.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Internal` if the actor is gone.
    pub async fn stats(&self) -> Result<RelayStats, RelayError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RelayMessage::GetStats { respond_to: tx })
            .await
            .map_err(|e| RelayError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RelayError::Internal(format!("response receive failed: {e}")))
    }

    /// Cancel the relay actor.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }
}

/// The relay actor implementation.
pub struct RelayActor {
    receiver: mpsc::Receiver<RelayMessage>,
    cancel_token: CancellationToken,
    registry: ConnectionRegistry,
    calls: CallTable,
}

impl RelayActor {
    /// Spawn the relay actor.
    ///
    /// Returns a handle and the task join handle.
    #[must_use]
    pub fn spawn(cancel_token: CancellationToken) -> (RelayActorHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(RELAY_CHANNEL_BUFFER);

        let actor = Self {
            receiver,
            cancel_token: cancel_token.clone(),
            registry: ConnectionRegistry::new(),
            calls: CallTable::new(),
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = RelayActorHandle {
            sender,
            cancel_token,
        };

        (handle, task_handle)
    }

    /// Run the actor message loop.
    #[instrument(skip_all, name = "relay.actor")]
    async fn run(mut self) {
        info!(target: "relay.actor", "RelayActor started");

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(target: "relay.actor", "RelayActor received cancellation signal");
                    break;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => self.handle_message(message),
                        None => {
                            info!(target: "relay.actor", "RelayActor channel closed, exiting");
                            break;
                        }
                    }
                }
            }
        }

        info!(
            target: "relay.actor",
            sessions = self.registry.len(),
            calls = self.calls.len(),
            "RelayActor stopped"
        );
    }

    /// Handle a single message.
    fn handle_message(&mut self, message: RelayMessage) {
        match message {
            RelayMessage::Bind { session } => self.handle_bind(session),

            RelayMessage::Frame { from, frame, raw } => match frame {
                InboundFrame::Auth { .. } => {
                    // Authentication happens on the connection task; an Auth
                    // frame never reaches the mailbox.
                    debug!(target: "relay.actor", "Ignoring auth frame in mailbox");
                }
                InboundFrame::CallStart {
                    call_id,
                    receiver_id,
                    kind,
                    caller,
                } => self.handle_call_start(&from, call_id, &receiver_id, kind, caller),
                InboundFrame::CallAnswer { call_id, accepted } => {
                    self.handle_call_answer(&from, &call_id, accepted);
                }
                InboundFrame::CallDecline { call_id } => self.handle_call_decline(&call_id),
                InboundFrame::CallEnd { call_id } => self.handle_call_end(&from, &call_id),
                InboundFrame::Relay { kind, call_id } => {
                    self.handle_relay(&from, kind, &call_id, raw);
                }
            },

            RelayMessage::Disconnected {
                user_id,
                session_id,
            } => self.handle_disconnected(&user_id, session_id),

            RelayMessage::GetCall {
                call_id,
                respond_to,
            } => {
                let snapshot = self.calls.get(&call_id).map(|call| CallSnapshot {
                    id: call.id.clone(),
                    caller_id: call.caller_id.clone(),
                    receiver_id: call.receiver_id.clone(),
                    kind: call.kind,
                    status: call.status,
                });
                let _ = respond_to.send(snapshot);
            }

            RelayMessage::GetStats { respond_to } => {
                let _ = respond_to.send(RelayStats {
                    sessions: self.registry.len(),
                    calls: self.calls.len(),
                });
            }
        }
    }

    fn handle_bind(&mut self, session: SessionHandle) {
        let user_id = session.user_id.clone();
        let session_id = session.session_id;
        self.registry.bind(session);

        info!(
            target: "relay.actor",
            user_id = %user_id,
            session_id = %session_id,
            "Session bound"
        );
        metrics::set_connected_sessions(self.registry.len());
    }

    #[instrument(skip_all, fields(call_id = %call_id, kind = kind.as_str()))]
    fn handle_call_start(
        &mut self,
        from: &SessionHandle,
        call_id: String,
        receiver_id: &str,
        kind: CallKind,
        caller: Value,
    ) {
        let Some(receiver) = self.registry.lookup(receiver_id) else {
            debug!(target: "relay.actor", "Call target has no bound session");
            self.reply(
                from,
                &OutboundFrame::CallError {
                    message: MSG_USER_NOT_AVAILABLE.to_string(),
                },
            );
            metrics::record_call_outcome(kind.as_str(), "unreachable");
            return;
        };
        let receiver = receiver.clone();

        if !self.calls.create(
            call_id.clone(),
            from.user_id.clone(),
            receiver_id.to_string(),
            kind,
        ) {
            // Client bug: reusing a live call id. Leave the existing call alone.
            warn!(target: "relay.actor", "Duplicate call id, frame ignored");
            return;
        }

        let incoming = OutboundFrame::CallIncoming {
            call_id: call_id.clone(),
            caller,
            kind,
        };
        let delivered = match incoming.to_text() {
            Ok(text) => receiver.send(text),
            Err(e) => {
                warn!(target: "relay.actor", error = %e, "Failed to serialize call:incoming");
                false
            }
        };

        if delivered {
            info!(
                target: "relay.actor",
                caller_id = %from.user_id,
                receiver_id = %receiver_id,
                "Call ringing"
            );
        } else {
            // Receiver's queue is gone; from the caller's view this is the
            // same as the user being offline.
            self.calls.remove(&call_id);
            self.reply(
                from,
                &OutboundFrame::CallError {
                    message: MSG_USER_NOT_AVAILABLE.to_string(),
                },
            );
            metrics::record_call_outcome(kind.as_str(), "unreachable");
        }
        metrics::set_active_calls(self.calls.len());
    }

    #[instrument(skip_all, fields(call_id = %call_id, accepted = accepted))]
    fn handle_call_answer(&mut self, from: &SessionHandle, call_id: &str, accepted: bool) {
        let Some(call) = self.calls.get(call_id) else {
            debug!(target: "relay.actor", "Answer for unknown call");
            self.reply(
                from,
                &OutboundFrame::CallError {
                    message: MSG_CALL_NOT_FOUND.to_string(),
                },
            );
            return;
        };
        let caller_id = call.caller_id.clone();
        let kind = call.kind;

        // A rejection is the same as an explicit decline: the caller gets
        // call:decline, not an echoed answer.
        if !accepted {
            self.handle_call_decline(call_id);
            return;
        }

        self.send_to_user(
            &caller_id,
            &OutboundFrame::CallAnswer {
                call_id: call_id.to_string(),
                accepted: true,
            },
        );

        if let Some(call) = self.calls.get_mut(call_id) {
            call.status = CallStatus::Connecting;
        }
        info!(target: "relay.actor", "Call accepted");
        metrics::record_call_outcome(kind.as_str(), "accepted");
        metrics::set_active_calls(self.calls.len());
    }

    #[instrument(skip_all, fields(call_id = %call_id))]
    fn handle_call_decline(&mut self, call_id: &str) {
        // Unknown call id is dropped silently.
        let Some(call) = self.calls.remove(call_id) else {
            debug!(target: "relay.actor", "Decline for unknown call");
            return;
        };

        self.send_to_user(
            &call.caller_id,
            &OutboundFrame::CallDecline {
                call_id: call_id.to_string(),
            },
        );

        info!(target: "relay.actor", "Call declined");
        metrics::record_call_outcome(call.kind.as_str(), "declined");
        metrics::set_active_calls(self.calls.len());
    }

    #[instrument(skip_all, fields(call_id = %call_id))]
    fn handle_call_end(&mut self, from: &SessionHandle, call_id: &str) {
        // Unknown call id (including a second call:end) is dropped silently.
        let Some(call) = self.calls.get(call_id) else {
            debug!(target: "relay.actor", "End for unknown call");
            return;
        };

        // Same guard as relay frames: only a participant can end the call.
        let Some(peer) = call.peer_of(&from.user_id) else {
            warn!(
                target: "relay.actor",
                user_id = %from.user_id,
                "Call end from non-participant ignored"
            );
            return;
        };
        let peer = peer.to_string();

        let Some(call) = self.calls.remove(call_id) else {
            return;
        };

        self.send_to_user(
            &peer,
            &OutboundFrame::CallEnd {
                call_id: call_id.to_string(),
            },
        );

        info!(target: "relay.actor", "Call ended");
        metrics::record_call_outcome(call.kind.as_str(), "ended");
        metrics::set_active_calls(self.calls.len());
    }

    #[instrument(skip_all, fields(call_id = %call_id, kind = kind.as_str()))]
    fn handle_relay(&mut self, from: &SessionHandle, kind: RelayKind, call_id: &str, raw: String) {
        // Frames for dead calls and frames from non-participants are
        // dropped silently.
        let Some(call) = self.calls.get(call_id) else {
            debug!(target: "relay.actor", "Negotiation frame for unknown call");
            return;
        };
        let Some(peer) = call.peer_of(&from.user_id) else {
            debug!(target: "relay.actor", "Negotiation frame from non-participant");
            return;
        };

        // The original text goes through untouched.
        if let Some(session) = self.registry.lookup(peer) {
            let _ = session.send(raw);
            metrics::record_frame_forwarded(kind.as_str());
        } else {
            debug!(target: "relay.actor", "Peer has no bound session, frame dropped");
        }
    }

    #[instrument(skip_all, fields(user_id = %user_id, session_id = %session_id))]
    fn handle_disconnected(&mut self, user_id: &str, session_id: Uuid) {
        // A late close from a displaced socket must not touch the
        // successor's binding or its calls.
        if !self.registry.unbind_session(user_id, session_id) {
            debug!(target: "relay.actor", "Stale disconnect ignored");
            return;
        }
        info!(target: "relay.actor", "Session unbound");

        for call in self.calls.remove_involving(user_id) {
            if let Some(peer) = call.peer_of(user_id) {
                self.send_to_user(
                    peer,
                    &OutboundFrame::CallEnd {
                        call_id: call.id.clone(),
                    },
                );
            }
            info!(
                target: "relay.actor",
                call_id = %call.id,
                status = call.status.as_str(),
                "Call reaped after disconnect"
            );
            metrics::record_call_outcome(call.kind.as_str(), "reaped");
        }

        metrics::set_connected_sessions(self.registry.len());
        metrics::set_active_calls(self.calls.len());
    }

    /// Serialize a frame and queue it for a session, logging on failure.
    fn reply(&self, to: &SessionHandle, frame: &OutboundFrame) {
        match frame.to_text() {
            Ok(text) => {
                let _ = to.send(text);
            }
            Err(e) => {
                warn!(target: "relay.actor", error = %e, "Failed to serialize outbound frame");
            }
        }
    }

    /// Serialize a frame and queue it for a user's bound session, if any.
    fn send_to_user(&self, user_id: &str, frame: &OutboundFrame) {
        if let Some(session) = self.registry.lookup(user_id) {
            self.reply(session, frame);
        } else {
            debug!(
                target: "relay.actor",
                user_id = %user_id,
                "No bound session for outbound frame"
            );
        }
    }
}
