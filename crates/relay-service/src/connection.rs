//! WebSocket connection handling.
//!
//! Each accepted socket gets one read loop (this module) and one spawned
//! write task draining the session's outbound queue. The read loop enforces
//! the frame size limit, parses envelopes, performs authentication, and
//! feeds everything else to the relay actor. On any exit path the relay is
//! told the session disconnected so the reaper can run.

use crate::actors::RelayActorHandle;
use crate::auth::TokenVerifier;
use crate::observability::metrics;
use crate::protocol::{
    FrameError, InboundFrame, OutboundFrame, MSG_INVALID_FORMAT, MSG_NOT_AUTHENTICATED,
};
use crate::registry::SessionHandle;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Buffer size for each session's outbound frame queue.
const OUTBOUND_CHANNEL_BUFFER: usize = 64;

/// Shared state for the WebSocket endpoint.
#[derive(Clone)]
pub struct AppState {
    pub relay: RelayActorHandle,
    pub verifier: Arc<dyn TokenVerifier>,
    pub max_frame_bytes: usize,
}

/// `GET /ws` - upgrade to a signaling session.
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one WebSocket session to completion.
#[instrument(skip_all, fields(session_id = tracing::field::Empty))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let session_id = Uuid::new_v4();
    tracing::Span::current().record("session_id", tracing::field::display(session_id));

    info!(target: "relay.conn", session_id = %session_id, "WebSocket session opened");

    let (mut ws_sink, mut ws_stream) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<String>(OUTBOUND_CHANNEL_BUFFER);

    // Write task: drains the outbound queue into the socket. Exits when the
    // queue closes or the socket errors.
    let write_task = tokio::spawn(async move {
        while let Some(text) = out_rx.recv().await {
            if ws_sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // Identity bound by the most recent successful auth frame.
    let mut authenticated: Option<SessionHandle> = None;

    while let Some(message) = ws_stream.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(_)) => {
                debug!(target: "relay.conn", session_id = %session_id, "Binary frame rejected");
                metrics::record_frame_rejected("binary");
                send_frame(
                    &out_tx,
                    &OutboundFrame::Error {
                        message: MSG_INVALID_FORMAT.to_string(),
                    },
                )
                .await;
                continue;
            }
            // Ping/pong handled by the transport layer.
            Ok(Message::Ping(_) | Message::Pong(_)) => continue,
            Ok(Message::Close(_)) | Err(_) => break,
        };

        if text.len() > state.max_frame_bytes {
            warn!(
                target: "relay.conn",
                session_id = %session_id,
                frame_size = text.len(),
                max_size = state.max_frame_bytes,
                "Oversized frame rejected"
            );
            metrics::record_frame_rejected("oversized");
            send_frame(
                &out_tx,
                &OutboundFrame::Error {
                    message: MSG_INVALID_FORMAT.to_string(),
                },
            )
            .await;
            continue;
        }

        let frame = match InboundFrame::parse(&text) {
            Ok(frame) => frame,
            Err(e) => {
                debug!(target: "relay.conn", session_id = %session_id, error = %e, "Unparseable frame");
                metrics::record_frame_rejected(match e {
                    FrameError::Malformed(_) => "malformed",
                    FrameError::UnknownType(_) => "unknown_type",
                });
                send_frame(
                    &out_tx,
                    &OutboundFrame::Error {
                        message: MSG_INVALID_FORMAT.to_string(),
                    },
                )
                .await;
                continue;
            }
        };

        metrics::record_frame_received(frame.frame_type());

        match frame {
            InboundFrame::Auth { token } => {
                if handle_auth(&state, &out_tx, session_id, &token, &mut authenticated)
                    .await
                    .is_err()
                {
                    break;
                }
            }
            other => {
                let Some(session) = &authenticated else {
                    debug!(
                        target: "relay.conn",
                        session_id = %session_id,
                        frame = other.frame_type(),
                        "Frame before authentication rejected"
                    );
                    metrics::record_frame_rejected("unauthenticated");
                    send_frame(
                        &out_tx,
                        &OutboundFrame::Error {
                            message: MSG_NOT_AUTHENTICATED.to_string(),
                        },
                    )
                    .await;
                    continue;
                };

                if state.relay.frame(session.clone(), other, text).await.is_err() {
                    // Relay actor is gone; the session cannot make progress.
                    break;
                }
            }
        }
    }

    // Tell the relay so the disconnect reaper runs. The unbind is
    // session-guarded, so a late close from a displaced socket cannot evict
    // its successor.
    if let Some(session) = authenticated {
        if let Err(e) = state
            .relay
            .disconnected(session.user_id.clone(), session.session_id)
            .await
        {
            warn!(target: "relay.conn", session_id = %session_id, error = %e, "Disconnect notify failed");
        }
    }

    drop(out_tx);
    let _ = write_task.await;

    info!(target: "relay.conn", session_id = %session_id, "WebSocket session closed");
}

/// Verify a token and bind (or rebind) this socket's identity.
///
/// Returns `Err` only when the relay actor is unreachable and the session
/// should be torn down.
async fn handle_auth(
    state: &Arc<AppState>,
    out_tx: &mpsc::Sender<String>,
    session_id: Uuid,
    token: &str,
    authenticated: &mut Option<SessionHandle>,
) -> Result<(), crate::errors::RelayError> {
    match state.verifier.verify(token) {
        Ok(user_id) => {
            // Re-auth under a different identity releases the old one first.
            if let Some(previous) = authenticated.take() {
                if previous.user_id != user_id {
                    state
                        .relay
                        .disconnected(previous.user_id.clone(), previous.session_id)
                        .await?;
                }
            }

            let session = SessionHandle {
                session_id,
                user_id: user_id.clone(),
                outbound: out_tx.clone(),
            };

            state.relay.bind(session.clone()).await?;
            *authenticated = Some(session);

            info!(target: "relay.conn", session_id = %session_id, "Session authenticated");
            metrics::record_auth_attempt("success");
            send_frame(out_tx, &OutboundFrame::AuthSuccess { user_id }).await;
        }
        Err(e) => {
            debug!(target: "relay.conn", session_id = %session_id, error = %e, "Authentication failed");
            metrics::record_auth_attempt("error");
            send_frame(
                out_tx,
                &OutboundFrame::AuthError {
                    message: e.client_message().to_string(),
                },
            )
            .await;
        }
    }
    Ok(())
}

/// Serialize a frame onto this session's outbound queue.
async fn send_frame(out_tx: &mpsc::Sender<String>, frame: &OutboundFrame) {
    match frame.to_text() {
        Ok(text) => {
            if out_tx.send(text).await.is_err() {
                debug!(target: "relay.conn", "Outbound queue closed, frame dropped");
            }
        }
        Err(e) => {
            warn!(target: "relay.conn", error = %e, "Failed to serialize outbound frame");
        }
    }
}
