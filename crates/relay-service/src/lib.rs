//! Call Signaling Relay library.
//!
//! A stateful WebSocket server that lets authenticated users place 1:1
//! audio/video calls at each other and exchange the opaque negotiation
//! payloads (offers, answers, ICE candidates) needed to bring the media
//! path up peer-to-peer. The relay never inspects negotiation payloads; it
//! routes them byte-for-byte.
//!
//! # Architecture
//!
//! A single [`actors::RelayActor`] owns all signaling state:
//!
//! ```text
//! RelayActor (singleton)
//! ├── ConnectionRegistry   user id -> live session
//! └── CallTable            call id -> ringing/connecting call
//! ```
//!
//! Each WebSocket gets a read loop and a write task (see [`connection`]);
//! authentication happens on the connection task, everything else flows
//! through the actor's mailbox.
//!
//! # Modules
//!
//! - [`actors`] - The relay actor and its mailbox types
//! - [`auth`] - Bearer token verification
//! - [`calls`] - Call table and call lifecycle state
//! - [`config`] - Service configuration from environment
//! - [`connection`] - WebSocket upgrade, read loop, write task
//! - [`errors`] - Service and authentication error types
//! - [`observability`] - Health endpoints and Prometheus metrics
//! - [`protocol`] - Wire envelopes and frame types
//! - [`registry`] - Connection registry and session handles

#![warn(clippy::pedantic)]

use axum::routing::get;
use axum::Router;
use std::sync::Arc;

pub mod actors;
pub mod auth;
pub mod calls;
pub mod config;
pub mod connection;
pub mod errors;
pub mod observability;
pub mod protocol;
pub mod registry;

pub use connection::AppState;

/// Build the application router: the `/ws` signaling endpoint.
///
/// Health and metrics routes are merged in by the binary so tests can mount
/// the signaling endpoint alone.
pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(connection::ws_handler))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
