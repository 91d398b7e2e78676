//! Actor model implementation.
//!
//! A single `RelayActor` owns the connection registry and the call table.
//! Connection tasks talk to it through a `RelayActorHandle`; there are no
//! locks around signaling state.

pub mod messages;
pub mod relay;

pub use messages::{CallSnapshot, RelayStats};
pub use relay::{RelayActor, RelayActorHandle};
