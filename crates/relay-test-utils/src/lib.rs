//! # Relay Test Utilities
//!
//! Shared test utilities for the call signaling relay.
//!
//! This crate provides:
//! - Server test harness (`TestRelayServer` for E2E tests)
//! - Test token builders (HS256 tokens signed with the shared test secret)
//! - A small WebSocket test client (`TestWsClient`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relay_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let server = TestRelayServer::spawn().await?;
//!
//!     let mut alice = TestWsClient::connect(&server.ws_url()).await?;
//!     let reply = alice.authenticate(&user_token("alice")).await?;
//!     assert_eq!(reply["type"], "auth:success");
//!     Ok(())
//! }
//! ```

pub mod server_harness;
pub mod token_builders;
pub mod ws_client;

// Re-export commonly used items
pub use server_harness::TestRelayServer;
pub use token_builders::{expired_token, token_with_claims, user_token, TEST_JWT_SECRET};
pub use ws_client::TestWsClient;
