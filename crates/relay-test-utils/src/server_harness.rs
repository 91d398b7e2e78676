//! Test server harness for E2E testing.
//!
//! Provides `TestRelayServer` for spawning real relay instances in tests.

use crate::token_builders::TEST_JWT_SECRET;
use common::secret::SecretString;
use relay_service::actors::{RelayActor, RelayActorHandle};
use relay_service::auth::JwtVerifier;
use relay_service::{app_router, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Test harness for spawning a relay server in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_call_flow() -> anyhow::Result<()> {
///     let server = TestRelayServer::spawn().await?;
///     let mut alice = TestWsClient::connect(&server.ws_url()).await?;
///     // ...
///     Ok(())
/// }
/// ```
pub struct TestRelayServer {
    addr: SocketAddr,
    relay: RelayActorHandle,
    cancel_token: CancellationToken,
    _handle: JoinHandle<()>,
}

impl TestRelayServer {
    /// Spawn a new relay instance on a random port.
    ///
    /// The verifier is configured with [`TEST_JWT_SECRET`], so tokens from
    /// [`crate::token_builders`] authenticate against it.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        let cancel_token = CancellationToken::new();
        let (relay, _relay_task) = RelayActor::spawn(cancel_token.child_token());

        let verifier = Arc::new(JwtVerifier::new(
            &SecretString::from(TEST_JWT_SECRET),
            Duration::from_secs(300),
        ));

        let state = Arc::new(AppState {
            relay: relay.clone(),
            verifier,
            max_frame_bytes: 64 * 1024,
        });

        let app = app_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {e}"))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {e}"))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {e}");
            }
        });

        Ok(Self {
            addr,
            relay,
            cancel_token,
            _handle: handle,
        })
    }

    /// WebSocket URL of the signaling endpoint.
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Handle to the relay actor, for state assertions.
    pub fn relay(&self) -> &RelayActorHandle {
        &self.relay
    }
}

impl Drop for TestRelayServer {
    fn drop(&mut self) {
        // Abort the HTTP server task and stop the actor for immediate cleanup
        self.cancel_token.cancel();
        self._handle.abort();
    }
}
