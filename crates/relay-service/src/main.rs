//! Call Signaling Relay
//!
//! Stateful WebSocket server for 1:1 call negotiation.
//!
//! # Endpoints
//!
//! One HTTP listener serves everything:
//! - `GET /ws` - WebSocket signaling endpoint
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus metrics
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment
//! 2. Initialize Prometheus metrics recorder
//! 3. Spawn the relay actor
//! 4. Bind the listener and serve
//! 5. Wait for shutdown signal, then cancel the actor and drain

#![warn(clippy::pedantic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use relay_service::actors::RelayActor;
use relay_service::auth::JwtVerifier;
use relay_service::config::Config;
use relay_service::observability::health::{health_router, HealthState};
use relay_service::observability::metrics::init_metrics_recorder;
use relay_service::{app_router, AppState};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Call Signaling Relay");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        clock_skew_seconds = config.clock_skew_seconds,
        max_frame_bytes = config.max_frame_bytes,
        "Configuration loaded successfully"
    );

    // Initialize Prometheus metrics recorder before any metrics are recorded
    let prometheus_handle = init_metrics_recorder().map_err(|e| {
        error!(error = %e, "Failed to install Prometheus metrics recorder");
        e
    })?;
    info!("Prometheus metrics recorder initialized");

    let health_state = Arc::new(HealthState::new());

    // Spawn the relay actor
    let shutdown_token = CancellationToken::new();
    let (relay_handle, relay_task) = RelayActor::spawn(shutdown_token.child_token());
    info!("Relay actor started");

    let verifier = Arc::new(JwtVerifier::new(
        &config.jwt_secret,
        Duration::from_secs(config.clock_skew_seconds),
    ));

    let app_state = Arc::new(AppState {
        relay: relay_handle.clone(),
        verifier,
        max_frame_bytes: config.max_frame_bytes,
    });

    // Assemble the router: signaling + health + metrics
    let metrics_router = Router::new().route(
        "/metrics",
        axum::routing::get(move || {
            let handle = prometheus_handle.clone();
            async move { handle.render() }
        }),
    );

    let app = app_router(app_state)
        .merge(health_router(Arc::clone(&health_state)))
        .merge(metrics_router);

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!(error = %e, addr = %config.bind_address, "Invalid bind address");
        format!("Invalid bind address: {e}")
    })?;

    // Bind BEFORE spawning to fail fast on bind errors
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!(error = %e, addr = %addr, "Failed to bind listener");
        format!("Failed to bind listener to {addr}: {e}")
    })?;
    info!(addr = %addr, "Listener bound successfully");

    let server_shutdown_token = shutdown_token.child_token();
    let server_task = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            server_shutdown_token.cancelled().await;
            info!("Server shutting down");
        });
        if let Err(e) = server.await {
            error!(error = %e, "Server failed");
        }
    });

    health_state.set_ready();
    info!(addr = %addr, "Call Signaling Relay running - press Ctrl+C to shutdown");

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutdown signal received, initiating graceful shutdown...");

    // Mark as not ready immediately so k8s stops sending traffic
    health_state.set_not_ready();

    shutdown_token.cancel();

    // Give open sockets and the actor time to wind down
    tokio::time::sleep(Duration::from_secs(2)).await;

    if let Err(e) = relay_task.await {
        warn!(error = %e, "Relay actor shutdown error");
    }
    server_task.abort();

    info!("Call Signaling Relay shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed. This is acceptable because
/// without signal handlers, we cannot gracefully shut down the service.
async fn shutdown_signal() {
    let ctrl_c = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
