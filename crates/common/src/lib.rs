//! Shared utilities for the call-signaling relay.

#![warn(clippy::pedantic)]

/// Module for bearer token claims and validation helpers
pub mod jwt;

/// Module for secret types that prevent accidental logging
pub mod secret;
