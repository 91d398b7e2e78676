//! Relay error types.
//!
//! Internal details are logged server-side; clients only ever see the fixed
//! protocol messages from [`crate::protocol`] or the generic auth message.

use thiserror::Error;

/// Relay service error type.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Token verification failed.
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Internal error (channel failures, actor unavailable).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Bearer token verification errors.
///
/// Every variant maps to the same client-safe message so a hostile client
/// cannot distinguish signature failures from expiry or malformed tokens.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Token exceeded the size limit.
    #[error("Token too large")]
    TokenTooLarge,

    /// Token failed signature verification or decoding.
    #[error("Token verification failed: {0}")]
    Verification(String),

    /// Token `exp` claim is in the past.
    #[error("Token expired")]
    Expired,

    /// Token `iat` claim is too far in the future.
    #[error("Token issued in the future")]
    IatInFuture,

    /// Token `sub` claim is empty.
    #[error("Token has empty subject")]
    EmptySubject,
}

impl AuthError {
    /// Client-safe message with no internal details.
    #[must_use]
    pub fn client_message(&self) -> &'static str {
        "The access token is invalid or expired"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_client_message_is_uniform() {
        let variants = [
            AuthError::TokenTooLarge,
            AuthError::Verification("bad signature".to_string()),
            AuthError::Expired,
            AuthError::IatInFuture,
            AuthError::EmptySubject,
        ];

        for err in &variants {
            assert_eq!(err.client_message(), "The access token is invalid or expired");
        }
    }

    #[test]
    fn test_client_message_hides_internal_details() {
        let err = AuthError::Verification("InvalidSignature at segment 2".to_string());
        assert!(!err.client_message().contains("segment"));
    }

    #[test]
    fn test_auth_error_converts_to_relay_error() {
        let relay_err: RelayError = AuthError::Expired.into();
        assert!(matches!(relay_err, RelayError::Auth(AuthError::Expired)));
    }
}
