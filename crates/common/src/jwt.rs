//! Bearer token utilities shared across the relay.
//!
//! The relay authenticates every WebSocket session with a signed bearer
//! token. This module holds the pieces of that validation that are not tied
//! to a signing algorithm:
//! - Size limit enforced BEFORE parsing (denial-of-service prevention)
//! - The user claims structure
//! - `iat` (issued-at) validation with clock skew tolerance
//!
//! # Security
//!
//! - Tokens are size-checked before any base64 or signature work
//! - Error messages are intentionally generic to prevent information leakage
//! - The `sub` field in [`UserClaims`] is redacted in Debug output

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Maximum allowed bearer token size in bytes (8KB).
///
/// Typical tokens are a few hundred bytes; anything near this limit is
/// abuse. Oversized tokens are rejected before base64 decoding or signature
/// verification so a hostile client cannot burn CPU or memory on them.
pub const MAX_TOKEN_SIZE_BYTES: usize = 8192;

/// Default clock skew tolerance for `iat` validation.
///
/// Tokens with an issued-at timestamp more than this far in the future are
/// rejected. Accounts for clock drift between the token issuer and the relay.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Errors from the validation helpers in this module.
///
/// All variants render the same generic message; detail is logged at debug
/// level server-side only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    /// Token size exceeds [`MAX_TOKEN_SIZE_BYTES`].
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token `iat` claim is too far in the future.
    #[error("The access token is invalid or expired")]
    IatTooFarInFuture,
}

/// Claims carried by a user bearer token.
///
/// - `sub`: the user identifier the relay binds the session to
/// - `exp`: expiration timestamp (Unix epoch seconds)
/// - `iat`: issued-at timestamp (Unix epoch seconds)
///
/// `sub` is redacted in Debug output so user identifiers never land in logs
/// via `{:?}`.
#[derive(Clone, Serialize, Deserialize)]
pub struct UserClaims {
    /// Subject (user identifier) - redacted in Debug output.
    pub sub: String,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Issued-at timestamp (Unix epoch seconds).
    pub iat: i64,
}

impl fmt::Debug for UserClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserClaims")
            .field("sub", &"[REDACTED]")
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .finish()
    }
}

/// Check a token's size before doing any parsing work.
///
/// # Errors
///
/// Returns `TokenValidationError::TokenTooLarge` if the token exceeds
/// [`MAX_TOKEN_SIZE_BYTES`].
pub fn check_token_size(token: &str) -> Result<(), TokenValidationError> {
    if token.len() > MAX_TOKEN_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_TOKEN_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(TokenValidationError::TokenTooLarge);
    }
    Ok(())
}

/// Validate the `iat` (issued-at) claim with clock skew tolerance.
///
/// Rejects tokens issued in the future beyond `clock_skew`, which would
/// indicate clock problems at the issuer or a manipulated token.
///
/// # Errors
///
/// Returns `TokenValidationError::IatTooFarInFuture` if `iat` is more than
/// `clock_skew` ahead of the current time.
pub fn validate_iat(iat: i64, clock_skew: Duration) -> Result<(), TokenValidationError> {
    let now = chrono::Utc::now().timestamp();
    validate_iat_at(iat, clock_skew, now)
}

/// Deterministic `iat` validation against an explicit `now` timestamp.
///
/// Prefer [`validate_iat`] in production code. This variant exists so that
/// boundary conditions can be unit-tested without wall-clock dependence.
fn validate_iat_at(iat: i64, clock_skew: Duration, now: i64) -> Result<(), TokenValidationError> {
    // Safe cast: realistic skew values are far below i64 range
    #[allow(clippy::cast_possible_wrap)]
    let clock_skew_secs = clock_skew.as_secs() as i64;
    let max_iat = now + clock_skew_secs;

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            "Token rejected: iat too far in the future"
        );
        return Err(TokenValidationError::IatTooFarInFuture);
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_check_token_size_accepts_normal_tokens() {
        let token = "a".repeat(400);
        assert!(check_token_size(&token).is_ok());
    }

    #[test]
    fn test_check_token_size_rejects_oversized_tokens() {
        let token = "a".repeat(MAX_TOKEN_SIZE_BYTES + 1);
        assert_eq!(
            check_token_size(&token),
            Err(TokenValidationError::TokenTooLarge)
        );
    }

    #[test]
    fn test_check_token_size_boundary() {
        let token = "a".repeat(MAX_TOKEN_SIZE_BYTES);
        assert!(check_token_size(&token).is_ok());
    }

    #[test]
    fn test_validate_iat_accepts_past_iat() {
        let now = 1_700_000_000;
        assert!(validate_iat_at(now - 60, DEFAULT_CLOCK_SKEW, now).is_ok());
    }

    #[test]
    fn test_validate_iat_accepts_within_skew() {
        let now = 1_700_000_000;
        assert!(validate_iat_at(now + 299, DEFAULT_CLOCK_SKEW, now).is_ok());
    }

    #[test]
    fn test_validate_iat_rejects_beyond_skew() {
        let now = 1_700_000_000;
        assert_eq!(
            validate_iat_at(now + 301, DEFAULT_CLOCK_SKEW, now),
            Err(TokenValidationError::IatTooFarInFuture)
        );
    }

    #[test]
    fn test_validate_iat_exact_boundary() {
        let now = 1_700_000_000;
        assert!(validate_iat_at(now + 300, DEFAULT_CLOCK_SKEW, now).is_ok());
    }

    #[test]
    fn test_user_claims_debug_redacts_sub() {
        let claims = UserClaims {
            sub: "user-alice".to_string(),
            exp: 1_700_000_600,
            iat: 1_700_000_000,
        };

        let debug = format!("{claims:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("user-alice"));
    }

    #[test]
    fn test_user_claims_roundtrip() {
        let json = r#"{"sub":"user-1","exp":1700000600,"iat":1700000000}"#;
        let claims: UserClaims = serde_json::from_str(json).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.exp, 1_700_000_600);
        assert_eq!(claims.iat, 1_700_000_000);
    }

    #[test]
    fn test_error_messages_are_generic() {
        assert_eq!(
            TokenValidationError::TokenTooLarge.to_string(),
            TokenValidationError::IatTooFarInFuture.to_string()
        );
    }
}
