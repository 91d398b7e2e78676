//! Bearer token verification for WebSocket sessions.
//!
//! Every session must authenticate with a signed bearer token before any
//! signaling frame is accepted. Verification is synchronous and CPU-only,
//! so it runs inline on the connection task.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Only HS256 is accepted
//! - Expiration and issued-at claims are validated with clock skew tolerance
//! - Generic error messages prevent information leakage

use crate::errors::AuthError;
use common::jwt::{check_token_size, validate_iat, UserClaims};
use common::secret::{ExposeSecret, SecretString};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::time::Duration;

/// Verifies a bearer token and yields the authenticated user id.
///
/// Trait seam so connection handling can be tested without minting real
/// signed tokens.
pub trait TokenVerifier: Send + Sync {
    /// Verify `token` and return the authenticated user id.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] for any validation failure. Callers send the
    /// generic [`AuthError::client_message`] to the client and log the
    /// variant server-side.
    fn verify(&self, token: &str) -> Result<String, AuthError>;
}

/// HS256 token verifier backed by a shared signing secret.
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    clock_skew: Duration,
}

impl JwtVerifier {
    /// Create a verifier from the shared signing secret.
    #[must_use]
    pub fn new(secret: &SecretString, clock_skew: Duration) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            clock_skew,
        }
    }
}

impl TokenVerifier for JwtVerifier {
    /// Verify an HS256 token.
    ///
    /// # Security Checks
    ///
    /// 1. Size check - reject tokens > 8KB before parsing
    /// 2. Verify HS256 signature
    /// 3. Validate exp claim (reject expired tokens)
    /// 4. Validate iat claim with clock skew tolerance
    /// 5. Reject empty subjects
    fn verify(&self, token: &str) -> Result<String, AuthError> {
        check_token_size(token).map_err(|e| {
            tracing::debug!(target: "relay.auth", error = ?e, "Token rejected before parsing");
            AuthError::TokenTooLarge
        })?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.required_spec_claims = ["exp", "sub"].iter().map(ToString::to_string).collect();

        let token_data =
            decode::<UserClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                tracing::debug!(target: "relay.auth", error = %e, "Token verification failed");
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
                    _ => AuthError::Verification(e.to_string()),
                }
            })?;

        let claims = token_data.claims;

        if let Err(e) = validate_iat(claims.iat, self.clock_skew) {
            tracing::debug!(target: "relay.auth", error = ?e, "Token iat validation failed");
            return Err(AuthError::IatInFuture);
        }

        if claims.sub.is_empty() {
            tracing::debug!(target: "relay.auth", "Token rejected: empty subject");
            return Err(AuthError::EmptySubject);
        }

        tracing::debug!(target: "relay.auth", "Token validated successfully");
        Ok(claims.sub)
    }
}
