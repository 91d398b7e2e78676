//! Test token builders.
//!
//! Mints HS256 tokens signed with [`TEST_JWT_SECRET`], the secret the
//! [`crate::server_harness::TestRelayServer`] configures its verifier with.

use chrono::Utc;
use common::jwt::UserClaims;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

/// Shared signing secret for test servers and test tokens (>= 32 bytes).
pub const TEST_JWT_SECRET: &str = "relay-test-secret-0123456789-0123456789";

/// Mint a valid token for `sub`, expiring in one hour.
pub fn user_token(sub: &str) -> String {
    let now = Utc::now().timestamp();
    token_with_claims(sub, now + 3600, now - 10)
}

/// Mint a token that expired well outside any verification leeway.
pub fn expired_token(sub: &str) -> String {
    let now = Utc::now().timestamp();
    token_with_claims(sub, now - 600, now - 1200)
}

/// Mint a token with explicit `exp` and `iat` claims.
pub fn token_with_claims(sub: &str, exp: i64, iat: i64) -> String {
    let claims = UserClaims {
        sub: sub.to_string(),
        exp,
        iat,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("test token should encode")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_token_has_three_segments() {
        let token = user_token("alice");
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_expired_token_differs_from_valid() {
        assert_ne!(user_token("alice"), expired_token("alice"));
    }
}
