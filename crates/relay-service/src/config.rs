//! Relay service configuration.
//!
//! Configuration is loaded from environment variables. All sensitive
//! fields are redacted in Debug output.

use common::secret::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default bind address for the WebSocket and health endpoints.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default clock skew allowance for token `iat` validation, in seconds.
pub const DEFAULT_CLOCK_SKEW_SECONDS: u64 = 300;

/// Default maximum inbound frame size in bytes (64KB).
///
/// SDP offers with many candidates run a few KB; anything near this limit
/// is abuse.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 64 * 1024;

/// Minimum accepted signing secret length in bytes.
///
/// HS256 secrets shorter than the hash output weaken the MAC.
pub const MIN_JWT_SECRET_BYTES: usize = 32;

/// Relay service configuration.
///
/// Loaded from environment variables with sensible defaults.
/// Sensitive fields are redacted in Debug output.
#[derive(Clone)]
pub struct Config {
    /// Bind address for the WebSocket and health endpoints (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// HMAC secret for bearer token verification.
    /// Protected by `SecretString` to prevent accidental logging.
    pub jwt_secret: SecretString,

    /// Clock skew allowance for token `iat` validation, in seconds (default: 300).
    pub clock_skew_seconds: u64,

    /// Maximum inbound frame size in bytes (default: 65536).
    pub max_frame_bytes: usize,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("jwt_secret", &"[REDACTED]")
            .field("clock_skew_seconds", &self.clock_skew_seconds)
            .field("max_frame_bytes", &self.max_frame_bytes)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or a value
    /// fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or a value
    /// fails validation.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let jwt_secret = SecretString::from(
            vars.get("RELAY_JWT_SECRET")
                .ok_or_else(|| ConfigError::MissingEnvVar("RELAY_JWT_SECRET".to_string()))?
                .clone(),
        );

        if jwt_secret.expose_secret().len() < MIN_JWT_SECRET_BYTES {
            return Err(ConfigError::InvalidValue(format!(
                "RELAY_JWT_SECRET must be at least {MIN_JWT_SECRET_BYTES} bytes"
            )));
        }

        let bind_address = vars
            .get("RELAY_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let clock_skew_seconds = vars
            .get("RELAY_CLOCK_SKEW_SECONDS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CLOCK_SKEW_SECONDS);

        let max_frame_bytes = vars
            .get("RELAY_MAX_FRAME_BYTES")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_FRAME_BYTES);

        if max_frame_bytes == 0 {
            return Err(ConfigError::InvalidValue(
                "RELAY_MAX_FRAME_BYTES must be greater than zero".to_string(),
            ));
        }

        Ok(Config {
            bind_address,
            jwt_secret,
            clock_skew_seconds,
            max_frame_bytes,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([(
            "RELAY_JWT_SECRET".to_string(),
            "test-secret-0123456789-0123456789-0123456789".to_string(),
        )])
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.clock_skew_seconds, DEFAULT_CLOCK_SKEW_SECONDS);
        assert_eq!(config.max_frame_bytes, DEFAULT_MAX_FRAME_BYTES);
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let mut vars = base_vars();
        vars.insert("RELAY_BIND_ADDRESS".to_string(), "127.0.0.1:9999".to_string());
        vars.insert("RELAY_CLOCK_SKEW_SECONDS".to_string(), "30".to_string());
        vars.insert("RELAY_MAX_FRAME_BYTES".to_string(), "16384".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.bind_address, "127.0.0.1:9999");
        assert_eq!(config.clock_skew_seconds, 30);
        assert_eq!(config.max_frame_bytes, 16384);
    }

    #[test]
    fn test_from_vars_missing_jwt_secret() {
        let result = Config::from_vars(&HashMap::new());
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "RELAY_JWT_SECRET"));
    }

    #[test]
    fn test_from_vars_rejects_short_jwt_secret() {
        let vars = HashMap::from([("RELAY_JWT_SECRET".to_string(), "too-short".to_string())]);

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_from_vars_rejects_zero_frame_limit() {
        let mut vars = base_vars();
        vars.insert("RELAY_MAX_FRAME_BYTES".to_string(), "0".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_debug_redacts_jwt_secret() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("test-secret"));
    }
}
