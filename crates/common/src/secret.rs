//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports from the [`secrecy`] crate. Use these for every sensitive
//! value the relay handles: the token-signing secret, bearer tokens held in
//! memory, and anything else that must never appear in log output.
//!
//! `SecretString` implements `Debug` with redaction, so a struct that
//! derives `Debug` and holds a secret field cannot leak it via `{:?}` or
//! tracing. Secrets are zeroized on drop.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct AuthConfig {
//!     issuer: String,
//!     signing_secret: SecretString,
//! }
//!
//! let cfg = AuthConfig {
//!     issuer: "relay".to_string(),
//!     signing_secret: SecretString::from("hunter2"),
//! };
//!
//! // Debug output redacts the secret; access requires expose_secret()
//! assert!(!format!("{cfg:?}").contains("hunter2"));
//! assert_eq!(cfg.signing_secret.expose_secret(), "hunter2");
//! ```

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
