use thiserror::Error;

use crate::store::StoreError;

/// Infrastructure faults from an authenticator backend.
///
/// Wrong passwords are not errors: they are [`AuthnDecision::Rejected`](super::AuthnDecision).
#[derive(Debug, Error)]
pub enum AuthnError {
    #[error("{backend}: failed to connect: {source}")]
    Connection {
        backend: String,
        #[source]
        source: StoreError,
    },

    #[error("{backend}: backend error: {source}")]
    Backend {
        backend: String,
        #[source]
        source: StoreError,
    },

    /// The stored hash could not be parsed, so the password cannot be checked.
    #[error("Stored password hash for '{principal}' is invalid: {reason}")]
    InvalidStoredHash { principal: String, reason: String },

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
