//! Authenticator backends.
//!
//! The credential-checking counterpart to [`crate::authz`]: each backend
//! answers `(principal, password)` with [`AuthnDecision::Authenticated`],
//! [`AuthnDecision::Rejected`], [`AuthnDecision::NoMatch`] (defer to the next
//! backend) or an [`AuthnError`].

mod chain;
mod credential;
mod error;
mod password;

use async_trait::async_trait;
use serde::Serialize;

pub use chain::AuthenticatorChain;
pub use credential::StoredCredentialAuthenticator;
pub use error::AuthnError;
pub use password::{Password, hash_password, verify_password};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthnDecision {
    Authenticated,
    Rejected,
    NoMatch,
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Set up backend resources. Idempotent.
    async fn connect(&self) -> Result<(), AuthnError>;

    async fn authenticate(
        &self,
        principal: &str,
        password: &Password,
    ) -> Result<AuthnDecision, AuthnError>;

    /// Release backend resources. Safe after a failed `connect`.
    fn stop(&self);

    /// Backend name for logs.
    fn name(&self) -> &str;
}
