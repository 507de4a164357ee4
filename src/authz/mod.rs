//! Authorizer backends.
//!
//! Each backend answers an [`AccessRequest`] with one of three outcomes:
//! - [`Resolution::Granted`]: the permitted subset of the requested actions
//! - [`Resolution::NoMatch`]: no opinion, defer to the next backend
//! - [`AuthzError`]: the backend itself failed (e.g. store unreachable)
//!
//! Backends are composed with [`AuthorizerChain`], built once at startup and
//! passed to whoever serves requests. There is no global registry.

mod acl;
mod chain;
mod error;

use async_trait::async_trait;

pub use acl::AclAuthorizer;
pub use chain::AuthorizerChain;
pub use error::AuthzError;

use crate::acl::{AccessRequest, Explanation, Resolution};

#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Set up backend resources. Idempotent.
    async fn connect(&self) -> Result<(), AuthzError>;

    /// Decide which of the requested actions are permitted.
    async fn authorize(&self, request: &AccessRequest) -> Result<Resolution, AuthzError>;

    /// Per-rule evaluation trace, for backends that evaluate rules.
    async fn explain(&self, _request: &AccessRequest) -> Result<Option<Explanation>, AuthzError> {
        Ok(None)
    }

    /// Release backend resources. Safe after a failed `connect`.
    fn stop(&self);

    /// Backend name for logs.
    fn name(&self) -> &str;
}
