use async_trait::async_trait;

use super::error::StoreResult;

/// Lifecycle shared by every store backend.
#[async_trait]
pub trait Store: Send + Sync {
    /// Set up backend resources. Calling it again once connected is a no-op.
    async fn connect(&self) -> StoreResult<()> {
        Ok(())
    }

    /// Release backend resources. Safe to call before `connect`, after a
    /// failed `connect`, and more than once.
    fn stop(&self) {}

    /// Short backend name for logs, e.g. `redis`.
    fn kind(&self) -> &'static str;
}

/// Source of candidate ACL rules.
#[async_trait]
pub trait RuleStore: Store {
    /// Raw rule strings stored for a principal.
    ///
    /// The backing store is set-valued, so no order is guaranteed. An unknown
    /// principal yields an empty list, not an error.
    async fn fetch_rules(&self, principal: &str) -> StoreResult<Vec<String>>;
}

/// Source of stored password hashes.
#[async_trait]
pub trait CredentialStore: Store {
    /// PHC-format password hash stored for a principal, if any.
    async fn fetch_secret(&self, principal: &str) -> StoreResult<Option<String>>;
}
