use async_trait::async_trait;

use super::{Authorizer, AuthzError};
use crate::{
    acl::{
        AccessRequest, Explanation, ParseError, Resolution, RuleEntry, parse_candidates,
        resolve, resolve_with_trace,
    },
    store::RuleStore,
};

/// Authorizer that resolves requests against ACL rules fetched per principal.
///
/// Rules are fetched fresh for every request; nothing is cached. Fetched
/// rule strings are sorted before parsing, so when two rules grant the same
/// number of actions the lexicographically smaller rule wins, independent of
/// the store's set ordering.
pub struct AclAuthorizer<S> {
    store: S,
    name: String,
}

impl<S: RuleStore> AclAuthorizer<S> {
    pub fn new(store: S) -> Self {
        let name = format!("{} ACL", store.kind());
        Self { store, name }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn candidates(
        &self,
        principal: &str,
    ) -> Result<(Vec<RuleEntry>, Vec<ParseError>), AuthzError> {
        let mut raw = self
            .store
            .fetch_rules(principal)
            .await
            .map_err(|e| AuthzError::backend(&self.name, e))?;
        raw.sort_unstable();

        let (entries, skipped) = parse_candidates(&raw);
        if !skipped.is_empty() {
            tracing::warn!(
                backend = %self.name,
                principal,
                skipped = skipped.len(),
                "Ignored malformed ACL rules"
            );
        }
        Ok((entries, skipped))
    }
}

#[async_trait]
impl<S: RuleStore> Authorizer for AclAuthorizer<S> {
    async fn connect(&self) -> Result<(), AuthzError> {
        self.store
            .connect()
            .await
            .map_err(|e| AuthzError::connection(&self.name, e))
    }

    async fn authorize(&self, request: &AccessRequest) -> Result<Resolution, AuthzError> {
        let (entries, _) = self.candidates(&request.principal).await?;
        let resolution = resolve(&entries, request);

        tracing::debug!(
            backend = %self.name,
            request = %request,
            candidates = entries.len(),
            granted = resolution.is_granted(),
            "ACL resolution"
        );
        Ok(resolution)
    }

    async fn explain(&self, request: &AccessRequest) -> Result<Option<Explanation>, AuthzError> {
        let (entries, skipped) = self.candidates(&request.principal).await?;
        Ok(Some(resolve_with_trace(&entries, request, skipped)))
    }

    fn stop(&self) {
        self.store.stop();
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::{
        acl::ActionSet,
        store::{MemoryStore, Store, StoreError, StoreResult},
    };

    fn request(principal: &str, name: &str, actions: &[&str]) -> AccessRequest {
        AccessRequest::new(principal, "repository", name).with_actions(actions.iter().copied())
    }

    fn granted(actions: &[&str]) -> Resolution {
        Resolution::Granted(ActionSet::from_names(actions.iter().copied()))
    }

    #[tokio::test]
    async fn test_authorize_best_match() {
        let store = MemoryStore::new();
        store.add_rule("alice", "repository:cloud/*:pull");
        store.add_rule("alice", "repository:cloud/centos_6.5:pull,push");
        let authz = AclAuthorizer::new(store);

        let resolution = authz
            .authorize(&request("alice", "cloud/centos_6.5", &["pull", "push"]))
            .await
            .unwrap();
        assert_eq!(resolution, granted(&["pull", "push"]));
    }

    #[tokio::test]
    async fn test_rules_are_per_principal() {
        let store = MemoryStore::new();
        store.add_rule("alice", "repository:*:pull,push");
        let authz = AclAuthorizer::new(store);

        let resolution = authz
            .authorize(&request("bob", "centos", &["pull"]))
            .await
            .unwrap();
        assert_eq!(resolution, Resolution::NoMatch);
    }

    #[tokio::test]
    async fn test_malformed_rules_are_skipped() {
        let store = MemoryStore::new();
        store.add_rule("alice", "repository::pull");
        store.add_rule("alice", "garbage");
        store.add_rule("alice", "repository:centos:pull");
        let authz = AclAuthorizer::new(store);

        let resolution = authz
            .authorize(&request("alice", "centos", &["pull", "push"]))
            .await
            .unwrap();
        assert_eq!(resolution, granted(&["pull"]));

        let explanation = authz
            .explain(&request("alice", "centos", &["pull"]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(explanation.evaluations.len(), 1);
        assert_eq!(explanation.skipped.len(), 2);
    }

    #[tokio::test]
    async fn test_tie_break_is_lexicographic() {
        let store = MemoryStore::new();
        store.add_rule("alice", "repository:centos:push");
        store.add_rule("alice", "repository:cent*:pull");
        let authz = AclAuthorizer::new(store);

        // "repository:cent*:pull" sorts first ('*' < 'o')
        for _ in 0..5 {
            let resolution = authz
                .authorize(&request("alice", "centos", &["pull", "push"]))
                .await
                .unwrap();
            assert_eq!(resolution, granted(&["pull"]));
        }
    }

    #[tokio::test]
    async fn test_name() {
        let authz = AclAuthorizer::new(MemoryStore::new());
        assert_eq!(authz.name(), "memory ACL");
        let authz = authz.with_name("static");
        assert_eq!(authz.name(), "static");
    }

    struct FailingStore;

    #[async_trait]
    impl Store for FailingStore {
        async fn connect(&self) -> StoreResult<()> {
            Err(StoreError::Internal("unreachable".into()))
        }

        fn kind(&self) -> &'static str {
            "failing"
        }
    }

    #[async_trait]
    impl RuleStore for FailingStore {
        async fn fetch_rules(&self, _principal: &str) -> StoreResult<Vec<String>> {
            Err(StoreError::NotConnected)
        }
    }

    #[tokio::test]
    async fn test_store_errors_propagate() {
        let authz = AclAuthorizer::new(FailingStore);

        let err = authz.connect().await.unwrap_err();
        assert!(matches!(err, AuthzError::Connection { .. }));
        assert_eq!(err.backend_name(), "failing ACL");

        let err = authz
            .authorize(&request("alice", "centos", &["pull"]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuthzError::Backend {
                source: StoreError::NotConnected,
                ..
            }
        ));

        // Stop after a failed connect is fine
        authz.stop();
    }
}
