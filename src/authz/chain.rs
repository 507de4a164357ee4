use std::sync::Arc;

use super::{AclAuthorizer, Authorizer, AuthzError};
use crate::{
    acl::{AccessRequest, Explanation, Resolution},
    config::{ConfigError, StoreConfig},
    store::MemoryStore,
};

/// Ordered list of authorizer backends.
///
/// Backends are tried in order. The first backend that grants, or fails,
/// decides; [`Resolution::NoMatch`] defers to the next one. If every backend
/// defers, the chain reports `NoMatch` and the caller should deny.
///
/// A backend error is returned as-is rather than skipped: whether to fail
/// open or closed on an unreachable store is the caller's decision.
#[derive(Clone, Default)]
pub struct AuthorizerChain {
    backends: Vec<Arc<dyn Authorizer>>,
}

impl AuthorizerChain {
    pub fn new(backends: Vec<Arc<dyn Authorizer>>) -> Self {
        Self { backends }
    }

    /// Build backends from config, in config order. Nothing is connected yet.
    pub fn from_config(configs: &[StoreConfig]) -> Result<Self, ConfigError> {
        let mut chain = Self::default();
        for config in configs {
            let backend: Arc<dyn Authorizer> = match config {
                #[cfg(feature = "redis")]
                StoreConfig::Redis(c) => Arc::new(AclAuthorizer::new(
                    crate::store::RedisStore::new(c.clone()),
                )),
                #[cfg(not(feature = "redis"))]
                StoreConfig::Redis(_) => {
                    return Err(ConfigError::Validation(
                        "authz backend type 'redis' requires the 'redis' feature".into(),
                    ));
                }
                StoreConfig::Memory(c) => {
                    Arc::new(AclAuthorizer::new(MemoryStore::from_config(c)))
                }
            };
            chain.push(backend);
        }
        Ok(chain)
    }

    pub fn push(&mut self, backend: Arc<dyn Authorizer>) {
        self.backends.push(backend);
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Connect every backend in order. On the first failure every backend
    /// is stopped, releasing whatever the earlier ones acquired.
    pub async fn connect(&self) -> Result<(), AuthzError> {
        for backend in &self.backends {
            if let Err(e) = backend.connect().await {
                tracing::error!(backend = backend.name(), error = %e, "Authorizer failed to connect");
                self.stop();
                return Err(e);
            }
            tracing::debug!(backend = backend.name(), "Authorizer connected");
        }
        Ok(())
    }

    pub async fn authorize(&self, request: &AccessRequest) -> Result<Resolution, AuthzError> {
        for backend in &self.backends {
            match backend.authorize(request).await {
                Ok(Resolution::NoMatch) => {
                    tracing::debug!(backend = backend.name(), request = %request, "No match, trying next authorizer");
                }
                Ok(resolution) => {
                    tracing::debug!(backend = backend.name(), request = %request, "Authorizer granted");
                    return Ok(resolution);
                }
                Err(e) => {
                    tracing::error!(backend = backend.name(), error = %e, "Authorizer failed");
                    return Err(e);
                }
            }
        }
        Ok(Resolution::NoMatch)
    }

    /// Explanations in chain order from every backend that evaluates rules,
    /// up to and including the first one that grants. Backends after it are
    /// never consulted, matching [`AuthorizerChain::authorize`].
    pub async fn explain(
        &self,
        request: &AccessRequest,
    ) -> Result<Vec<(String, Explanation)>, AuthzError> {
        let mut explanations = Vec::new();
        for backend in &self.backends {
            if let Some(explanation) = backend.explain(request).await? {
                let decided = explanation.resolution.is_granted();
                explanations.push((backend.name().to_string(), explanation));
                if decided {
                    break;
                }
            }
        }
        Ok(explanations)
    }

    /// Stop every backend.
    pub fn stop(&self) {
        for backend in &self.backends {
            backend.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::{acl::ActionSet, config::MemoryStoreConfig, store::StoreError};

    /// Backend returning a fixed outcome and counting calls.
    struct Fixed {
        name: &'static str,
        outcome: fn() -> Result<Resolution, AuthzError>,
        reachable: bool,
        calls: AtomicUsize,
        stops: AtomicUsize,
    }

    impl Fixed {
        fn new(name: &'static str, outcome: fn() -> Result<Resolution, AuthzError>) -> Arc<Self> {
            Arc::new(Self {
                name,
                outcome,
                reachable: true,
                calls: AtomicUsize::new(0),
                stops: AtomicUsize::new(0),
            })
        }

        fn unreachable(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                outcome: no_match,
                reachable: false,
                calls: AtomicUsize::new(0),
                stops: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Authorizer for Fixed {
        async fn connect(&self) -> Result<(), AuthzError> {
            if self.reachable {
                Ok(())
            } else {
                Err(AuthzError::connection(self.name, StoreError::NotConnected))
            }
        }

        async fn explain(
            &self,
            request: &AccessRequest,
        ) -> Result<Option<Explanation>, AuthzError> {
            let resolution = self.authorize(request).await?;
            Ok(Some(Explanation {
                request: request.clone(),
                evaluations: Vec::new(),
                selected: None,
                skipped: Vec::new(),
                resolution,
            }))
        }

        async fn authorize(&self, _request: &AccessRequest) -> Result<Resolution, AuthzError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }

        fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> &str {
            self.name
        }
    }

    fn chain_of(backends: &[Arc<Fixed>]) -> AuthorizerChain {
        AuthorizerChain::new(
            backends
                .iter()
                .map(|b| b.clone() as Arc<dyn Authorizer>)
                .collect(),
        )
    }

    fn no_match() -> Result<Resolution, AuthzError> {
        Ok(Resolution::NoMatch)
    }

    fn pull() -> Result<Resolution, AuthzError> {
        Ok(Resolution::Granted(ActionSet::from_names(["pull"])))
    }

    fn failure() -> Result<Resolution, AuthzError> {
        Err(AuthzError::backend("broken", StoreError::NotConnected))
    }

    fn request() -> AccessRequest {
        AccessRequest::new("alice", "repository", "centos").with_actions(["pull"])
    }

    #[tokio::test]
    async fn test_first_definitive_answer_wins() {
        let first = Fixed::new("first", no_match);
        let second = Fixed::new("second", pull);
        let third = Fixed::new("third", failure);
        let chain = chain_of(&[first.clone(), second.clone(), third.clone()]);

        let resolution = chain.authorize(&request()).await.unwrap();
        assert!(resolution.is_granted());
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 1);
        assert_eq!(third.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_error_short_circuits() {
        let first = Fixed::new("first", failure);
        let second = Fixed::new("second", pull);
        let chain = chain_of(&[first.clone(), second.clone()]);

        let err = chain.authorize(&request()).await.unwrap_err();
        assert_eq!(err.backend_name(), "broken");
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_defer_is_no_match() {
        let chain = chain_of(&[
            Fixed::new("first", no_match),
            Fixed::new("second", no_match),
        ]);
        assert_eq!(
            chain.authorize(&request()).await.unwrap(),
            Resolution::NoMatch
        );
    }

    #[tokio::test]
    async fn test_empty_chain_is_no_match() {
        let chain = AuthorizerChain::default();
        assert!(chain.is_empty());
        assert_eq!(
            chain.authorize(&request()).await.unwrap(),
            Resolution::NoMatch
        );
    }

    #[tokio::test]
    async fn test_stop_reaches_every_backend() {
        let first = Fixed::new("first", no_match);
        let second = Fixed::new("second", no_match);
        let chain = chain_of(&[first.clone(), second.clone()]);
        chain.stop();
        assert_eq!(first.stops.load(Ordering::SeqCst), 1);
        assert_eq!(second.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_stops_every_backend() {
        let first = Fixed::new("first", no_match);
        let second = Fixed::unreachable("second");
        let third = Fixed::new("third", no_match);
        let chain = chain_of(&[first.clone(), second.clone(), third.clone()]);

        let err = chain.connect().await.unwrap_err();
        assert!(matches!(err, AuthzError::Connection { .. }));
        assert_eq!(err.backend_name(), "second");
        for backend in [&first, &second, &third] {
            assert_eq!(backend.stops.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn test_explain_stops_at_first_grant() {
        let first = Fixed::new("first", no_match);
        let second = Fixed::new("second", pull);
        let third = Fixed::new("third", pull);
        let chain = chain_of(&[first.clone(), second.clone(), third.clone()]);

        let explanations = chain.explain(&request()).await.unwrap();
        let names: Vec<_> = explanations.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert!(explanations[1].1.resolution.is_granted());
        assert_eq!(third.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_from_config_memory_backends() {
        let mut static_rules = MemoryStoreConfig::default();
        static_rules
            .rules
            .insert("alice".into(), vec!["repository:library/*:pull".into()]);
        let mut fallback = MemoryStoreConfig::default();
        fallback
            .rules
            .insert("alice".into(), vec!["repository:*:pull,push".into()]);

        let chain = AuthorizerChain::from_config(&[
            StoreConfig::Memory(static_rules),
            StoreConfig::Memory(fallback),
        ])
        .unwrap();
        assert_eq!(chain.names(), vec!["memory ACL", "memory ACL"]);
        chain.connect().await.unwrap();

        // First backend matches and decides, even though the second would grant more
        let req = AccessRequest::new("alice", "repository", "library/centos")
            .with_actions(["pull", "push"]);
        assert_eq!(
            chain.authorize(&req).await.unwrap(),
            Resolution::Granted(ActionSet::from_names(["pull"]))
        );

        // First backend has no match, second decides
        let req = AccessRequest::new("alice", "repository", "alice/app").with_actions(["push"]);
        assert_eq!(
            chain.authorize(&req).await.unwrap(),
            Resolution::Granted(ActionSet::from_names(["push"]))
        );

        let explanations = chain.explain(&req).await.unwrap();
        assert_eq!(explanations.len(), 2);
        assert_eq!(explanations[0].1.resolution, Resolution::NoMatch);
        assert!(explanations[1].1.resolution.is_granted());

        chain.stop();
    }
}
