use std::sync::Arc;

use super::{AuthnDecision, AuthnError, Authenticator, Password, StoredCredentialAuthenticator};
use crate::{
    config::{AuthnConfig, ConfigError, StoreConfig},
    store::MemoryStore,
};

/// Ordered list of authenticator backends.
///
/// The first backend that authenticates, rejects, or fails decides;
/// [`AuthnDecision::NoMatch`] defers to the next. If every backend defers the
/// chain reports `NoMatch`, which callers must treat as a failed login.
#[derive(Clone, Default)]
pub struct AuthenticatorChain {
    backends: Vec<Arc<dyn Authenticator>>,
}

impl AuthenticatorChain {
    pub fn new(backends: Vec<Arc<dyn Authenticator>>) -> Self {
        Self { backends }
    }

    /// Build backends from config, in config order. Nothing is connected yet.
    pub fn from_config(config: &AuthnConfig) -> Result<Self, ConfigError> {
        let mut chain = Self::default();
        for backend in &config.backends {
            let backend: Arc<dyn Authenticator> = match backend {
                #[cfg(feature = "redis")]
                StoreConfig::Redis(c) => Arc::new(StoredCredentialAuthenticator::new(
                    crate::store::RedisStore::new(c.clone()),
                    config.missing_secret,
                )),
                #[cfg(not(feature = "redis"))]
                StoreConfig::Redis(_) => {
                    return Err(ConfigError::Validation(
                        "authn backend type 'redis' requires the 'redis' feature".into(),
                    ));
                }
                StoreConfig::Memory(c) => Arc::new(StoredCredentialAuthenticator::new(
                    MemoryStore::from_config(c),
                    config.missing_secret,
                )),
            };
            chain.push(backend);
        }
        Ok(chain)
    }

    pub fn push(&mut self, backend: Arc<dyn Authenticator>) {
        self.backends.push(backend);
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Connect every backend in order. On the first failure every backend
    /// is stopped, releasing whatever the earlier ones acquired.
    pub async fn connect(&self) -> Result<(), AuthnError> {
        for backend in &self.backends {
            if let Err(e) = backend.connect().await {
                tracing::error!(backend = backend.name(), error = %e, "Authenticator failed to connect");
                self.stop();
                return Err(e);
            }
            tracing::debug!(backend = backend.name(), "Authenticator connected");
        }
        Ok(())
    }

    pub async fn authenticate(
        &self,
        principal: &str,
        password: &Password,
    ) -> Result<AuthnDecision, AuthnError> {
        for backend in &self.backends {
            match backend.authenticate(principal, password).await {
                Ok(AuthnDecision::NoMatch) => {
                    tracing::debug!(backend = backend.name(), principal, "No match, trying next authenticator");
                }
                Ok(decision) => return Ok(decision),
                Err(e) => {
                    tracing::error!(backend = backend.name(), error = %e, "Authenticator failed");
                    return Err(e);
                }
            }
        }
        Ok(AuthnDecision::NoMatch)
    }

    pub fn stop(&self) {
        for backend in &self.backends {
            backend.stop();
        }
    }
}
