use async_trait::async_trait;

use super::{AuthnDecision, AuthnError, Authenticator, Password, verify_password};
use crate::{config::MissingSecretPolicy, store::CredentialStore};

/// Authenticator checking passwords against hashes held in a credential store.
pub struct StoredCredentialAuthenticator<S> {
    store: S,
    missing_secret: MissingSecretPolicy,
    name: String,
}

impl<S: CredentialStore> StoredCredentialAuthenticator<S> {
    pub fn new(store: S, missing_secret: MissingSecretPolicy) -> Self {
        let name = store.kind().to_string();
        Self {
            store,
            missing_secret,
            name,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[async_trait]
impl<S: CredentialStore> Authenticator for StoredCredentialAuthenticator<S> {
    async fn connect(&self) -> Result<(), AuthnError> {
        self.store
            .connect()
            .await
            .map_err(|source| AuthnError::Connection {
                backend: self.name.clone(),
                source,
            })
    }

    async fn authenticate(
        &self,
        principal: &str,
        password: &Password,
    ) -> Result<AuthnDecision, AuthnError> {
        let stored = self
            .store
            .fetch_secret(principal)
            .await
            .map_err(|source| AuthnError::Backend {
                backend: self.name.clone(),
                source,
            })?;

        let Some(hash) = stored else {
            let decision = match self.missing_secret {
                MissingSecretPolicy::Deny => AuthnDecision::Rejected,
                MissingSecretPolicy::Defer => AuthnDecision::NoMatch,
                MissingSecretPolicy::Allow => {
                    tracing::warn!(
                        backend = %self.name,
                        principal,
                        "No stored secret; accepting by policy"
                    );
                    AuthnDecision::Authenticated
                }
            };
            tracing::debug!(backend = %self.name, principal, ?decision, "No stored secret");
            return Ok(decision);
        };

        // Argon2 is deliberately slow; keep it off the async workers
        let owned_principal = principal.to_string();
        let password = password.clone();
        let matched = tokio::task::spawn_blocking(move || {
            verify_password(&owned_principal, &hash, &password)
        })
        .await
        .map_err(|e| AuthnError::Internal(format!("password verification task failed: {e}")))??;

        let decision = if matched {
            AuthnDecision::Authenticated
        } else {
            AuthnDecision::Rejected
        };
        tracing::debug!(backend = %self.name, principal, ?decision, "Password checked");
        Ok(decision)
    }

    fn stop(&self) {
        self.store.stop();
    }

    fn name(&self) -> &str {
        &self.name
    }
}
