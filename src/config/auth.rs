use serde::{Deserialize, Serialize};

use super::{ConfigError, StoreConfig};

/// Authentication configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthnConfig {
    /// What to do when a backend has no stored secret for the principal.
    #[serde(default)]
    pub missing_secret: MissingSecretPolicy,

    /// Authenticator backends, tried in the order listed.
    #[serde(default)]
    pub backends: Vec<StoreConfig>,
}

impl AuthnConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, backend) in self.backends.iter().enumerate() {
            backend
                .validate()
                .map_err(|e| e.at(&format!("authn.backends[{i}]")))?;
        }

        if self.missing_secret == MissingSecretPolicy::Allow {
            tracing::warn!(
                "authn.missing_secret = \"allow\": principals without a stored secret \
                 authenticate with any password"
            );
        }

        Ok(())
    }
}

/// Outcome for a principal that has no stored password hash.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingSecretPolicy {
    /// Reject the credentials.
    #[default]
    Deny,

    /// Report no match so the next backend can decide.
    Defer,

    /// Accept any password. Only for legacy deployments that rely on it.
    Allow,
}
