//! Configuration for aclgate.
//!
//! Configured via a TOML file, with support for environment variable
//! interpolation using `${VAR_NAME}` syntax.
//!
//! # Example
//!
//! ```toml
//! [observability.logging]
//! level = "info"
//!
//! [[authz]]
//! type = "redis"
//! url = "redis://:${REDIS_PASSWORD}@localhost:6379"
//! key_prefix = "registry:"
//!
//! [authn]
//! missing_secret = "deny"
//!
//! [[authn.backends]]
//! type = "redis"
//! url = "redis://:${REDIS_PASSWORD}@localhost:6379"
//! key_prefix = "registry:"
//! ```

mod auth;
mod observability;
mod store;

use std::path::Path;

pub use auth::*;
pub use observability::*;
use serde::{Deserialize, Serialize};
pub use store::*;

/// Root configuration.
///
/// Every section is optional. With no backends configured, every request
/// resolves to no-match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AclGateConfig {
    /// Logging configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Authorizer backends, tried in the order listed.
    #[serde(default)]
    pub authz: Vec<StoreConfig>,

    /// Authentication configuration.
    #[serde(default)]
    pub authn: AuthnConfig,
}

impl AclGateConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing variables cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;

        // Catch feature-gated backends before typed deserialization so the
        // error names the missing feature instead of an unknown variant
        let raw: toml::Value = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        check_disabled_features(&raw)?;

        let config: AclGateConfig = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration for consistency and completeness.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, backend) in self.authz.iter().enumerate() {
            backend
                .validate()
                .map_err(|e| e.at(&format!("authz[{i}]")))?;
        }
        self.authn.validate()?;

        if self.authz.is_empty() && self.authn.backends.is_empty() {
            tracing::warn!("No authz or authn backends configured; every request will be denied");
        }

        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

impl ConfigError {
    /// Prefix a validation message with where in the file it came from.
    pub(crate) fn at(self, location: &str) -> Self {
        match self {
            ConfigError::Validation(reason) => {
                ConfigError::Validation(format!("{location}: {reason}"))
            }
            other => other,
        }
    }
}

/// Check for backends that need a cargo feature not compiled into this build.
fn check_disabled_features(raw: &toml::Value) -> Result<(), ConfigError> {
    let mut issues: Vec<String> = Vec::new();

    let authz = raw.get("authz").and_then(|v| v.as_array());
    let authn = raw
        .get("authn")
        .and_then(|v| v.get("backends"))
        .and_then(|v| v.as_array());

    for (section, backends) in [("authz", authz), ("authn.backends", authn)] {
        for (i, backend) in backends.into_iter().flatten().enumerate() {
            if let Some(type_val) = backend.get("type").and_then(|v| v.as_str()) {
                check_store_feature(&format!("{section}[{i}]"), type_val, &mut issues);
            }
        }
    }

    if issues.is_empty() {
        return Ok(());
    }

    Err(ConfigError::Validation(format!(
        "Configuration requires features not compiled in this build:\n  - {}\n\n\
         Rebuild with: cargo build --features redis",
        issues.join("\n  - ")
    )))
}

fn check_store_feature(_location: &str, type_val: &str, _issues: &mut Vec<String>) {
    match type_val {
        #[cfg(not(feature = "redis"))]
        "redis" => _issues.push(format!(
            "{_location} uses type 'redis' which requires the 'redis' feature"
        )),
        _ => {}
    }
}

/// Expand environment variables in the format `${VAR_NAME}`.
/// Variables after a `#` on the same line are left alone.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}").expect("static regex is valid");
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');
        let mut last_end = 0;

        for cap in re.captures_iter(line) {
            let Some(whole) = cap.get(0) else { continue };
            if comment_pos.is_some_and(|pos| whole.start() >= pos) {
                continue;
            }

            result.push_str(&line[last_end..whole.start()]);
            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            result.push_str(&value);
            last_end = whole.end();
        }

        result.push_str(&line[last_end..]);
        result.push('\n');
    }

    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_empty_config() {
        let config = AclGateConfig::from_str("").unwrap();
        assert!(config.authz.is_empty());
        assert!(config.authn.backends.is_empty());
        assert_eq!(config.authn.missing_secret, MissingSecretPolicy::Deny);
    }

    #[test]
    fn test_memory_backends() {
        let config = AclGateConfig::from_str(
            r#"
            [[authz]]
            type = "memory"
            [authz.rules]
            alice = ["repository:library/*:pull", "repository:alice/*:pull,push"]

            [[authz]]
            type = "memory"
            [authz.rules]
            "*" = ["repository:public/*:pull"]

            [authn]
            missing_secret = "defer"

            [[authn.backends]]
            type = "memory"
            [authn.backends.users]
            alice = "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$aGFzaA"
        "#,
        )
        .unwrap();

        assert_eq!(config.authz.len(), 2);
        let StoreConfig::Memory(first) = &config.authz[0] else {
            panic!("expected memory backend");
        };
        assert_eq!(first.rules["alice"].len(), 2);
        assert_eq!(config.authn.missing_secret, MissingSecretPolicy::Defer);
        assert_eq!(config.authn.backends.len(), 1);
    }

    #[cfg(feature = "redis")]
    #[test]
    fn test_redis_backend_defaults() {
        let config = AclGateConfig::from_str(
            r#"
            [[authz]]
            type = "redis"
            url = "redis://localhost:6379"
        "#,
        )
        .unwrap();

        let StoreConfig::Redis(redis) = &config.authz[0] else {
            panic!("expected redis backend");
        };
        assert_eq!(redis.key_prefix, "");
        assert_eq!(redis.pool_size, 10);
        assert_eq!(redis.connect_timeout_secs, 5);
        assert_eq!(redis.checkout_timeout_secs, 5);
    }

    #[cfg(not(feature = "redis"))]
    #[test]
    fn test_redis_backend_requires_feature() {
        let err = AclGateConfig::from_str(
            r#"
            [[authz]]
            type = "redis"
            url = "redis://localhost:6379"
        "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("'redis' feature"));
    }

    #[test]
    fn test_malformed_static_rule_is_config_error() {
        let err = AclGateConfig::from_str(
            r#"
            [[authz]]
            type = "memory"
            [authz.rules]
            alice = ["repository::pull"]
        "#,
        )
        .unwrap_err();
        let ConfigError::Validation(reason) = &err else {
            panic!("expected validation error, got {err:?}");
        };
        assert!(reason.starts_with("authz[0]: rule for 'alice': "));
        assert!(reason.contains("repository::pull"));
        assert_eq!(
            err.to_string()
                .matches("Configuration validation error")
                .count(),
            1
        );
    }

    #[test]
    fn test_authn_validation_error_names_backend_once() {
        let err = AclGateConfig::from_str(
            r#"
            [[authn.backends]]
            type = "memory"
            [authn.backends.rules]
            bob = ["repository:centos:pull,,push"]
        "#,
        )
        .unwrap_err();
        let ConfigError::Validation(reason) = &err else {
            panic!("expected validation error, got {err:?}");
        };
        assert!(reason.starts_with("authn.backends[0]: rule for 'bob': "));
        assert!(!reason.contains("Configuration validation error"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = AclGateConfig::from_str(
            r#"
            [[authz]]
            type = "memory"
            colour = "blue"
        "#,
        );
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_unknown_backend_type_rejected() {
        let result = AclGateConfig::from_str(
            r#"
            [[authz]]
            type = "ldap"
        "#,
        );
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_env_var_expansion() {
        temp_env::with_var("ACLGATE_TEST_URL", Some("redis://secret@host"), || {
            let result = expand_env_vars("url = \"${ACLGATE_TEST_URL}\"").unwrap();
            assert_eq!(result, "url = \"redis://secret@host\"");
        });
    }

    #[test]
    fn test_env_var_in_comment_ignored() {
        temp_env::with_var_unset("ACLGATE_TEST_UNSET", || {
            let input = "level = \"info\" # ${ACLGATE_TEST_UNSET}\n";
            let result = expand_env_vars(input).unwrap();
            assert_eq!(result, input);
        });
    }

    #[test]
    fn test_missing_env_var() {
        temp_env::with_var_unset("ACLGATE_TEST_MISSING", || {
            let err = expand_env_vars("url = \"${ACLGATE_TEST_MISSING}\"").unwrap_err();
            assert!(matches!(err, ConfigError::EnvVarNotFound(name) if name == "ACLGATE_TEST_MISSING"));
        });
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [observability.logging]
            level = "debug"
            format = "json"
        "#
        )
        .unwrap();

        let config = AclGateConfig::from_file(file.path()).unwrap();
        assert!(matches!(config.observability.logging.level, LogLevel::Debug));
        assert_eq!(config.observability.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_from_missing_file() {
        let err = AclGateConfig::from_file("/nonexistent/aclgate.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_, _)));
    }
}
