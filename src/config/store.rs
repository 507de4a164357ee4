use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::acl::RuleEntry;

/// Backing store for an authorizer or authenticator backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
pub enum StoreConfig {
    /// Rules and credentials in Redis. Suitable for multi-node deployments.
    Redis(RedisStoreConfig),

    /// Rules and credentials listed directly in the config file.
    Memory(MemoryStoreConfig),
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            StoreConfig::Redis(c) => c.validate(),
            StoreConfig::Memory(c) => c.validate(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StoreConfig::Redis(_) => "redis",
            StoreConfig::Memory(_) => "memory",
        }
    }
}

/// Redis store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedisStoreConfig {
    /// Redis connection URL.
    /// Format: redis://[user:password@]host:port[/database]
    pub url: String,

    /// Prepended to every key, e.g. `registry:` gives `registry:acl:alice`.
    #[serde(default)]
    pub key_prefix: String,

    /// Maximum number of connections checked out at once.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Timeout for dialling a new connection, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// How long a request waits for a free pooled connection, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub checkout_timeout_secs: u64,
}

impl RedisStoreConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::Validation("Redis URL cannot be empty".into()));
        }
        if self.pool_size == 0 {
            return Err(ConfigError::Validation(
                "Redis pool_size must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

fn default_pool_size() -> usize {
    10
}

fn default_timeout_secs() -> u64 {
    5
}

/// Static store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryStoreConfig {
    /// ACL rule strings per principal.
    #[serde(default)]
    pub rules: HashMap<String, Vec<String>>,

    /// PHC-format password hashes per principal.
    #[serde(default)]
    pub users: HashMap<String, String>,
}

impl MemoryStoreConfig {
    /// Unlike rules fetched at request time, a malformed rule written in the
    /// config file is rejected up front.
    fn validate(&self) -> Result<(), ConfigError> {
        for (principal, rules) in &self.rules {
            for rule in rules {
                RuleEntry::parse(rule).map_err(|e| {
                    ConfigError::Validation(format!("rule for '{principal}': {e}"))
                })?;
            }
        }
        Ok(())
    }
}
