use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{
    error::StoreResult,
    traits::{CredentialStore, RuleStore, Store},
};
use crate::config::MemoryStoreConfig;

/// In-memory rule and credential store using DashMap for concurrent access.
///
/// Rules are kept as a set per principal, like the Redis layout, so fetch
/// order is unspecified. Useful for static deployments configured entirely
/// from the config file, and for tests.
///
/// Cloning is cheap and clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    rules: Arc<DashMap<String, HashSet<String>>>,
    secrets: Arc<DashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &MemoryStoreConfig) -> Self {
        let store = Self::new();
        for (principal, rules) in &config.rules {
            for rule in rules {
                store.add_rule(principal, rule);
            }
        }
        for (principal, hash) in &config.users {
            store.set_secret(principal, hash);
        }
        store
    }

    /// Add a rule for a principal. Returns false if it was already present.
    pub fn add_rule(&self, principal: &str, rule: &str) -> bool {
        self.rules
            .entry(principal.to_string())
            .or_default()
            .insert(rule.to_string())
    }

    /// Remove a rule for a principal. Returns true if it was present.
    pub fn remove_rule(&self, principal: &str, rule: &str) -> bool {
        let Some(mut set) = self.rules.get_mut(principal) else {
            return false;
        };
        let removed = set.remove(rule);
        let now_empty = set.is_empty();
        drop(set);

        if now_empty {
            self.rules.remove_if(principal, |_, set| set.is_empty());
        }
        removed
    }

    pub fn set_secret(&self, principal: &str, hash: &str) {
        self.secrets.insert(principal.to_string(), hash.to_string());
    }

    pub fn remove_secret(&self, principal: &str) -> bool {
        self.secrets.remove(principal).is_some()
    }

    /// Number of principals with at least one rule.
    pub fn principal_count(&self) -> usize {
        self.rules.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn kind(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl RuleStore for MemoryStore {
    async fn fetch_rules(&self, principal: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .rules
            .get(principal)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn fetch_secret(&self, principal: &str) -> StoreResult<Option<String>> {
        Ok(self.secrets.get(principal).map(|hash| hash.clone()))
    }
}
