//! Key-value stores holding ACL rules and credentials.
//!
//! Rules for a principal live in a set at `{prefix}acl:{principal}`; password
//! hashes live in a string at `{prefix}user:{principal}`. Stores only fetch:
//! provisioning rules and credentials happens elsewhere.

mod error;
mod keys;
mod memory;
#[cfg(feature = "redis")]
mod redis;
mod traits;

pub use error::{StoreError, StoreResult};
pub use keys::StoreKeys;
pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use redis::RedisStore;
pub use traits::{CredentialStore, RuleStore, Store};
