//! ACL policy resolution for container registry token auth.
//!
//! - [`acl`]: rule grammar, glob matching, and best-match resolution.
//! - [`store`]: where rules and password hashes live (Redis or in-memory).
//! - [`authz`] / [`authn`]: backend traits and ordered chains over them.
//! - [`config`]: TOML configuration that wires the chains together.

pub mod acl;
pub mod authn;
pub mod authz;
pub mod config;
#[cfg(feature = "cli")]
pub mod observability;
pub mod store;
