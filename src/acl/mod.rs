//! ACL policy resolution.
//!
//! Rules are stored as strings of the form `type:name:action1,action2`, where
//! `type` and `name` may contain `*` wildcards. Resolving a request:
//! 1. Parse each candidate rule (malformed rules are logged and skipped)
//! 2. Keep the rules whose type and name patterns match the request
//! 3. Intersect each rule's actions with the requested actions
//! 4. Return the largest intersection, or `NoMatch` if it is empty
//!
//! Everything here is pure and safe to call concurrently.

mod action;
mod error;
mod pattern;
mod request;
mod resolve;
mod rule;

pub use action::{Action, ActionSet};
pub use error::ParseError;
pub use pattern::matches;
pub use request::AccessRequest;
pub use resolve::{
    Explanation, Resolution, RuleEvaluation, parse_candidates, resolve, resolve_with_trace,
};
pub use rule::{RuleEntry, parse};
