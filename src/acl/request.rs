use std::fmt;

use serde::Serialize;

use super::ActionSet;

/// A single authorization query: may `principal` perform `requested_actions`
/// on the resource `resource_type:resource_name`?
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessRequest {
    /// Identity whose rules are consulted. Never matched against rule fields.
    pub principal: String,
    /// Resource type, e.g. `repository`.
    pub resource_type: String,
    /// Resource name, e.g. `library/centos`.
    pub resource_name: String,
    /// Actions the caller wants to perform.
    pub requested_actions: ActionSet,
}

impl AccessRequest {
    pub fn new(
        principal: impl Into<String>,
        resource_type: impl Into<String>,
        resource_name: impl Into<String>,
    ) -> Self {
        Self {
            principal: principal.into(),
            resource_type: resource_type.into(),
            resource_name: resource_name.into(),
            requested_actions: ActionSet::new(),
        }
    }

    pub fn with_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requested_actions = ActionSet::from_names(actions);
        self
    }

    pub fn with_action_set(mut self, actions: ActionSet) -> Self {
        self.requested_actions = actions;
        self
    }
}

impl fmt::Display for AccessRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{} {}:{} {}}}",
            self.principal, self.resource_type, self.resource_name, self.requested_actions
        )
    }
}
