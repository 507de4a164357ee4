//! Rule parsing errors.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The rule did not split into exactly `type:name:actions` once empty
    /// segments were dropped.
    #[error("Malformed ACL entry: {rule}")]
    Malformed { rule: String },

    /// The action list contained an empty identifier (e.g. `pull,,push`).
    #[error("Empty action identifier in ACL entry: {rule}")]
    EmptyAction { rule: String },
}

impl ParseError {
    pub fn malformed(rule: impl Into<String>) -> Self {
        Self::Malformed { rule: rule.into() }
    }

    pub fn empty_action(rule: impl Into<String>) -> Self {
        Self::EmptyAction { rule: rule.into() }
    }

    /// The offending rule string.
    pub fn rule(&self) -> &str {
        match self {
            Self::Malformed { rule } | Self::EmptyAction { rule } => rule,
        }
    }
}
