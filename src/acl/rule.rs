//! Rule grammar: `type:name:action1,action2,...`.

use std::{fmt, str::FromStr};

use serde::Serialize;

use super::{AccessRequest, ActionSet, ParseError, matches};

/// Delimiter between the type, name and action segments.
const SEGMENT_DELIMITER: char = ':';

/// One parsed policy rule.
///
/// `match_type` and `match_name` are wildcard patterns kept verbatim from the
/// rule string; `actions` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleEntry {
    pub match_type: String,
    pub match_name: String,
    pub actions: ActionSet,
}

impl RuleEntry {
    /// Parse a raw rule string.
    ///
    /// The string is split on `:` and empty segments are dropped before
    /// counting, so `"repository::pull"` collapses to two segments and is
    /// rejected. Exactly three segments must remain.
    pub fn parse(rule: &str) -> Result<Self, ParseError> {
        let mut segments = rule.split(SEGMENT_DELIMITER).filter(|s| !s.is_empty());

        let (Some(match_type), Some(match_name), Some(actions), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(ParseError::malformed(rule));
        };

        let actions = ActionSet::parse_csv(actions).ok_or_else(|| ParseError::empty_action(rule))?;

        Ok(Self {
            match_type: match_type.to_string(),
            match_name: match_name.to_string(),
            actions,
        })
    }

    /// Whether this rule's type and name patterns both match the request's
    /// resource. The principal plays no part.
    pub fn matches(&self, request: &AccessRequest) -> bool {
        matches(&self.match_type, &request.resource_type)
            && matches(&self.match_name, &request.resource_name)
    }

    /// Requested actions this rule permits.
    pub fn grant(&self, request: &AccessRequest) -> ActionSet {
        request.requested_actions.intersection(&self.actions)
    }
}

impl FromStr for RuleEntry {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RuleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SEGMENT_DELIMITER}{}{SEGMENT_DELIMITER}{}",
            self.match_type, self.match_name, self.actions
        )
    }
}

/// Parse a rule string. Shorthand for [`RuleEntry::parse`].
pub fn parse(rule: &str) -> Result<RuleEntry, ParseError> {
    RuleEntry::parse(rule)
}
