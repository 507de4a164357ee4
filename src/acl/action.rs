//! Typed action identifiers and sets of them.

use std::{collections::BTreeSet, fmt};

use serde::Serialize;

/// A single action identifier such as `pull` or `push`.
///
/// Always non-empty. Compared byte-for-byte, so `Pull` and `pull` are
/// different actions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Action(String);

impl Action {
    /// Build an action, returning `None` for the empty identifier.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.is_empty() { None } else { Some(Self(id)) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Action {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A set of actions. Duplicates collapse and iteration is in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ActionSet(BTreeSet<Action>);

impl ActionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a comma-separated action list.
    ///
    /// Returns `None` if any element between commas is empty, including the
    /// whole input being empty.
    pub fn parse_csv(csv: &str) -> Option<Self> {
        csv.split(',').map(Action::new).collect()
    }

    /// Collect action names from caller input, dropping empty names.
    ///
    /// Used for requested actions, where an empty name can never be granted
    /// and is simply ignored.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names.into_iter().filter_map(Action::new).collect()
    }

    pub fn insert(&mut self, action: Action) -> bool {
        self.0.insert(action)
    }

    pub fn contains(&self, action: &str) -> bool {
        self.0.iter().any(|a| a.as_str() == action)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.0.iter()
    }

    /// Actions present in both sets.
    pub fn intersection(&self, other: &ActionSet) -> ActionSet {
        Self(self.0.intersection(&other.0).cloned().collect())
    }

    /// Action names as owned strings, in sorted order.
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|a| a.0.clone()).collect()
    }
}

impl FromIterator<Action> for ActionSet {
    fn from_iter<T: IntoIterator<Item = Action>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ActionSet {
    type Item = Action;
    type IntoIter = std::collections::btree_set::IntoIter<Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ActionSet {
    type Item = &'a Action;
    type IntoIter = std::collections::btree_set::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Comma-joined, in sorted order: the wire form used inside rule strings.
impl fmt::Display for ActionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, action) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(action.as_str())?;
        }
        Ok(())
    }
}
