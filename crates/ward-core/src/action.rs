//! Permission actions and action sets.
//!
//! An action is what a function declares about one permission: that it
//! needs it, exercises it, grants it, revokes it, forbids it, or opts out
//! of an implicit one. The textual form `action(name)` is both the display
//! form and the call-graph JSON representation.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexSet;
use thiserror::Error;

use crate::name::PermName;

/// A single permission action attached to a function.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    /// The function transitively requires the permission.
    Need(PermName),
    /// The function directly exercises the permission.
    Use(PermName),
    /// Post-state has the permission; pre-state must lack it.
    Grant(PermName),
    /// Pre-state has the permission; post-state lacks it.
    Revoke(PermName),
    /// The function forbids the permission in its pre-state.
    Deny(PermName),
    /// Opt out of an implicit permission.
    Waive(PermName),
}

impl Action {
    pub fn name(&self) -> &PermName {
        match self {
            Action::Need(n)
            | Action::Use(n)
            | Action::Grant(n)
            | Action::Revoke(n)
            | Action::Deny(n)
            | Action::Waive(n) => n,
        }
    }

    /// The action keyword as it appears in attributes and config.
    pub fn keyword(&self) -> &'static str {
        match self {
            Action::Need(_) => "need",
            Action::Use(_) => "use",
            Action::Grant(_) => "grant",
            Action::Revoke(_) => "revoke",
            Action::Deny(_) => "deny",
            Action::Waive(_) => "waive",
        }
    }

    /// Build an action from its keyword, or `None` for unknown keywords.
    pub fn from_keyword(keyword: &str, name: PermName) -> Option<Self> {
        match keyword {
            "need" => Some(Action::Need(name)),
            "use" => Some(Action::Use(name)),
            "grant" => Some(Action::Grant(name)),
            "revoke" => Some(Action::Revoke(name)),
            "deny" => Some(Action::Deny(name)),
            "waive" => Some(Action::Waive(name)),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.keyword(), self.name())
    }
}

/// Failure to parse the `action(name)` textual form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid permission action '{text}'")]
pub struct ActionParseError {
    pub text: String,
}

impl FromStr for Action {
    type Err = ActionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        fn err(text: &str) -> ActionParseError {
            ActionParseError {
                text: text.to_string(),
            }
        }
        let rest = s.strip_suffix(')').ok_or_else(|| err(s))?;
        let (keyword, name) = rest.split_once('(').ok_or_else(|| err(s))?;
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(err(s));
        }
        Action::from_keyword(keyword, PermName::new(name)).ok_or_else(|| err(s))
    }
}

/// A set of actions on one function. Duplicates collapse; iteration is
/// insertion-ordered for determinism.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionSet(IndexSet<Action>);

impl ActionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, returning true if the action was not already present.
    pub fn insert(&mut self, action: Action) -> bool {
        self.0.insert(action)
    }

    pub fn contains(&self, action: &Action) -> bool {
        self.0.contains(action)
    }

    pub fn extend(&mut self, other: &ActionSet) {
        for action in &other.0 {
            self.0.insert(action.clone());
        }
    }

    pub fn union(&self, other: &ActionSet) -> ActionSet {
        let mut out = self.clone();
        out.extend(other);
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Actions in `self` but not in `other`, in a stable sorted order
    /// (used for enforcement mismatch messages).
    pub fn difference(&self, other: &ActionSet) -> Vec<Action> {
        let mut out: Vec<Action> = self
            .0
            .iter()
            .filter(|a| !other.contains(a))
            .cloned()
            .collect();
        out.sort();
        out
    }
}

impl FromIterator<Action> for ActionSet {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ActionSet {
    type Item = &'a Action;
    type IntoIter = indexmap::set::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for ActionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sorted: Vec<&Action> = self.0.iter().collect();
        sorted.sort();
        for (i, action) in sorted.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{action}")?;
        }
        Ok(())
    }
}
