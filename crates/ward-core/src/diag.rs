//! Source positions and diagnostic entries.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A resolved source position: original file and 1-based line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub file: String,
    pub line: u32,
}

impl Pos {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// Position for entities with no usable source location (e.g. graph
    /// inputs without positions).
    pub fn unknown() -> Self {
        Self::new("<unknown>", 0)
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// One diagnostic produced by the analysis.
///
/// Entries travel from the analysis worker to the drain thread as
/// `Option<Entry>`; `None` is the channel terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Note(Pos, String),
    Warning(Pos, String),
    Error(Pos, String),
}

impl Entry {
    pub fn pos(&self) -> &Pos {
        match self {
            Entry::Note(p, _) | Entry::Warning(p, _) | Entry::Error(p, _) => p,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Entry::Note(_, t) | Entry::Warning(_, t) | Entry::Error(_, t) => t,
        }
    }

    /// Lower-case kind name, used by both output formatters.
    pub fn kind(&self) -> &'static str {
        match self {
            Entry::Note(..) => "note",
            Entry::Warning(..) => "warning",
            Entry::Error(..) => "error",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Entry::Error(..))
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, Entry::Warning(..))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pos_display() {
        assert_eq!(Pos::new("a.c", 12).to_string(), "a.c:12");
    }

    #[test]
    fn test_entry_accessors() {
        let e = Entry::Error(Pos::new("a.c", 3), "boom".into());
        assert_eq!(e.kind(), "error");
        assert_eq!(e.text(), "boom");
        assert_eq!(e.pos().line, 3);
        assert!(e.is_error());
        assert!(!e.is_warning());
    }
}
