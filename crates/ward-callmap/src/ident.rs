//! Function identifiers.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use ward_core::Pos;

/// Separator between a path prefix and a file-local function name.
pub const STATIC_SEPARATOR: char = '`';

/// A function identifier: name, name hash, and source position.
///
/// Equality and hashing use the name and its hash only — the position is
/// carried along for diagnostics but two references to the same function
/// from different places compare equal. The hash is always computed from
/// the *original* (unprefixed) name, so it survives static-name
/// disambiguation and stays consistent between prefixed definitions and
/// the renamed call sites that refer to them.
#[derive(Debug, Clone)]
pub struct FunId {
    pub name: String,
    pub hash: u64,
    pub pos: Pos,
}

impl FunId {
    pub fn new(name: impl Into<String>, pos: Pos) -> Self {
        let name = name.into();
        let hash = hash_original(&name);
        Self { name, hash, pos }
    }

    /// Identifier for a file-local function: `` path`name ``.
    pub fn file_local(path: &str, name: &str, pos: Pos) -> Self {
        Self::new(format!("{path}{STATIC_SEPARATOR}{name}"), pos)
    }

    /// The name without any static path prefix.
    pub fn base_name(&self) -> &str {
        base_name(&self.name)
    }

    /// The defining path for file-local functions, if any.
    pub fn static_path(&self) -> Option<&str> {
        self.name
            .rfind(STATIC_SEPARATOR)
            .map(|idx| &self.name[..idx])
    }

    /// Same identifier, different position (e.g. a call site).
    pub fn at(&self, pos: Pos) -> Self {
        Self {
            name: self.name.clone(),
            hash: self.hash,
            pos,
        }
    }
}

fn base_name(name: &str) -> &str {
    match name.rfind(STATIC_SEPARATOR) {
        Some(idx) => &name[idx + STATIC_SEPARATOR.len_utf8()..],
        None => name,
    }
}

fn hash_original(name: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    base_name(name).hash(&mut hasher);
    hasher.finish()
}

impl PartialEq for FunId {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.name == other.name
    }
}

impl Eq for FunId {}

impl Hash for FunId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for FunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
