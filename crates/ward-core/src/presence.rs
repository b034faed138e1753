//! Per-permission program state.

use indexmap::IndexMap;

use crate::lattice::{BoundedLattice, Lattice, Presence};
use crate::name::PermName;

/// A mapping from permission name to [`Presence`], with pointwise lattice
/// structure.
///
/// Absent keys read as the bottom presence; the empty map is the bottom
/// set. To keep equality canonical the map never stores a bottom presence
/// — updates that produce bottom remove the key instead.
///
/// Backed by an `IndexMap` so iteration follows insertion order and the
/// analysis stays deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceSet(IndexMap<PermName, Presence>);

impl PresenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the presence at `name`; absent keys are bottom.
    pub fn get(&self, name: &PermName) -> Presence {
        self.0.get(name).copied().unwrap_or_else(Presence::bottom)
    }

    /// Overwrite the presence at `name`, dropping the key on bottom.
    pub fn set(&mut self, name: PermName, presence: Presence) {
        if presence.is_bottom() {
            self.0.shift_remove(&name);
        } else {
            self.0.insert(name, presence);
        }
    }

    /// Apply `f` to the presence at `name` (reading bottom if absent).
    pub fn update(&mut self, name: &PermName, f: impl FnOnce(Presence) -> Presence) {
        let next = f(self.get(name));
        self.set(name.clone(), next);
    }

    /// Join `name` with `presence` in place.
    pub fn join_at(&mut self, name: &PermName, presence: Presence) {
        self.update(name, |p| p.join(&presence));
    }

    pub fn is_bottom(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PermName, &Presence)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &PermName> {
        self.0.keys()
    }
}

impl Lattice for PresenceSet {
    fn join(&self, other: &Self) -> Self {
        let mut out = self.clone();
        for (name, presence) in &other.0 {
            out.join_at(name, *presence);
        }
        out
    }

    fn meet(&self, other: &Self) -> Self {
        // Absent keys are bottom, and bottom meets everything to bottom,
        // so only shared keys can survive.
        let mut out = Self::new();
        for (name, presence) in &self.0 {
            if let Some(theirs) = other.0.get(name) {
                out.set(name.clone(), presence.meet(theirs));
            }
        }
        out
    }

    fn leq(&self, other: &Self) -> bool {
        self.0
            .iter()
            .all(|(name, presence)| presence.leq(&other.get(name)))
    }
}

impl FromIterator<(PermName, Presence)> for PresenceSet {
    fn from_iter<I: IntoIterator<Item = (PermName, Presence)>>(iter: I) -> Self {
        let mut out = Self::new();
        for (name, presence) in iter {
            out.join_at(&name, presence);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::{Capability, Usage};

    fn set(entries: &[(&str, Presence)]) -> PresenceSet {
        entries
            .iter()
            .map(|(n, p)| (PermName::new(n), *p))
            .collect()
    }

    #[test]
    fn test_absent_key_reads_bottom() {
        let s = PresenceSet::new();
        assert_eq!(s.get(&PermName::new("lock")), Presence::bottom());
        assert!(s.is_bottom());
    }

    #[test]
    fn test_join_is_pointwise() {
        let a = set(&[
            ("lock", Presence::capability(Capability::Has)),
            ("gc_safe", Presence::new(Usage::Uses, Capability::Unknown)),
        ]);
        let b = set(&[("lock", Presence::capability(Capability::Lacks))]);
        let joined = a.join(&b);

        for key in ["lock", "gc_safe"] {
            let name = PermName::new(key);
            assert_eq!(joined.get(&name), a.get(&name).join(&b.get(&name)));
        }
        assert_eq!(
            joined.get(&PermName::new("lock")).capability,
            Capability::Conflict
        );
    }

    #[test]
    fn test_join_with_bottom_is_identity() {
        let a = set(&[("lock", Presence::capability(Capability::Has))]);
        assert_eq!(a.join(&PresenceSet::new()), a);
        assert_eq!(PresenceSet::new().join(&a), a);
    }

    #[test]
    fn test_bottom_values_are_not_stored() {
        let mut s = set(&[("lock", Presence::capability(Capability::Has))]);
        s.set(PermName::new("lock"), Presence::bottom());
        assert_eq!(s, PresenceSet::new());
    }

    #[test]
    fn test_leq_pointwise() {
        let small = set(&[("lock", Presence::capability(Capability::Has))]);
        let big = set(&[("lock", Presence::capability(Capability::Conflict))]);
        assert!(small.leq(&big));
        assert!(!big.leq(&small));
        assert!(PresenceSet::new().leq(&small));
    }

    #[test]
    fn test_meet_keeps_shared_keys_only() {
        let a = set(&[
            ("lock", Presence::capability(Capability::Has)),
            ("io", Presence::capability(Capability::Has)),
        ]);
        let b = set(&[("lock", Presence::capability(Capability::Has))]);
        let met = a.meet(&b);
        assert_eq!(
            met.get(&PermName::new("lock")),
            Presence::capability(Capability::Has)
        );
        assert_eq!(met.get(&PermName::new("io")), Presence::bottom());
    }
}
