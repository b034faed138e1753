//! The permission lattice: `Usage`, `Capability`, and their product.
//!
//! Permission state at a program point is a pair of independent facts:
//! whether the permission has been *exercised* (`Usage`, a two-element
//! chain) and whether it is *held* (`Capability`, a diamond whose top
//! records that both "held" and "not held" reach the same point).
//!
//! # Laws
//!
//! For all `a`, `b`, `c` of each lattice type:
//! - commutativity: `a ∨ b = b ∨ a`, `a ∧ b = b ∧ a`
//! - associativity: `(a ∨ b) ∨ c = a ∨ (b ∨ c)` (and dually for `∧`)
//! - idempotence: `a ∨ a = a`, `a ∧ a = a`
//! - absorption: `a ∨ (a ∧ b) = a`
//! - bounds: `⊥ ∨ a = a`, `⊤ ∧ a = a`
//! - order: `a ⊑ b ⟺ a ∨ b = b`

/// A lattice with join (∨), meet (∧) and the induced partial order.
pub trait Lattice: Clone + PartialEq {
    /// Least upper bound.
    fn join(&self, other: &Self) -> Self;

    /// Greatest lower bound.
    fn meet(&self, other: &Self) -> Self;

    /// Partial order: `a ⊑ b` iff `a ∨ b = b`.
    fn leq(&self, other: &Self) -> bool {
        self.join(other) == *other
    }
}

/// A lattice with distinguished bottom (⊥) and top (⊤) elements.
pub trait BoundedLattice: Lattice {
    fn bottom() -> Self;
    fn top() -> Self;
}

/// Whether a permission has been exercised on some path to this point.
///
/// A two-element chain: `Unknown ⊑ Uses`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Usage {
    /// No use observed.
    Unknown,
    /// The permission has been exercised.
    Uses,
}

impl Lattice for Usage {
    fn join(&self, other: &Self) -> Self {
        (*self).max(*other)
    }

    fn meet(&self, other: &Self) -> Self {
        (*self).min(*other)
    }
}

impl BoundedLattice for Usage {
    fn bottom() -> Self {
        Usage::Unknown
    }

    fn top() -> Self {
        Usage::Uses
    }
}

/// Whether a permission is held at this point.
///
/// A diamond: `Unknown ⊑ {Has, Lacks} ⊑ Conflict`. Joining `Has` with
/// `Lacks` yields `Conflict` — the point is reachable both with and
/// without the permission, which the engine reports rather than hides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    /// Nothing known.
    Unknown,
    /// The permission is held.
    Has,
    /// The permission is definitely not held.
    Lacks,
    /// Incompatible states reach the same point.
    Conflict,
}

impl Capability {
    /// `self ⊒ Has`: the "must hold the permission" pre-requirement.
    pub fn satisfies_has(self) -> bool {
        matches!(self, Capability::Has | Capability::Conflict)
    }

    /// `self ⊑ Lacks`: the "must not hold the permission" pre-requirement.
    pub fn satisfies_lacks(self) -> bool {
        matches!(self, Capability::Lacks | Capability::Unknown)
    }
}

impl Lattice for Capability {
    fn join(&self, other: &Self) -> Self {
        use Capability::*;
        match (*self, *other) {
            (a, b) if a == b => a,
            (Unknown, x) | (x, Unknown) => x,
            (Conflict, _) | (_, Conflict) => Conflict,
            // Has ∨ Lacks
            _ => Conflict,
        }
    }

    fn meet(&self, other: &Self) -> Self {
        use Capability::*;
        match (*self, *other) {
            (a, b) if a == b => a,
            (Conflict, x) | (x, Conflict) => x,
            (Unknown, _) | (_, Unknown) => Unknown,
            // Has ∧ Lacks
            _ => Unknown,
        }
    }
}

impl BoundedLattice for Capability {
    fn bottom() -> Self {
        Capability::Unknown
    }

    fn top() -> Self {
        Capability::Conflict
    }
}

/// What is known about one permission at one program point.
///
/// The product of `Usage` and `Capability`, ordered pointwise. The bottom
/// element (both components bottom) is what an absent key in a
/// [`PresenceSet`](crate::PresenceSet) reads as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Presence {
    pub usage: Usage,
    pub capability: Capability,
}

impl Presence {
    pub fn new(usage: Usage, capability: Capability) -> Self {
        Self { usage, capability }
    }

    /// Presence carrying only a capability fact.
    pub fn capability(capability: Capability) -> Self {
        Self::new(Usage::Unknown, capability)
    }

    pub fn is_bottom(&self) -> bool {
        *self == Self::bottom()
    }
}

impl Lattice for Presence {
    fn join(&self, other: &Self) -> Self {
        Self {
            usage: self.usage.join(&other.usage),
            capability: self.capability.join(&other.capability),
        }
    }

    fn meet(&self, other: &Self) -> Self {
        Self {
            usage: self.usage.meet(&other.usage),
            capability: self.capability.meet(&other.capability),
        }
    }
}

impl BoundedLattice for Presence {
    fn bottom() -> Self {
        Self::new(Usage::bottom(), Capability::bottom())
    }

    fn top() -> Self {
        Self::new(Usage::top(), Capability::top())
    }
}
