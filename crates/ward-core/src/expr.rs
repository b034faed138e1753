//! Boolean expressions over context state.
//!
//! Restriction predicates are trees of `And`/`Or`/`Not` over `Context`
//! atoms. An atom `Context(p, q)` asks whether the state at `p` sits at or
//! above `q` in the presence lattice.

use std::fmt;

use crate::lattice::{Capability, Lattice, Presence};
use crate::name::PermName;
use crate::presence::PresenceSet;

/// A boolean predicate over a [`PresenceSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Holds iff `state[name] ⊒ presence`.
    Context(PermName, Presence),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    /// The common atom: "the context holds permission `name`".
    pub fn has(name: impl Into<PermName>) -> Self {
        Expr::Context(name.into(), Presence::capability(Capability::Has))
    }

    pub fn and(self, other: Expr) -> Self {
        Expr::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Expr) -> Self {
        Expr::Or(Box::new(self), Box::new(other))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    /// Evaluate against a state.
    pub fn holds(&self, state: &PresenceSet) -> bool {
        match self {
            Expr::Context(name, presence) => presence.leq(&state.get(name)),
            Expr::And(a, b) => a.holds(state) && b.holds(state),
            Expr::Or(a, b) => a.holds(state) || b.holds(state),
            Expr::Not(e) => !e.holds(state),
        }
    }

    /// Binding strength for display: `Not` > `And` > `Or`.
    fn precedence(&self) -> u8 {
        match self {
            Expr::Context(..) => 3,
            Expr::Not(_) => 2,
            Expr::And(..) => 1,
            Expr::Or(..) => 0,
        }
    }

    fn fmt_child(&self, child: &Expr, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if child.precedence() < self.precedence() {
            write!(f, "({child})")
        } else {
            write!(f, "{child}")
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Context(name, _) => write!(f, "{name}"),
            Expr::And(a, b) => {
                self.fmt_child(a, f)?;
                f.write_str(" & ")?;
                self.fmt_child(b, f)
            }
            Expr::Or(a, b) => {
                self.fmt_child(a, f)?;
                f.write_str(" | ")?;
                self.fmt_child(b, f)
            }
            Expr::Not(e) => {
                f.write_str("!")?;
                self.fmt_child(e, f)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::Usage;

    fn state(entries: &[(&str, Capability)]) -> PresenceSet {
        entries
            .iter()
            .map(|(n, c)| (PermName::new(n), Presence::capability(*c)))
            .collect()
    }

    #[test]
    fn test_context_atom_reads_lattice_order() {
        let s = state(&[("lock", Capability::Has)]);
        assert!(Expr::has("lock").holds(&s));
        // Conflict sits above Has, so the atom still holds there.
        assert!(Expr::has("lock").holds(&state(&[("lock", Capability::Conflict)])));
        assert!(!Expr::has("lock").holds(&state(&[("lock", Capability::Lacks)])));
        assert!(!Expr::has("lock").holds(&PresenceSet::new()));
    }

    #[test]
    fn test_boolean_operators() {
        let s = state(&[("a", Capability::Has)]);
        assert!(Expr::has("a").or(Expr::has("b")).holds(&s));
        assert!(!Expr::has("a").and(Expr::has("b")).holds(&s));
        assert!(Expr::has("b").not().holds(&s));
    }

    #[test]
    fn test_usage_atom() {
        let uses = Expr::Context(
            PermName::new("lock"),
            Presence::new(Usage::Uses, Capability::Unknown),
        );
        let s: PresenceSet = [(
            PermName::new("lock"),
            Presence::new(Usage::Uses, Capability::Has),
        )]
        .into_iter()
        .collect();
        assert!(uses.holds(&s));
        assert!(!uses.holds(&state(&[("lock", Capability::Has)])));
    }

    #[test]
    fn test_display_precedence() {
        let e = Expr::has("a").or(Expr::has("b")).and(Expr::has("c").not());
        assert_eq!(e.to_string(), "(a | b) & !c");
        let f = Expr::has("a").and(Expr::has("b")).or(Expr::has("c"));
        assert_eq!(f.to_string(), "a & b | c");
        let g = Expr::has("a").or(Expr::has("b")).not();
        assert_eq!(g.to_string(), "!(a | b)");
    }
}
