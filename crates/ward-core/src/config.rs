//! Declared policy: permissions, implicits, restrictions, enforcement.

use indexmap::IndexMap;

use crate::expr::Expr;
use crate::name::PermName;

/// A restriction attached to a permission declaration, read as
/// `uses(permission) ⟹ expr`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restriction {
    pub expr: Expr,
    pub description: Option<String>,
}

/// One declared permission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declaration {
    /// Implicit permissions are needed by every function that does not
    /// waive them.
    pub implicit: bool,
    pub description: Option<String>,
    pub restrictions: Vec<Restriction>,
}

impl Declaration {
    /// Merge another declaration of the same permission into this one:
    /// `implicit` ORs, descriptions join with `"; "`, restrictions
    /// concatenate.
    pub fn merge(&mut self, other: Declaration) {
        self.implicit |= other.implicit;
        self.description = match (self.description.take(), other.description) {
            (Some(a), Some(b)) => Some(format!("{a}; {b}")),
            (a, b) => a.or(b),
        };
        self.restrictions.extend(other.restrictions);
    }
}

/// A rule selecting functions whose declared actions must match their
/// inferred actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enforcement {
    /// Matches functions whose path ends with the given suffix.
    Path(String),
    /// Matches functions by name.
    Function(String),
    /// Matches by path suffix and name together.
    PathFunction(String, String),
}

impl Enforcement {
    pub fn matches(&self, path: &str, name: &str) -> bool {
        match self {
            Enforcement::Path(suffix) => path.ends_with(suffix),
            Enforcement::Function(n) => name == n,
            Enforcement::PathFunction(suffix, n) => path.ends_with(suffix) && name == n,
        }
    }
}

/// The merged policy from all config files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub declarations: IndexMap<PermName, Declaration>,
    pub enforcements: Vec<Enforcement>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a declaration, merging with an existing one for the same name.
    pub fn declare(&mut self, name: PermName, declaration: Declaration) {
        match self.declarations.entry(name) {
            indexmap::map::Entry::Occupied(mut e) => e.get_mut().merge(declaration),
            indexmap::map::Entry::Vacant(e) => {
                e.insert(declaration);
            }
        }
    }

    /// Fold another config file into this one, in order.
    pub fn merge(&mut self, other: Config) {
        for (name, declaration) in other.declarations {
            self.declare(name, declaration);
        }
        self.enforcements.extend(other.enforcements);
    }

    /// Permissions every non-waiving function implicitly needs.
    pub fn implicit_permissions(&self) -> impl Iterator<Item = &PermName> {
        self.declarations
            .iter()
            .filter(|(_, d)| d.implicit)
            .map(|(name, _)| name)
    }

    pub fn is_enforced(&self, path: &str, name: &str) -> bool {
        self.enforcements.iter().any(|e| e.matches(path, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_merge() {
        let mut a = Declaration {
            implicit: false,
            description: Some("first".into()),
            restrictions: vec![Restriction {
                expr: Expr::has("x"),
                description: None,
            }],
        };
        a.merge(Declaration {
            implicit: true,
            description: Some("second".into()),
            restrictions: vec![Restriction {
                expr: Expr::has("y"),
                description: None,
            }],
        });
        assert!(a.implicit);
        assert_eq!(a.description.as_deref(), Some("first; second"));
        assert_eq!(a.restrictions.len(), 2);
    }

    #[test]
    fn test_config_merge_in_order() {
        let mut a = Config::new();
        a.declare(PermName::new("lock"), Declaration::default());

        let mut b = Config::new();
        b.declare(
            PermName::new("lock"),
            Declaration {
                implicit: true,
                ..Declaration::default()
            },
        );
        b.enforcements.push(Enforcement::Path("public.h".into()));

        a.merge(b);
        assert_eq!(a.declarations.len(), 1);
        assert!(a.declarations[&PermName::new("lock")].implicit);
        assert_eq!(a.enforcements.len(), 1);
    }

    #[test]
    fn test_enforcement_matching() {
        assert!(Enforcement::Path("public.h".into()).matches("include/public.h", "f"));
        assert!(!Enforcement::Path("public.h".into()).matches("private.h", "f"));
        assert!(Enforcement::Function("f".into()).matches("anything.c", "f"));
        assert!(
            Enforcement::PathFunction("a.c".into(), "f".into()).matches("src/a.c", "f")
        );
        assert!(
            !Enforcement::PathFunction("a.c".into(), "f".into()).matches("src/a.c", "g")
        );
    }

    #[test]
    fn test_implicit_permissions() {
        let mut c = Config::new();
        c.declare(
            PermName::new("gc_safe"),
            Declaration {
                implicit: true,
                ..Declaration::default()
            },
        );
        c.declare(PermName::new("lock"), Declaration::default());
        let implicit: Vec<_> = c.implicit_permissions().collect();
        assert_eq!(implicit, vec![&PermName::new("gc_safe")]);
    }
}
