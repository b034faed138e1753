//! Restriction evaluation and enforcement checking.

use ward_callmap::{CallMapEntry, FunId};
use ward_core::{Action, ActionSet, Config, Entry, PermName, Pos, PresenceSet, Usage};

use crate::report::Reporter;

/// Evaluate every declared restriction against a function's exit state.
///
/// A restriction on permission `p` reads `uses(p) ⟹ expr`: it only
/// applies to functions whose state has exercised `p`, and the expression
/// is evaluated against the same state.
pub fn check_restrictions(
    config: &Config,
    id: &FunId,
    pos: &Pos,
    exit: &PresenceSet,
    reporter: &Reporter,
) {
    for (permission, declaration) in &config.declarations {
        if declaration.restrictions.is_empty() {
            continue;
        }
        if exit.get(permission).usage != Usage::Uses {
            continue;
        }
        for restriction in &declaration.restrictions {
            if restriction.expr.holds(exit) {
                continue;
            }
            let text = match &restriction.description {
                Some(description) => format!(
                    "restriction on '{permission}' violated in '{id}': {description}"
                ),
                None => format!(
                    "restriction '{}' on '{permission}' violated in '{id}'",
                    restriction.expr
                ),
            };
            reporter.send(Entry::Error(pos.clone(), text));
        }
    }
}

/// For enforced functions, the inferred action set must match the
/// declared one.
///
/// Intrinsic actions (`use`, `deny`, `waive`) cannot be derived from call
/// structure and are taken at face value; implicit needs are excluded
/// from the comparison on both sides.
pub fn check_enforcement(
    config: &Config,
    id: &FunId,
    entry: &CallMapEntry,
    inferred: &ActionSet,
    reporter: &Reporter,
) {
    let enforced = entry
        .positions
        .iter()
        .any(|pos| config.is_enforced(&pos.file, id.base_name()));
    if !enforced {
        return;
    }

    let implicit: Vec<&PermName> = config.implicit_permissions().collect();
    let strip = |actions: &ActionSet| -> ActionSet {
        actions
            .iter()
            .filter(|action| {
                !matches!(action, Action::Need(p) if implicit.contains(&p))
            })
            .cloned()
            .collect()
    };

    let declared = strip(&entry.actions);
    let mut inferred = strip(inferred);
    for action in &entry.actions {
        if matches!(action, Action::Use(_) | Action::Deny(_) | Action::Waive(_)) {
            inferred.insert(action.clone());
        }
    }

    let missing = inferred.difference(&declared);
    let extra = declared.difference(&inferred);
    if missing.is_empty() && extra.is_empty() {
        return;
    }

    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("missing {}", join_actions(&missing)));
    }
    if !extra.is_empty() {
        parts.push(format!("extra {}", join_actions(&extra)));
    }
    reporter.send(Entry::Error(
        entry.pos.clone(),
        format!(
            "enforced function '{id}' does not match its declaration: {}",
            parts.join("; ")
        ),
    ));
}

fn join_actions(actions: &[Action]) -> String {
    actions
        .iter()
        .map(Action::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
