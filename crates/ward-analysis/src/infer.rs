//! Fixed-point permission inference.
//!
//! Every function carries a *summary*: the action set describing its
//! effective behavior. Summaries start from the declared actions (plus
//! implicit needs) and grow monotonically as the engine walks call
//! sequences — a callee that needs a permission nobody provides makes the
//! caller need it too; a body that ends up holding a permission it did not
//! start with grants it. The walk is flow-sensitive (states thread through
//! the call sequence, branches join pointwise) and context-insensitive
//! (one summary per function). The lattice has finite height and
//! summaries only grow, so round-robin iteration terminates.
//!
//! # Walk modes
//!
//! The same traversal serves two purposes with different entry seeding:
//!
//! - **Derivation**: entry seeded from the summary's `Grant`/`Revoke`
//!   effects only. Requirement checks that hit bottom become derived
//!   `Need`/`Deny` actions instead of being absorbed by seeds, so the
//!   derived set reflects what the body actually demands.
//! - **Reporting**: entry seeded from the declared actions, implicit
//!   needs, and the derived effects. Derived requirements deliberately do
//!   not seed here: a caller that never obtains a permission must still be
//!   told so at the call site.

use indexmap::IndexMap;
use tracing::debug;

use ward_callmap::{CallMap, CallSeq, CallTree, FunId};
use ward_core::{
    Action, ActionSet, Capability, Config, Lattice, PermName, Pos, Presence, PresenceSet, Usage,
};

/// Effective action sets, one per call-map entry.
pub type Summaries = IndexMap<FunId, ActionSet>;

/// A pre-requirement that did not hold at a call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// The call site.
    pub pos: Pos,
    pub callee: String,
    /// The callee action whose requirement failed.
    pub action: Action,
}

/// Everything observed during one walk of a function body.
#[derive(Debug, Default)]
pub struct WalkEvents {
    pub failures: Vec<Failure>,
    /// Requirements evaluated against bottom: transitive demands on
    /// callers.
    pub bottom_requirements: ActionSet,
    /// First program point, in source order, where each permission was
    /// seen in conflict.
    pub conflicts: IndexMap<PermName, Pos>,
}

/// Seed an entry state from a full action set.
pub fn seed_full(actions: &ActionSet) -> PresenceSet {
    let mut state = PresenceSet::new();
    for action in actions {
        let presence = match action {
            Action::Need(_) => Presence::capability(Capability::Has),
            Action::Use(_) => Presence::new(Usage::Uses, Capability::Has),
            Action::Grant(_) => Presence::capability(Capability::Lacks),
            Action::Revoke(_) => Presence::capability(Capability::Has),
            Action::Deny(_) => Presence::capability(Capability::Lacks),
            Action::Waive(_) => continue,
        };
        state.join_at(action.name(), presence);
    }
    state
}

/// Seed only the state-changing effects (`Grant`, `Revoke`).
pub fn seed_effects(actions: &ActionSet) -> PresenceSet {
    let mut state = PresenceSet::new();
    for action in actions {
        let presence = match action {
            Action::Grant(_) => Presence::capability(Capability::Lacks),
            Action::Revoke(_) => Presence::capability(Capability::Has),
            _ => continue,
        };
        state.join_at(action.name(), presence);
    }
    state
}

/// Declared actions plus `Need(p)` for every implicit permission the
/// function does not waive.
pub fn declared_with_implicit(actions: &ActionSet, config: &Config) -> ActionSet {
    let mut out = actions.clone();
    for permission in config.implicit_permissions() {
        let waived = actions
            .iter()
            .any(|a| matches!(a, Action::Waive(p) if p == permission));
        if !waived {
            out.insert(Action::Need(permission.clone()));
        }
    }
    out
}

/// The reporting-walk entry state for a function with the given declared
/// actions (implicit included) and fixed-point summary.
pub fn report_entry_state(declared: &ActionSet, summary: &ActionSet) -> PresenceSet {
    seed_full(declared).join(&seed_effects(summary))
}

/// Walk a body from `entry`, applying callee summaries. Returns the exit
/// state and the observed events; the final state is also scanned for
/// conflicts at `fun_pos`.
pub fn walk(
    summaries: &Summaries,
    body: &CallSeq,
    entry: &PresenceSet,
    fun_pos: &Pos,
) -> (PresenceSet, WalkEvents) {
    let mut events = WalkEvents::default();
    let mut state = entry.clone();
    walk_seq(summaries, body, &mut state, &mut events);
    note_conflicts(&state, fun_pos, &mut events);
    (state, events)
}

fn walk_seq(
    summaries: &Summaries,
    seq: &CallSeq,
    state: &mut PresenceSet,
    events: &mut WalkEvents,
) {
    for tree in seq.iter() {
        match tree {
            CallTree::Call(callee) => apply_call(summaries, callee, state, events),
            CallTree::Choice(left, right) => {
                let mut left_state = state.clone();
                walk_seq(summaries, left, &mut left_state, events);
                let mut right_state = state.clone();
                walk_seq(summaries, right, &mut right_state, events);
                *state = left_state.join(&right_state);
            }
        }
    }
}

/// Transfer for one call site: requirement checks against the incoming
/// state, then state updates. Callees without a summary (undeclared
/// functions) transfer nothing.
fn apply_call(
    summaries: &Summaries,
    callee: &FunId,
    state: &mut PresenceSet,
    events: &mut WalkEvents,
) {
    let Some(actions) = summaries.get(callee) else {
        return;
    };

    note_conflicts(state, &callee.pos, events);

    let mut sorted: Vec<&Action> = actions.iter().collect();
    sorted.sort();

    for action in &sorted {
        let permission = action.name();
        let capability = state.get(permission).capability;
        let failed = match action {
            Action::Need(_) | Action::Use(_) | Action::Revoke(_) => {
                if capability == Capability::Unknown {
                    events.bottom_requirements.insert(Action::Need(permission.clone()));
                }
                !capability.satisfies_has()
            }
            Action::Grant(_) => !capability.satisfies_lacks(),
            Action::Deny(_) => {
                if capability == Capability::Unknown {
                    events.bottom_requirements.insert(Action::Deny(permission.clone()));
                }
                !capability.satisfies_lacks()
            }
            Action::Waive(_) => false,
        };
        if failed {
            events.failures.push(Failure {
                pos: callee.pos.clone(),
                callee: callee.name.clone(),
                action: (*action).clone(),
            });
        }
    }

    for action in &sorted {
        let permission = action.name();
        match action {
            Action::Use(_) => state.update(permission, |p| Presence {
                usage: Usage::Uses,
                ..p
            }),
            Action::Grant(_) => state.update(permission, |p| Presence {
                capability: Capability::Has,
                ..p
            }),
            Action::Revoke(_) => state.update(permission, |p| Presence {
                capability: Capability::Lacks,
                ..p
            }),
            _ => {}
        }
    }
}

fn note_conflicts(state: &PresenceSet, pos: &Pos, events: &mut WalkEvents) {
    for (name, presence) in state.iter() {
        if presence.capability == Capability::Conflict && !events.conflicts.contains_key(name) {
            events.conflicts.insert(name.clone(), pos.clone());
        }
    }
}

/// The actions a walk exposes: transitive requirements plus net
/// capability changes and observed use.
///
/// `Grant` derives from an unknown entry as well as a lacking one — that
/// is what makes a conditional grant visible as a conflict to the
/// reporting walk. `Revoke` derives only from a held entry: a body that
/// takes and releases a permission it did not start with has no net
/// effect to advertise.
pub fn derive_actions(
    entry: &PresenceSet,
    exit: &PresenceSet,
    bottom_requirements: &ActionSet,
) -> ActionSet {
    let mut derived = bottom_requirements.clone();
    for (name, presence) in exit.iter() {
        let before = entry.get(name).capability;
        match presence.capability {
            Capability::Has if before != Capability::Has => {
                derived.insert(Action::Grant(name.clone()));
            }
            Capability::Lacks if before == Capability::Has => {
                derived.insert(Action::Revoke(name.clone()));
            }
            _ => {}
        }
        if presence.usage == Usage::Uses {
            derived.insert(Action::Use(name.clone()));
        }
    }
    derived
}

/// Summaries before any inference: declared actions plus implicit needs.
pub fn initial_summaries(map: &CallMap, config: &Config) -> Summaries {
    map.iter()
        .map(|(id, entry)| (id.clone(), declared_with_implicit(&entry.actions, config)))
        .collect()
}

/// Run the whole-program fixed point.
pub fn compute_summaries(map: &CallMap, config: &Config) -> Summaries {
    let mut summaries = initial_summaries(map, config);
    let mut iterations = 0usize;
    loop {
        iterations += 1;
        let mut changed = false;
        for (id, entry) in map.iter() {
            let Some(body) = &entry.body else {
                continue;
            };
            let entry_state = match summaries.get(id) {
                Some(summary) => seed_effects(summary),
                None => PresenceSet::new(),
            };
            let (exit, events) = walk(&summaries, body, &entry_state, &entry.pos);
            let derived = derive_actions(&entry_state, &exit, &events.bottom_requirements);
            if let Some(summary) = summaries.get_mut(id) {
                for action in derived.iter() {
                    if summary.insert(action.clone()) {
                        changed = true;
                    }
                }
            }
        }
        if !changed {
            break;
        }
    }
    debug!(iterations, "permission inference reached a fixed point");
    summaries
}
