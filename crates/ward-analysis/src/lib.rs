//! The ward lattice engine.
//!
//! Consumes the whole-program call map and the merged config, runs the
//! fixed-point permission inference, and streams findings through the
//! diagnostics channel:
//!
//! 1. compute function summaries to a fixed point (`infer`);
//! 2. re-walk every defined function with its declared seeding and report
//!    requirement failures and capability conflicts;
//! 3. evaluate restrictions against exit states and enforcement rules
//!    against inferred action sets (`check`).

use tracing::info;

use ward_callmap::CallMap;
use ward_core::{Action, Config, Entry};

pub mod check;
pub mod infer;
pub mod report;

pub use report::{channel, Message, Reporter};

/// Run the full analysis over a call map, emitting diagnostics.
///
/// The caller owns the channel: structural warnings from map construction
/// should already have been sent, and [`Reporter::finish`] is the
/// caller's responsibility (the CLI sends the terminator once analysis
/// and dumping are done).
pub fn run_analysis(map: &CallMap, config: &Config, reporter: &Reporter) {
    let summaries = infer::compute_summaries(map, config);
    info!(functions = map.len(), "analyzing call map");

    for (id, entry) in map.iter() {
        let Some(body) = &entry.body else {
            continue;
        };
        reporter.send(Entry::Note(
            entry.pos.clone(),
            format!("checking '{}'", id.name),
        ));

        let summary = match summaries.get(id) {
            Some(summary) => summary.clone(),
            None => continue,
        };

        // Reporting walk: declared promises seed the entry, derived
        // effects join in, derived requirements do not.
        let declared = infer::declared_with_implicit(&entry.actions, config);
        let entry_state = infer::report_entry_state(&declared, &summary);
        let (exit, events) = infer::walk(&summaries, body, &entry_state, &entry.pos);

        for failure in &events.failures {
            reporter.send(Entry::Error(failure.pos.clone(), failure_text(failure)));
        }
        for (permission, pos) in &events.conflicts {
            reporter.send(Entry::Error(
                pos.clone(),
                format!(
                    "conflicting state for permission '{permission}': held on one path, not held on another"
                ),
            ));
        }

        // Derivation walk: what the body actually demands and does,
        // independent of declared requirements.
        let effects_state = infer::seed_effects(&summary);
        let (derived_exit, derived_events) =
            infer::walk(&summaries, body, &effects_state, &entry.pos);
        let inferred = infer::derive_actions(
            &effects_state,
            &derived_exit,
            &derived_events.bottom_requirements,
        );

        check::check_restrictions(config, id, &entry.pos, &exit, reporter);
        check::check_enforcement(config, id, entry, &inferred, reporter);
    }
}

fn failure_text(failure: &infer::Failure) -> String {
    let permission = failure.action.name();
    let callee = &failure.callee;
    match failure.action {
        Action::Need(_) | Action::Use(_) => {
            format!("need permission '{permission}' because of call to '{callee}'")
        }
        Action::Grant(_) => format!(
            "cannot grant permission '{permission}' already held, because of call to '{callee}'"
        ),
        Action::Revoke(_) => format!(
            "cannot revoke permission '{permission}' that is not held, because of call to '{callee}'"
        ),
        Action::Deny(_) => {
            format!("permission '{permission}' is denied by call to '{callee}'")
        }
        Action::Waive(_) => {
            // Waive carries no pre-requirement; kept for exhaustiveness.
            format!("unexpected waive of '{permission}' at call to '{callee}'")
        }
    }
}
