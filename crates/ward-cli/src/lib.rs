//! The ward pipeline: load inputs, run the analysis worker, drain the
//! diagnostics channel, format, and compute the exit code.

use std::thread;

use tracing::debug;

use ward_callmap::graph;
use ward_core::Entry;

pub mod args;
pub mod driver;
pub mod output;

pub use args::{Cli, OutputMode, RunAction};
pub use driver::SetupError;

/// Exit code when at least one `Error` entry was emitted.
pub const EXIT_FINDINGS: i32 = 1;
/// Exit code for setup failures (parse errors, bad config, bad inputs).
pub const EXIT_SETUP: i32 = 2;

/// Run ward. Returns the process exit code; setup failures surface as
/// `Err` and map to [`EXIT_SETUP`] in `main`.
pub fn run(cli: Cli) -> Result<i32, SetupError> {
    let config = driver::load_config(&cli.config)?;
    let (map, warnings) = driver::load_call_map(&cli)?;

    match cli.action {
        RunAction::Graph => {
            print!("{}", graph::dump(&map)?);
            Ok(0)
        }
        RunAction::Analysis => Ok(analyze(cli.mode, map, config, warnings)),
    }
}

/// Spawn the analysis worker and drain the diagnostics channel on the
/// calling thread until the terminator arrives.
fn analyze(
    mode: OutputMode,
    map: ward_callmap::CallMap,
    config: ward_core::Config,
    warnings: Vec<Entry>,
) -> i32 {
    let (reporter, rx) = ward_analysis::channel();

    let worker = thread::spawn(move || {
        reporter.send_all(warnings);
        ward_analysis::run_analysis(&map, &config, &reporter);
        reporter.finish();
    });

    let mut warning_count = 0usize;
    let mut error_count = 0usize;

    if let Some(text) = output::header(mode) {
        println!("{text}");
    }
    for message in rx {
        let Some(entry) = message else {
            break;
        };
        if entry.is_warning() {
            warning_count += 1;
        }
        if entry.is_error() {
            error_count += 1;
        }
        if let Some(line) = output::format_entry(mode, &entry) {
            println!("{line}");
        }
    }
    println!("{}", output::footer(mode, warning_count, error_count));

    if worker.join().is_err() {
        debug!("analysis worker panicked");
        return EXIT_SETUP;
    }

    if error_count > 0 {
        EXIT_FINDINGS
    } else {
        0
    }
}
