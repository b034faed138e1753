//! Command-line surface.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Static permission checker for C programs.
#[derive(Parser, Debug)]
#[command(name = "ward")]
#[command(about = "Check permission annotations across C translation units")]
pub struct Cli {
    /// Translation-unit paths. A path ending in `.json` is loaded as a
    /// callmap graph unit instead of C source.
    #[arg(required = true, value_name = "UNIT")]
    pub inputs: Vec<PathBuf>,

    /// Config files, merged in order.
    #[arg(long = "config", value_name = "PATH")]
    pub config: Vec<PathBuf>,

    /// Preprocessor executable used to expand translation units.
    #[arg(long, default_value = "gcc", value_name = "PATH")]
    pub preprocessor: String,

    /// Flag passed through to the preprocessor (repeatable).
    #[arg(short = 'P', value_name = "FLAG", allow_hyphen_values = true)]
    pub preprocessor_flags: Vec<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputMode::Compiler)]
    pub mode: OutputMode,

    /// Run the analysis, or dump the call graph and exit.
    #[arg(long, value_enum, default_value_t = RunAction::Analysis)]
    pub action: RunAction,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// One `path:line: kind: text` line per finding.
    Compiler,
    /// An HTML list of findings.
    Html,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunAction {
    /// Full permission analysis.
    Analysis,
    /// Serialize the call map as JSON and exit.
    Graph,
}
