//! Input loading: config files, C translation units, graph units.

use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::info;

use ward_callmap::{build_call_map, graph, map::merge_call_map, CallMap, ParsedUnit};
use ward_callmap::{CallMapUnitParseError, MultipleDefinitionsError};
use ward_config::ConfigError;
use ward_core::{Config, Entry};

use crate::args::Cli;

/// Fatal setup failures: everything that aborts before analysis starts.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("no translation units given")]
    NoInputs,
    #[error("cannot read '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("config '{path}': {source}")]
    Config {
        path: String,
        source: ConfigError,
    },
    #[error("cannot parse '{path}': {detail}")]
    Parse { path: String, detail: String },
    #[error(transparent)]
    CallMapUnit(#[from] CallMapUnitParseError),
    #[error(transparent)]
    MultipleDefinitions(#[from] MultipleDefinitionsError),
    #[error("cannot serialize call graph: {0}")]
    GraphDump(#[from] serde_json::Error),
}

/// Read and merge all `--config` files in order.
pub fn load_config(paths: &[std::path::PathBuf]) -> Result<Config, SetupError> {
    let mut config = Config::new();
    for path in paths {
        let display = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|source| SetupError::Read {
            path: display.clone(),
            source,
        })?;
        let parsed = ward_config::parse_config(&text).map_err(|source| SetupError::Config {
            path: display,
            source,
        })?;
        config.merge(parsed);
    }
    Ok(config)
}

/// Parse every input into the merged whole-program call map.
///
/// `.json` inputs load as callmap graph units; everything else runs
/// through the preprocessor and the C parser.
pub fn load_call_map(cli: &Cli) -> Result<(CallMap, Vec<Entry>), SetupError> {
    if cli.inputs.is_empty() {
        return Err(SetupError::NoInputs);
    }

    let parser_config = parser_config(cli);
    let mut units = Vec::new();
    let mut graph_units = Vec::new();

    for path in &cli.inputs {
        let unit_path = path.display().to_string();
        if is_graph_unit(path) {
            let text = fs::read_to_string(path).map_err(|source| SetupError::Read {
                path: unit_path.clone(),
                source,
            })?;
            graph_units.push(graph::parse_unit(&unit_path, &text)?);
            continue;
        }

        info!(unit = %unit_path, "parsing translation unit");
        let parse = lang_c::driver::parse(&parser_config, path).map_err(|err| {
            SetupError::Parse {
                path: unit_path.clone(),
                detail: parse_error_text(err),
            }
        })?;
        units.push(ParsedUnit::new(unit_path, parse.unit, &parse.source));
    }

    let (mut map, warnings) = build_call_map(&units)?;
    for unit in graph_units {
        merge_call_map(&mut map, unit)?;
    }
    Ok((map, warnings))
}

/// The lang_c driver configuration: GNU flavor, user-selected
/// preprocessor, passthrough flags appended.
fn parser_config(cli: &Cli) -> lang_c::driver::Config {
    let mut config = lang_c::driver::Config::with_gcc();
    config.cpp_command = cli.preprocessor.clone();
    config
        .cpp_options
        .extend(cli.preprocessor_flags.iter().cloned());
    config
}

fn parse_error_text(err: lang_c::driver::Error) -> String {
    match err {
        lang_c::driver::Error::PreprocessorError(source) => {
            format!("preprocessor failed: {source}")
        }
        lang_c::driver::Error::SyntaxError(syntax) => syntax.to_string(),
    }
}

/// Does a path name a graph unit rather than C source?
pub fn is_graph_unit(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_unit_detection() {
        assert!(is_graph_unit(Path::new("dump.json")));
        assert!(!is_graph_unit(Path::new("a.c")));
        assert!(!is_graph_unit(Path::new("json")));
    }
}
