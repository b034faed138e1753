//! C ingest for ward.
//!
//! This crate turns parsed translation units (the `lang_c` AST) into the
//! whole-program call map the analysis runs on:
//!
//! - `ident` — function identifiers with static-name disambiguation
//! - `tree` — call trees and call sequences
//! - `source_map` — byte offsets to `path:line`, respecting `# line "file"`
//!   markers in preprocessed sources
//! - `extract` — `ward(action(permission))` attribute extraction
//! - `lower` — lowering of function bodies to call sequences
//! - `map` — name map and call map construction and merging
//! - `graph` — the JSON call-graph dump/input format

pub mod extract;
pub mod graph;
pub mod ident;
pub mod lower;
pub mod map;
pub mod source_map;
pub mod tree;

pub use graph::CallMapUnitParseError;
pub use ident::FunId;
pub use map::{build_call_map, CallMap, CallMapEntry, MultipleDefinitionsError, ParsedUnit};
pub use tree::{CallSeq, CallTree};
