//! The config-file surface for ward.
//!
//! A config file declares which permissions exist, which are implicit,
//! which restrictions relate them, and which functions are under
//! enforcement:
//!
//! ```text
//! lock "permission to take the lock"
//!   -> !locked "cannot take the lock recursively";
//! implicit gc_safe;
//! enforce "public.h";
//! ```
//!
//! Parsing is a logos lexer plus a hand-written recursive-descent parser;
//! both report 1-based line numbers. Errors here are setup-fatal for the
//! pipeline.

use thiserror::Error;

pub mod lexer;
pub mod parser;

pub use parser::parse_config;

/// Failure to read a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("line {line}: unrecognized input '{text}'")]
    Lex { line: u32, text: String },
    #[error("line {line}: {message}")]
    Parse { line: u32, message: String },
}
