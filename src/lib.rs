//! # kiln
//!
//! kiln is a small general-purpose scripting language written in Rust.
//! Source text is tokenized, parsed by a Pratt parser, lowered to commands
//! and run by a tree-walking evaluator with a structural type system,
//! lexical scopes and open type extension.

#![warn(
    clippy::redundant_clone,
    clippy::needless_pass_by_value,
    clippy::similar_names,
    clippy::large_enum_variant,
    clippy::string_lit_as_bytes,
    clippy::match_same_arms,
    clippy::cargo,
    clippy::nursery,
    clippy::perf,
    clippy::style,
    clippy::suspicious,
    clippy::correctness,
    clippy::complexity,
    clippy::pedantic,
    //missing_docs,
)]
#![allow(clippy::missing_errors_doc)]

use crate::{
    error::ExecuteError,
    session::{ExecutionReport, Session},
};

/// Defines the structure of parsed code.
///
/// This module declares the statement, expression and type annotation trees
/// the parser produces. Every node renders to a fully parenthesized string.
///
/// # Responsibilities
/// - Defines node types for all language constructs.
/// - Attaches line numbers to nodes for error reporting.
pub mod ast;
/// Provides unified error types for parsing and evaluation.
///
/// This module defines the two error taxonomies, syntax and runtime, and the
/// errors of the entry points built on them. Every error carries its source
/// location.
pub mod error;
/// Orchestrates the entire process of code execution.
///
/// This module ties together lexing, parsing, lowering and evaluation.
///
/// # Responsibilities
/// - Coordinates all core components: lexer, parser, lowering, type system
///   and evaluator.
/// - Manages the flow of data and errors between phases.
pub mod interpreter;
/// Pre-loading of library sources.
pub mod library;
/// Persistent sessions that keep their global scope between units.
pub mod session;
/// General utilities for safe numeric conversion.
///
/// # Responsibilities
/// - Safely convert between `i64`, `usize` and `f64` without silent data
///   loss.
pub mod util;

/// Lexes, parses and runs one source unit in a fresh session.
///
/// Returns one value per top-level statement together with the time spent in
/// each stage. In script mode the value of every statement is also written
/// to standard output.
///
/// # Errors
/// Returns an error if the unit has syntax errors, in which case nothing
/// runs, or if execution stops at a runtime error.
///
/// # Examples
/// ```
/// use kiln::{execute, interpreter::value::core::Value};
///
/// let report = execute("demo", "let a = 3\na", false).unwrap();
/// assert_eq!(report.results, vec![Value::Unit, Value::Int(3)]);
///
/// // 'x' is not defined
/// assert!(execute("demo", "let y = x + 1", false).is_err());
/// ```
pub fn execute(source_name: &str, source: &str, script_mode: bool) -> Result<ExecutionReport, ExecuteError> {
    Session::new()?.execute(source_name, source, script_mode)
}
