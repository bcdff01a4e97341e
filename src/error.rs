/// Syntax errors.
///
/// Defines all error types that can occur while parsing source code. A syntax
/// error never aborts the whole parse; it is collected together with the
/// statements that did parse.
pub mod syntax_error;
/// Runtime errors.
///
/// Contains all error types that can be raised during evaluation. Runtime
/// errors include unresolved names, type mismatches, immutability violations
/// and invalid operations.
pub mod runtime_error;

use std::path::PathBuf;

pub use runtime_error::RuntimeError;
pub use syntax_error::SyntaxError;
use thiserror::Error;

/// Errors surfaced by [`crate::execute`] and [`crate::session::Session`].
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// The unit did not parse; it was not executed.
    #[error("{} syntax error(s) in '{source_name}':\n{}", .errors.len(), render_all(.errors))]
    Syntax {
        /// The unit that failed to parse.
        source_name: String,
        /// Every collected syntax error, in source order.
        errors:      Vec<SyntaxError>,
    },
    /// Execution stopped at a runtime error.
    #[error("{0}")]
    Runtime(#[from] RuntimeError),
}

/// Errors raised while pre-loading a library directory.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// Walking the library root failed.
    #[error("Failed to walk library root: {0}")]
    Walk(#[from] walkdir::Error),
    /// A library file could not be read.
    #[error("Failed to read '{}': {source}", .path.display())]
    Io {
        /// The file that could not be read.
        path:   PathBuf,
        /// The underlying IO error.
        source: std::io::Error,
    },
    /// Library units import each other in a cycle.
    #[error("Import cycle between namespaces: {}", .namespaces.join(", "))]
    ImportCycle {
        /// The namespaces taking part in the cycle.
        namespaces: Vec<String>,
    },
    /// A library unit failed to parse or run.
    #[error("Failed to load '{}': {source}", .path.display())]
    Execute {
        /// The failing unit.
        path:   PathBuf,
        /// What went wrong.
        source: ExecuteError,
    },
}

fn render_all(errors: &[SyntaxError]) -> String {
    errors.iter()
          .map(ToString::to_string)
          .collect::<Vec<_>>()
          .join("\n")
}
