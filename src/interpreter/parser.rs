/// Program-level parsing.
///
/// Drives statement parsing over a token tape, collecting syntax errors and
/// resynchronizing after each one.
pub mod core;

/// Expression parsing.
///
/// Precedence climbing over prefix and infix parse rules, including the
/// lookahead that separates grouped expressions from function literals.
pub mod expression;

/// Statement parsing.
///
/// Declarations, control flow, struct definitions, extensions, namespaces,
/// assignments and expression statements.
pub mod statement;

/// Type parsing.
///
/// Named, contractual, collection, map, function and algebraic types.
pub mod types;

/// Shared parsing helpers.
///
/// Precedence levels, operator mapping, list and block parsing, literal
/// decoding.
pub mod utils;
