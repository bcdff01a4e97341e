/// Core evaluation logic.
///
/// Contains the evaluator, the three-way evaluation result and the execution
/// of every command kind, including name resolution and scope handling.
pub mod core;

/// Function invocation.
///
/// Calls closures, natives, constructors and receiver-bound methods, and
/// performs `as` conversions.
pub mod invoke;

/// Native functions.
///
/// The table of methods installed on the built-in types and the global
/// functions available to every program.
pub mod builtin;
