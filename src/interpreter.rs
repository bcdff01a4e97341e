/// The lexer module tokenizes source code for further parsing.
///
/// The lexer reads raw source text and produces tokens for keywords,
/// identifiers, literals, operators and brackets, each tagged with its source
/// position. Line breaks are tokens of their own because they separate
/// statements.
///
/// # Responsibilities
/// - Converts the input character stream into tokens with kind, text and
///   position.
/// - Drops whitespace and comments.
/// - Turns unrecognized characters into illegal tokens instead of failing.
pub mod lexer;
/// A cursor over tokens with bounded lookahead.
///
/// The tape hides whether tokens were lexed up front or are still arriving
/// from a producer, and resynchronizes after syntax errors.
pub mod tape;
/// The parser module builds the abstract syntax tree (AST) from tokens.
///
/// Statements are parsed by recursive descent, expressions and types by
/// precedence climbing over tables of prefix and infix rules.
///
/// # Responsibilities
/// - Converts tokens into statements, expressions and type annotations.
/// - Resolves the group / function literal ambiguity by lookahead.
/// - Collects syntax errors per statement and keeps going.
pub mod parser;
/// The executable form of a program.
pub mod command;
/// Translates the AST into commands.
///
/// Operators become method calls, tail `if`s become conditional expressions
/// and code after a `return` is dropped.
pub mod lowering;
/// Runtime types and the acceptance relation between them.
pub mod types;
/// The value module defines the runtime data types for evaluation.
///
/// This module declares the values programs compute with: integers, floats,
/// strings, booleans, functions, struct instances, collections and maps.
///
/// # Responsibilities
/// - Defines the `Value` enum and its shared payloads.
/// - Computes the runtime type of a value.
/// - Renders values for output.
pub mod value;
/// Lexical scopes and the pool they are recycled through.
pub mod context;
/// The evaluator module executes commands and computes results.
///
/// # Responsibilities
/// - Executes every command kind against a scope chain.
/// - Dispatches operators and methods through the type system.
/// - Reports runtime errors such as type mismatches or unknown names.
pub mod evaluator;
/// Lexing and parsing as cooperating tasks.
///
/// Tokens flow from a producer thread to the parser through a queue; parsed
/// statements and syntax errors flow out through two more, drained by
/// collectors that are joined before the parse completes.
pub mod pipeline;
