use std::sync::mpsc::Sender;

use tracing::debug;

use crate::{
    ast::Statement,
    error::SyntaxError,
    interpreter::{
        lexer::{TokenKind, TokenStream},
        parser::{statement::parse_statement, utils::expect_terminator},
        tape::{TokenTape, unexpected},
    },
};

pub type ParseResult<T> = Result<T, SyntaxError>;

/// Everything a parse produced: the statements that parsed and the errors
/// collected for the ones that did not, both in source order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ParseOutcome {
    /// Successfully parsed top-level statements.
    pub statements: Vec<Statement>,
    /// One error per failed statement.
    pub errors:     Vec<SyntaxError>,
}

impl ParseOutcome {
    /// Returns `true` if no syntax error was recorded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Statement-level driver over a [`TokenTape`].
///
/// The parser reads top-level statements until end of input. A statement that
/// fails to parse is recorded as a [`SyntaxError`]; the tape is then
/// resynchronized at the next statement boundary and parsing continues, so one
/// error never hides the statements after it.
///
/// # Example
/// ```
/// use kiln::interpreter::parser::core::Parser;
///
/// let outcome = Parser::from_source("demo", "let a = 1 +\nlet b = 2\nb").parse_program();
///
/// assert_eq!(outcome.errors.len(), 1);
/// assert_eq!(outcome.statements.len(), 2);
/// ```
pub struct Parser {
    tape: TokenTape,
}

impl Parser {
    /// Creates a parser reading from `tape`.
    #[must_use]
    pub const fn new(tape: TokenTape) -> Self {
        Self { tape }
    }

    /// Creates a parser over a complete, eagerly lexed source unit.
    #[must_use]
    pub fn from_source(source_name: &str, source: &str) -> Self {
        Self::new(TokenTape::from_tokens(TokenStream::tokenize(source_name, source)))
    }

    /// Parses every statement, collecting the results in memory.
    pub fn parse_program(&mut self) -> ParseOutcome {
        let mut outcome = ParseOutcome::default();
        self.drive(|statement| outcome.statements.push(statement),
                   |error| outcome.errors.push(error));
        outcome
    }

    /// Parses every statement, sending each result down the matching queue.
    ///
    /// Both senders are dropped on return, which closes the queues and
    /// signals completion to whoever drains them.
    pub fn parse_into(mut self, statements: Sender<Statement>, errors: Sender<SyntaxError>) {
        self.drive(|statement| {
                       // A hung-up consumer only loses results it stopped waiting for.
                       let _ = statements.send(statement);
                   },
                   |error| {
                       let _ = errors.send(error);
                   });
    }

    fn drive(&mut self,
             mut on_statement: impl FnMut(Statement),
             mut on_error: impl FnMut(SyntaxError)) {
        let mut parsed = 0usize;
        let mut failed = 0usize;
        loop {
            self.tape.skip_newlines();
            if self.tape.check(TokenKind::Eof) {
                break;
            }
            let start = self.tape.mark();
            match self.parse_top_level() {
                Ok(statement) => {
                    parsed += 1;
                    on_statement(statement);
                },
                Err(error) => {
                    failed += 1;
                    debug!(%error, "statement discarded");
                    on_error(error);
                    self.tape.synchronize(start);
                },
            }
        }
        debug!(parsed, failed, "parse finished");
    }

    fn parse_top_level(&mut self) -> ParseResult<Statement> {
        let statement = parse_statement(&mut self.tape)?;
        if self.tape.check(TokenKind::RBrace) {
            return Err(unexpected(self.tape.current().clone(), "end of statement"));
        }
        expect_terminator(&mut self.tape)?;
        Ok(statement)
    }
}

/// Parses a whole source unit in one go.
///
/// # Example
/// ```
/// use kiln::interpreter::parser::core::parse_source;
///
/// let outcome = parse_source("demo", "let a = 3\na");
///
/// assert!(outcome.is_clean());
/// assert_eq!(outcome.statements[1].to_string(), "a");
/// ```
#[must_use]
pub fn parse_source(source_name: &str, source: &str) -> ParseOutcome {
    Parser::from_source(source_name, source).parse_program()
}
