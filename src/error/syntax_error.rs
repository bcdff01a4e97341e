use thiserror::Error;

use crate::interpreter::lexer::Token;

/// Represents all errors that can occur while parsing a token stream.
///
/// Every variant carries the offending [`Token`], so the caller can point at
/// the exact source position. Syntax errors are collected rather than
/// propagated: the parser records one, resynchronizes at the next statement
/// boundary and keeps going.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyntaxError {
    /// Found a token that cannot appear at this point.
    #[error("Error at {}: Unexpected token {}, expected {expected}.", .token.position, .token)]
    UnexpectedToken {
        /// The token encountered.
        token:    Token,
        /// A description of what the parser was looking for.
        expected: String,
    },
    /// The lexer could not make sense of a character.
    #[error("Error at {}: Illegal character {}.", .token.position, .token)]
    IllegalCharacter {
        /// The illegal token produced by the lexer.
        token: Token,
    },
    /// Reached the end of input in the middle of a construct.
    #[error("Error at {}: Unexpected end of input, expected {expected}.", .token.position)]
    UnexpectedEndOfInput {
        /// The end-of-file token.
        token:    Token,
        /// A description of what the parser was looking for.
        expected: String,
    },
    /// A numeric literal does not fit its type.
    #[error("Error at {}: Literal {} is out of range.", .token.position, .token)]
    LiteralOutOfRange {
        /// The literal token.
        token: Token,
    },
    /// The left-hand side of `=` is not something that can be assigned.
    #[error("Error at {}: Invalid assignment target.", .token.position)]
    InvalidAssignmentTarget {
        /// The `=` token.
        token: Token,
    },
    /// Some other syntax error, with a custom message.
    #[error("Error at {}: {message}", .token.position)]
    Other {
        /// The token the error is attached to.
        token:   Token,
        /// Details about the syntax error.
        message: String,
    },
}

impl SyntaxError {
    /// Returns the token the error is attached to.
    #[must_use]
    pub const fn token(&self) -> &Token {
        match self {
            Self::UnexpectedToken { token, .. }
            | Self::IllegalCharacter { token }
            | Self::UnexpectedEndOfInput { token, .. }
            | Self::LiteralOutOfRange { token }
            | Self::InvalidAssignmentTarget { token }
            | Self::Other { token, .. } => token,
        }
    }
}
