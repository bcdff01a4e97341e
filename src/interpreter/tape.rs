use std::sync::{Arc, mpsc::Receiver};

use tracing::trace;

use crate::{
    error::SyntaxError,
    interpreter::lexer::{Position, Token, TokenKind},
};

/// Where the tape gets tokens it has not materialized yet.
enum Feed {
    /// Every token is already in the buffer.
    Materialized,
    /// Tokens arrive from a producer running on another thread.
    Channel(Receiver<Token>),
}

/// A cursor over a token sequence with bounded lookahead.
///
/// The tape abstracts over two backing modes. In batch mode every token is
/// materialized up front. In incremental mode tokens arrive over a channel;
/// looking past the materialized tail blocks until the producer supplies more
/// tokens or hangs up, at which point an end-of-input token is appended.
///
/// The tape never advances past its final [`TokenKind::Eof`] token: peeking
/// beyond it keeps returning that token.
///
/// # Example
/// ```
/// use kiln::interpreter::{
///     lexer::{TokenKind, TokenStream},
///     tape::TokenTape,
/// };
///
/// let mut tape = TokenTape::from_tokens(TokenStream::tokenize("demo", "a + b"));
///
/// assert_eq!(tape.peek(1).kind, TokenKind::Plus);
/// assert!(tape.matches(&[TokenKind::Identifier]));
/// assert!(tape.consume(&[TokenKind::Plus], "'+'").is_ok());
/// assert!(tape.consume(&[TokenKind::Int], "a number").is_err());
/// ```
pub struct TokenTape {
    buffer:  Vec<Token>,
    cursor:  usize,
    feed:    Feed,
    source:  Arc<str>,
    nesting: usize,
}

impl TokenTape {
    /// Creates a tape over an already materialized token sequence.
    ///
    /// An end-of-input token is appended if the sequence lacks one.
    #[must_use]
    pub fn from_tokens(mut tokens: Vec<Token>) -> Self {
        let source = tokens.first()
                           .map_or_else(|| Arc::from(""), |t| Arc::clone(&t.position.source));
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let eof = eof_after(tokens.last(), &source);
            tokens.push(eof);
        }
        Self { buffer: tokens,
               cursor: 0,
               feed: Feed::Materialized,
               source,
               nesting: 0 }
    }

    /// Creates a tape fed incrementally by a token producer.
    #[must_use]
    pub fn from_receiver(receiver: Receiver<Token>, source_name: &str) -> Self {
        Self { buffer:  Vec::new(),
               cursor:  0,
               feed:    Feed::Channel(receiver),
               source:  Arc::from(source_name),
               nesting: 0, }
    }

    /// Makes sure the buffer holds at least `len` tokens, or ends in `Eof`.
    fn fill(&mut self, len: usize) {
        while self.buffer.len() < len {
            if self.buffer.last().is_some_and(|t| t.kind == TokenKind::Eof) {
                return;
            }
            let next = match &self.feed {
                Feed::Materialized => None,
                Feed::Channel(receiver) => receiver.recv().ok(),
            };
            match next {
                Some(token) => {
                    trace!(kind = ?token.kind, line = token.position.line, "token arrived");
                    self.buffer.push(token);
                },
                None => {
                    let eof = eof_after(self.buffer.last(), &self.source);
                    self.buffer.push(eof);
                    self.feed = Feed::Materialized;
                },
            }
        }
    }

    /// Returns the token `n` positions ahead of the cursor without consuming
    /// anything. `peek(0)` is the current token.
    pub fn peek(&mut self, n: usize) -> &Token {
        self.fill(self.cursor + n + 1);
        let index = (self.cursor + n).min(self.buffer.len() - 1);
        &self.buffer[index]
    }

    /// Returns the current token.
    pub fn current(&mut self) -> &Token {
        self.peek(0)
    }

    /// Returns `true` if the current token has the given kind.
    pub fn check(&mut self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    /// Consumes and returns the current token.
    pub fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if token.kind != TokenKind::Eof {
            self.cursor += 1;
        }
        token
    }

    /// Consumes the current token if its kind is one of `kinds`, failing with
    /// a [`SyntaxError`] otherwise.
    ///
    /// `expected` describes the wanted tokens for the error message.
    pub fn consume(&mut self, kinds: &[TokenKind], expected: &str) -> Result<Token, SyntaxError> {
        let token = self.current().clone();
        if kinds.contains(&token.kind) {
            return Ok(self.advance());
        }
        Err(unexpected(token, expected))
    }

    /// Consumes the current token if its kind is one of `kinds`. Returns
    /// whether the tape advanced.
    pub fn matches(&mut self, kinds: &[TokenKind]) -> bool {
        if kinds.contains(&self.current().kind) {
            self.advance();
            return true;
        }
        false
    }

    /// Skips any number of line breaks.
    pub fn skip_newlines(&mut self) {
        while self.matches(&[TokenKind::NewLine]) {}
    }

    /// Runs `parse` inside a bracket pair, where line breaks do not end an
    /// expression.
    pub fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> T) -> T {
        self.nesting += 1;
        let result = parse(self);
        self.nesting -= 1;
        result
    }

    /// Runs `parse` inside braces: line breaks separate statements again,
    /// even when the braces sit inside brackets.
    pub fn unnested<T>(&mut self, parse: impl FnOnce(&mut Self) -> T) -> T {
        let saved = std::mem::replace(&mut self.nesting, 0);
        let result = parse(self);
        self.nesting = saved;
        result
    }

    /// Returns `true` while parsing between brackets.
    #[must_use]
    pub const fn is_nested(&self) -> bool {
        self.nesting > 0
    }

    /// Returns the index of the current token, for use with
    /// [`TokenTape::synchronize`].
    #[must_use]
    pub const fn mark(&self) -> usize {
        self.cursor
    }

    /// Discards tokens after a syntax error until the statement that started
    /// at `statement_start` is over.
    ///
    /// Brackets opened since the start of the statement are tracked, so the
    /// tape stops at the first line break (or end of input) that is not
    /// nested inside the failed statement. The line break is consumed.
    pub fn synchronize(&mut self, statement_start: usize) {
        let mut depth = self.buffer[statement_start..self.cursor].iter()
                                                                  .map(|t| bracket_delta(t.kind))
                                                                  .sum::<i64>();
        loop {
            let kind = self.current().kind;
            match kind {
                TokenKind::Eof => return,
                TokenKind::NewLine if depth <= 0 => {
                    self.advance();
                    return;
                },
                _ => {
                    depth += bracket_delta(kind);
                    self.advance();
                },
            }
        }
    }
}

const fn bracket_delta(kind: TokenKind) -> i64 {
    match kind {
        TokenKind::LParen | TokenKind::LBrace | TokenKind::LBracket => 1,
        TokenKind::RParen | TokenKind::RBrace | TokenKind::RBracket => -1,
        _ => 0,
    }
}

/// Builds the error for an unexpected token, distinguishing end of input.
pub(crate) fn unexpected(token: Token, expected: &str) -> SyntaxError {
    match token.kind {
        TokenKind::Eof => SyntaxError::UnexpectedEndOfInput { token,
                                                              expected: expected.to_string() },
        TokenKind::Illegal => SyntaxError::IllegalCharacter { token },
        _ => SyntaxError::UnexpectedToken { token,
                                            expected: expected.to_string() },
    }
}

fn eof_after(last: Option<&Token>, source: &Arc<str>) -> Token {
    let position = last.map_or_else(|| Position { source: Arc::clone(source),
                                                  line:   1,
                                                  column: 0, },
                                    |t| {
                                        if t.kind == TokenKind::NewLine {
                                            Position { source: Arc::clone(&t.position.source),
                                                       line:   t.position.line + 1,
                                                       column: 0, }
                                        } else {
                                            Position { column: t.position.column
                                                               + t.literal.chars().count(),
                                                       ..t.position.clone() }
                                        }
                                    });
    Token { kind: TokenKind::Eof,
            literal: String::new(),
            position }
}
