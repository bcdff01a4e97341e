use crate::{
    ast::{BinaryOperator, Block, Statement},
    error::SyntaxError,
    interpreter::{
        lexer::{Token, TokenKind},
        parser::{core::ParseResult, statement::parse_statement},
        tape::{TokenTape, unexpected},
    },
};

/// Binding power of infix forms, lowest first.
///
/// Every infix rule is left-associative: the right operand is parsed with the
/// operator's own precedence as the threshold, so an operator of equal
/// precedence ends the operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    /// Entry level; every infix form binds tighter.
    Lowest,
    /// `||`
    Or,
    /// `&&`
    And,
    /// `==`, `!=`, `<`, `>`, `<=`, `>=`
    Comparison,
    /// `is`, `as`
    TypeTest,
    /// `+`, `-`
    Sum,
    /// `*`, `/`
    Product,
    /// Prefix `-` and `!`.
    Prefix,
    /// Call, index and property access.
    Postfix,
}

/// Maps a token kind to the binary operator it spells, if any.
///
/// # Example
/// ```
/// use kiln::{
///     ast::BinaryOperator,
///     interpreter::{lexer::TokenKind, parser::utils::binary_operator},
/// };
///
/// assert_eq!(binary_operator(TokenKind::LessEqual), Some(BinaryOperator::LessEqual));
/// assert_eq!(binary_operator(TokenKind::Dot), None);
/// ```
#[must_use]
pub const fn binary_operator(kind: TokenKind) -> Option<BinaryOperator> {
    let op = match kind {
        TokenKind::Plus => BinaryOperator::Add,
        TokenKind::Minus => BinaryOperator::Sub,
        TokenKind::Star => BinaryOperator::Mul,
        TokenKind::Slash => BinaryOperator::Div,
        TokenKind::EqualEqual => BinaryOperator::Equal,
        TokenKind::BangEqual => BinaryOperator::NotEqual,
        TokenKind::Less => BinaryOperator::Less,
        TokenKind::Greater => BinaryOperator::Greater,
        TokenKind::LessEqual => BinaryOperator::LessEqual,
        TokenKind::GreaterEqual => BinaryOperator::GreaterEqual,
        TokenKind::AndAnd => BinaryOperator::And,
        TokenKind::OrOr => BinaryOperator::Or,
        _ => return None,
    };
    Some(op)
}

/// Returns the precedence of a binary operator.
#[must_use]
pub const fn binary_precedence(op: BinaryOperator) -> Precedence {
    match op {
        BinaryOperator::Or => Precedence::Or,
        BinaryOperator::And => Precedence::And,
        BinaryOperator::Equal
        | BinaryOperator::NotEqual
        | BinaryOperator::Less
        | BinaryOperator::Greater
        | BinaryOperator::LessEqual
        | BinaryOperator::GreaterEqual => Precedence::Comparison,
        BinaryOperator::Add | BinaryOperator::Sub => Precedence::Sum,
        BinaryOperator::Mul | BinaryOperator::Div => Precedence::Product,
    }
}

/// Decides whether the parenthesis just consumed opens a parameter list.
///
/// Scans forward from the current token, tracking nesting depth, to the
/// matching `)`. The parenthesis starts a function (literal or type) when
/// that `)` is immediately followed by `=>`, or, if `named_return` is set, by
/// an identifier and then `=>`. Nothing is consumed.
pub(in crate::interpreter::parser) fn arrow_follows_group(tape: &mut TokenTape,
                                                          named_return: bool)
                                                          -> bool {
    let mut depth = 1usize;
    let mut offset = 0;
    loop {
        match tape.peek(offset).kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            },
            TokenKind::Eof => return false,
            _ => {},
        }
        offset += 1;
    }

    match tape.peek(offset + 1).kind {
        TokenKind::Arrow => true,
        TokenKind::Identifier if named_return => tape.peek(offset + 2).kind == TokenKind::Arrow,
        _ => false,
    }
}

/// Parses items separated by commas up to and including `closing`.
///
/// Line breaks between items are ignored, so long argument lists and
/// literals may span lines. An immediately encountered `closing` yields an
/// empty list.
///
/// # Errors
/// Returns a [`SyntaxError`] if an item fails to parse or a token other than
/// `,` or `closing` follows an item.
pub(in crate::interpreter::parser) fn parse_comma_separated<T>(
    tape: &mut TokenTape,
    parse_item: impl Fn(&mut TokenTape) -> ParseResult<T>,
    closing: TokenKind)
    -> ParseResult<Vec<T>> {
    let mut items = Vec::new();
    tape.skip_newlines();
    if tape.matches(&[closing]) {
        return Ok(items);
    }
    let expected = format!("',' or {closing}");
    loop {
        items.push(parse_item(tape)?);
        tape.skip_newlines();
        let token = tape.consume(&[TokenKind::Comma, closing], &expected)?;
        if token.is(closing) {
            return Ok(items);
        }
        tape.skip_newlines();
    }
}

/// Consumes an identifier and returns its text.
pub(in crate::interpreter::parser) fn parse_identifier(tape: &mut TokenTape,
                                                       expected: &str)
                                                       -> ParseResult<String> {
    Ok(tape.consume(&[TokenKind::Identifier], expected)?.literal)
}

/// Fails unless the current token ends a statement: a line break, the end of
/// input, or the `}` closing the enclosing block. Nothing is consumed.
pub(in crate::interpreter::parser) fn expect_terminator(tape: &mut TokenTape) -> ParseResult<()> {
    match tape.current().kind {
        TokenKind::NewLine | TokenKind::Eof | TokenKind::RBrace => Ok(()),
        _ => Err(unexpected(tape.current().clone(), "end of statement")),
    }
}

/// Parses a branch or function body: a braced block or `=>` followed by a
/// single statement.
///
/// With `arrow_consumed` set, the `=>` has already been read and the body
/// may be either form.
pub(in crate::interpreter::parser) fn parse_body(tape: &mut TokenTape,
                                                 arrow_consumed: bool)
                                                 -> ParseResult<Block> {
    if !arrow_consumed && tape.matches(&[TokenKind::Arrow]) {
        return parse_body(tape, true);
    }
    if tape.check(TokenKind::LBrace) {
        let open = tape.advance();
        return parse_block(tape, &open);
    }
    if !arrow_consumed {
        return Err(unexpected(tape.current().clone(), "'=>' or '{'"));
    }
    let statement = parse_statement(tape)?;
    Ok(Block { line:       statement.line_number(),
               statements: vec![statement], })
}

/// Parses the statements of a block whose `{` has been consumed, up to and
/// including the closing `}`.
pub(in crate::interpreter::parser) fn parse_block(tape: &mut TokenTape,
                                                  open: &Token)
                                                  -> ParseResult<Block> {
    tape.unnested(|tape| parse_statements(tape, open))
}

fn parse_statements(tape: &mut TokenTape, open: &Token) -> ParseResult<Block> {
    let mut statements: Vec<Statement> = Vec::new();
    loop {
        tape.skip_newlines();
        if tape.matches(&[TokenKind::RBrace]) {
            break;
        }
        if tape.check(TokenKind::Eof) {
            return Err(unexpected(tape.current().clone(), "'}'"));
        }
        statements.push(parse_statement(tape)?);
        expect_terminator(tape)?;
    }
    Ok(Block { statements,
               line: open.position.line })
}

/// Resolves the escapes of a string literal and strips its quotes.
///
/// An unterminated literal (no closing quote) runs to the end of its text.
///
/// # Example
/// ```
/// use kiln::interpreter::parser::utils::decode_string;
///
/// assert_eq!(decode_string(r#""a\"b\n""#), "a\"b\n");
/// assert_eq!(decode_string(r#""open"#), "open");
/// ```
#[must_use]
pub fn decode_string(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    let mut chars = literal.chars().skip(1);
    while let Some(c) = chars.next() {
        match c {
            '"' => break,
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            },
            c => out.push(c),
        }
    }
    out
}

/// Converts an integer literal token, reporting literals that overflow.
pub(in crate::interpreter::parser) fn int_literal(token: &Token) -> ParseResult<i64> {
    token.literal
         .parse::<i64>()
         .map_err(|_| SyntaxError::LiteralOutOfRange { token: token.clone() })
}

/// Converts a float literal token.
pub(in crate::interpreter::parser) fn float_literal(token: &Token) -> ParseResult<f64> {
    match token.literal.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(SyntaxError::LiteralOutOfRange { token: token.clone() }),
    }
}
