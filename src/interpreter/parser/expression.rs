use crate::{
    ast::{Expression, FunctionLiteral, Literal, Parameter, UnaryOperator},
    interpreter::{
        lexer::{Token, TokenKind},
        parser::{
            core::ParseResult,
            types::parse_type,
            utils::{
                Precedence, arrow_follows_group, binary_operator, binary_precedence,
                decode_string, float_literal, int_literal, parse_block, parse_body,
                parse_comma_separated, parse_identifier,
            },
        },
        tape::{TokenTape, unexpected},
    },
};

/// A parse rule for a token that can start an expression. It receives the
/// token, already consumed.
type PrefixRule = fn(&mut TokenTape, Token) -> ParseResult<Expression>;

/// A parse rule for a token that continues an expression. It receives the
/// expression parsed so far and the consumed operator token.
type InfixRule = fn(&mut TokenTape, Expression, Token) -> ParseResult<Expression>;

/// Parses an expression whose infix operators all bind tighter than
/// `threshold`.
///
/// This is the precedence-climbing core: one prefix rule produces the left
/// operand, then infix rules fold operators into it for as long as their
/// precedence exceeds the threshold. Each infix rule parses its right operand
/// with its own precedence as the new threshold, which makes every operator
/// left-associative.
///
/// Line breaks end an expression unless they are nested inside brackets, where
/// an operand or operator may continue on the next line.
///
/// # Errors
/// Returns a `SyntaxError` if no prefix rule exists for the first token or if
/// any sub-expression fails to parse.
///
/// # Example
/// ```
/// use kiln::interpreter::{
///     lexer::TokenStream,
///     parser::{expression::parse_expression, utils::Precedence},
///     tape::TokenTape,
/// };
///
/// let mut tape = TokenTape::from_tokens(TokenStream::tokenize("demo", "1 + 2 * 3"));
/// let expr = parse_expression(&mut tape, Precedence::Lowest).unwrap();
///
/// assert_eq!(expr.to_string(), "(1 + (2 * 3))");
/// ```
pub fn parse_expression(tape: &mut TokenTape, threshold: Precedence) -> ParseResult<Expression> {
    if tape.is_nested() {
        tape.skip_newlines();
    }
    // The offending token stays on the tape so recovery sees a failed line
    // break as the end of this statement.
    let Some(prefix) = prefix_rule(tape.current().kind) else {
        return Err(unexpected(tape.current().clone(), "an expression"));
    };
    let token = tape.advance();
    let mut left = prefix(tape, token)?;

    loop {
        if tape.is_nested() && continues_after_newlines(tape) {
            tape.skip_newlines();
        }
        let Some((precedence, infix)) = infix_rule(tape.current().kind) else {
            break;
        };
        if precedence <= threshold {
            break;
        }
        let operator = tape.advance();
        left = infix(tape, left, operator)?;
    }
    Ok(left)
}

/// Returns `true` if the current token is a line break and the first token
/// after the run of line breaks is an operator. Calls and indexing never
/// continue across a line.
fn continues_after_newlines(tape: &mut TokenTape) -> bool {
    let mut offset = 0;
    while tape.peek(offset).is(TokenKind::NewLine) {
        offset += 1;
    }
    let kind = tape.peek(offset).kind;
    offset > 0
    && (binary_operator(kind).is_some()
        || matches!(kind, TokenKind::Dot | TokenKind::Is | TokenKind::As))
}

/// Looks up the prefix rule registered for a token kind.
fn prefix_rule(kind: TokenKind) -> Option<PrefixRule> {
    let rule: PrefixRule = match kind {
        TokenKind::Int | TokenKind::Float | TokenKind::String | TokenKind::True | TokenKind::False => {
            parse_literal
        },
        TokenKind::Identifier => parse_identifier_expression,
        TokenKind::LParen => parse_group_or_function,
        TokenKind::LBracket => parse_collection_or_map,
        TokenKind::LBrace => parse_block_expression,
        TokenKind::Minus | TokenKind::Bang => parse_unary,
        _ => return None,
    };
    Some(rule)
}

/// Looks up the infix rule, and its precedence, registered for a token kind.
fn infix_rule(kind: TokenKind) -> Option<(Precedence, InfixRule)> {
    if let Some(op) = binary_operator(kind) {
        return Some((binary_precedence(op), parse_binary));
    }
    let rule: (Precedence, InfixRule) = match kind {
        TokenKind::Is | TokenKind::As => (Precedence::TypeTest, parse_type_test),
        TokenKind::LParen => (Precedence::Postfix, parse_call),
        TokenKind::LBracket => (Precedence::Postfix, parse_index),
        TokenKind::Dot => (Precedence::Postfix, parse_property),
        _ => return None,
    };
    Some(rule)
}

fn parse_literal(_tape: &mut TokenTape, token: Token) -> ParseResult<Expression> {
    let value = match token.kind {
        TokenKind::Int => Literal::Int(int_literal(&token)?),
        TokenKind::Float => Literal::Float(float_literal(&token)?),
        TokenKind::String => Literal::Str(decode_string(&token.literal)),
        TokenKind::True => Literal::Bool(true),
        TokenKind::False => Literal::Bool(false),
        _ => return Err(unexpected(token, "a literal")),
    };
    Ok(Expression::Literal { value,
                             line: token.position.line })
}

fn parse_identifier_expression(_tape: &mut TokenTape, token: Token) -> ParseResult<Expression> {
    Ok(Expression::Identifier { line: token.position.line,
                                name: token.literal })
}

fn parse_unary(tape: &mut TokenTape, token: Token) -> ParseResult<Expression> {
    let op = if token.is(TokenKind::Minus) { UnaryOperator::Negate } else { UnaryOperator::Not };
    let operand = parse_expression(tape, Precedence::Prefix)?;
    Ok(Expression::Unary { op,
                           operand: Box::new(operand),
                           line: token.position.line })
}

/// `(` opens either a grouped expression or a function literal's parameter
/// list; bounded lookahead to the matching `)` decides which.
fn parse_group_or_function(tape: &mut TokenTape, token: Token) -> ParseResult<Expression> {
    if arrow_follows_group(tape, true) {
        return parse_function_literal(tape, &token);
    }
    let inner = tape.nested(|tape| parse_expression(tape, Precedence::Lowest))?;
    tape.skip_newlines();
    tape.consume(&[TokenKind::RParen], "')'")?;
    Ok(inner)
}

/// Parses `(Type name, ...) [ReturnType] => body` after the opening `(`.
fn parse_function_literal(tape: &mut TokenTape, open: &Token) -> ParseResult<Expression> {
    let parameters = parse_comma_separated(tape, parse_parameter, TokenKind::RParen)?;
    let return_type = if tape.check(TokenKind::Identifier) {
        Some(parse_type(tape, Precedence::Lowest)?)
    } else {
        None
    };
    tape.consume(&[TokenKind::Arrow], "'=>'")?;
    let body = parse_body(tape, true)?;
    Ok(Expression::Function(Box::new(FunctionLiteral { parameters,
                                                       return_type,
                                                       body,
                                                       line: open.position.line })))
}

fn parse_parameter(tape: &mut TokenTape) -> ParseResult<Parameter> {
    let ty = parse_type(tape, Precedence::Lowest)?;
    let name = parse_identifier(tape, "a parameter name")?;
    Ok(Parameter { name, ty })
}

/// Parses `[a, b]`, `[k: v, ...]` or the empty map `[:]` after the `[`.
fn parse_collection_or_map(tape: &mut TokenTape, token: Token) -> ParseResult<Expression> {
    tape.nested(|tape| parse_collection_items(tape, &token))
}

fn parse_collection_items(tape: &mut TokenTape, token: &Token) -> ParseResult<Expression> {
    let line = token.position.line;
    tape.skip_newlines();
    if tape.matches(&[TokenKind::Colon]) {
        tape.consume(&[TokenKind::RBracket], "']'")?;
        return Ok(Expression::Map { entries: Vec::new(),
                                    line });
    }
    if tape.matches(&[TokenKind::RBracket]) {
        return Ok(Expression::Collection { elements: Vec::new(),
                                           line });
    }

    let first = parse_expression(tape, Precedence::Lowest)?;
    tape.skip_newlines();
    if !tape.matches(&[TokenKind::Colon]) {
        let mut elements = vec![first];
        if tape.matches(&[TokenKind::Comma]) {
            elements.extend(parse_comma_separated(tape, parse_full_expression, TokenKind::RBracket)?);
        } else {
            tape.consume(&[TokenKind::RBracket], "',' or ']'")?;
        }
        return Ok(Expression::Collection { elements, line });
    }

    tape.skip_newlines();
    let value = parse_expression(tape, Precedence::Lowest)?;
    let mut entries = vec![(first, value)];
    tape.skip_newlines();
    if tape.matches(&[TokenKind::Comma]) {
        entries.extend(parse_comma_separated(tape, parse_map_entry, TokenKind::RBracket)?);
    } else {
        tape.consume(&[TokenKind::RBracket], "',' or ']'")?;
    }
    Ok(Expression::Map { entries, line })
}

fn parse_map_entry(tape: &mut TokenTape) -> ParseResult<(Expression, Expression)> {
    let key = parse_expression(tape, Precedence::Lowest)?;
    tape.skip_newlines();
    tape.consume(&[TokenKind::Colon], "':'")?;
    tape.skip_newlines();
    let value = parse_expression(tape, Precedence::Lowest)?;
    Ok((key, value))
}

/// Parses a whole expression; used where items are separated by commas.
pub(in crate::interpreter::parser) fn parse_full_expression(tape: &mut TokenTape)
                                                            -> ParseResult<Expression> {
    parse_expression(tape, Precedence::Lowest)
}

fn parse_block_expression(tape: &mut TokenTape, token: Token) -> ParseResult<Expression> {
    Ok(Expression::Block(parse_block(tape, &token)?))
}

fn parse_binary(tape: &mut TokenTape, left: Expression, token: Token) -> ParseResult<Expression> {
    let Some(op) = binary_operator(token.kind) else {
        return Err(unexpected(token, "a binary operator"));
    };
    let right = parse_expression(tape, binary_precedence(op))?;
    Ok(Expression::Binary { left: Box::new(left),
                            op,
                            right: Box::new(right),
                            line: token.position.line })
}

fn parse_type_test(tape: &mut TokenTape, left: Expression, token: Token) -> ParseResult<Expression> {
    let ty = parse_type(tape, Precedence::Lowest)?;
    let value = Box::new(left);
    let line = token.position.line;
    if token.is(TokenKind::Is) {
        Ok(Expression::TypeCheck { value, ty, line })
    } else {
        Ok(Expression::TypeCast { value, ty, line })
    }
}

fn parse_call(tape: &mut TokenTape, callee: Expression, token: Token) -> ParseResult<Expression> {
    let arguments =
        tape.nested(|tape| parse_comma_separated(tape, parse_full_expression, TokenKind::RParen))?;
    Ok(Expression::Call { callee: Box::new(callee),
                          arguments,
                          line: token.position.line })
}

fn parse_index(tape: &mut TokenTape, object: Expression, token: Token) -> ParseResult<Expression> {
    let index = tape.nested(|tape| parse_expression(tape, Precedence::Lowest))?;
    tape.skip_newlines();
    tape.consume(&[TokenKind::RBracket], "']'")?;
    Ok(Expression::Index { object: Box::new(object),
                           index:  Box::new(index),
                           line:   token.position.line, })
}

fn parse_property(tape: &mut TokenTape, object: Expression, token: Token) -> ParseResult<Expression> {
    let name = parse_identifier(tape, "a property name")?;
    Ok(Expression::Property { object: Box::new(object),
                              name,
                              line: token.position.line })
}
