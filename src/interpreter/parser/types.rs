use crate::{
    ast::TypeExpr,
    interpreter::{
        lexer::{Token, TokenKind},
        parser::{
            core::ParseResult,
            utils::{Precedence, arrow_follows_group, parse_comma_separated},
        },
        tape::{TokenTape, unexpected},
    },
};

type PrefixRule = fn(&mut TokenTape, Token) -> ParseResult<TypeExpr>;
type InfixRule = fn(&mut TokenTape, TypeExpr, Token) -> ParseResult<TypeExpr>;

/// Parses a type, using the same precedence-climbing scheme as expressions.
///
/// Prefix forms are names (optionally with `<...>` arguments), `[T]`,
/// `[K: V]`, `(T, ...) => R` and parenthesized grouping. The only infix form
/// is `|`, which builds an algebraic type.
///
/// # Example
/// ```
/// use kiln::interpreter::{
///     lexer::TokenStream,
///     parser::{types::parse_type, utils::Precedence},
///     tape::TokenTape,
/// };
///
/// let mut tape = TokenTape::from_tokens(TokenStream::tokenize("demo", "(Int, Int) => Int | [String: Bool]"));
/// let ty = parse_type(&mut tape, Precedence::Lowest).unwrap();
///
/// assert_eq!(ty.to_string(), "((Int, Int) => (Int | [String: Bool]))");
/// ```
pub fn parse_type(tape: &mut TokenTape, threshold: Precedence) -> ParseResult<TypeExpr> {
    let Some(prefix) = prefix_rule(tape.current().kind) else {
        return Err(unexpected(tape.current().clone(), "a type"));
    };
    let token = tape.advance();
    let mut left = prefix(tape, token)?;

    while let Some((precedence, infix)) = infix_rule(tape.current().kind)
          && precedence > threshold
    {
        let operator = tape.advance();
        left = infix(tape, left, operator)?;
    }
    Ok(left)
}

fn prefix_rule(kind: TokenKind) -> Option<PrefixRule> {
    let rule: PrefixRule = match kind {
        TokenKind::Identifier => parse_named,
        TokenKind::LBracket => parse_collection_or_map,
        TokenKind::LParen => parse_group_or_function,
        _ => return None,
    };
    Some(rule)
}

fn infix_rule(kind: TokenKind) -> Option<(Precedence, InfixRule)> {
    match kind {
        TokenKind::Pipe => Some((Precedence::Or, parse_algebraic)),
        _ => None,
    }
}

fn parse_type_argument(tape: &mut TokenTape) -> ParseResult<TypeExpr> {
    parse_type(tape, Precedence::Lowest)
}

fn parse_named(tape: &mut TokenTape, token: Token) -> ParseResult<TypeExpr> {
    let line = token.position.line;
    if contract_arguments_follow(tape) {
        tape.advance();
        let arguments = parse_comma_separated(tape, parse_type_argument, TokenKind::Greater)?;
        return Ok(TypeExpr::Contract { name: token.literal,
                                       arguments,
                                       line });
    }
    Ok(TypeExpr::Named { name: token.literal,
                         line })
}

/// Decides whether a `<` after a type name opens contract arguments rather
/// than a comparison, by scanning for its matching `>` over tokens that can
/// appear in a type.
fn contract_arguments_follow(tape: &mut TokenTape) -> bool {
    if !tape.check(TokenKind::Less) {
        return false;
    }
    let mut depth = 0usize;
    let mut offset = 0;
    loop {
        match tape.peek(offset).kind {
            TokenKind::Less => depth += 1,
            TokenKind::Greater => {
                depth -= 1;
                if depth == 0 {
                    return true;
                }
            },
            TokenKind::Identifier
            | TokenKind::Comma
            | TokenKind::Colon
            | TokenKind::Pipe
            | TokenKind::Arrow
            | TokenKind::LParen
            | TokenKind::RParen
            | TokenKind::LBracket
            | TokenKind::RBracket => {},
            _ => return false,
        }
        offset += 1;
    }
}

fn parse_collection_or_map(tape: &mut TokenTape, token: Token) -> ParseResult<TypeExpr> {
    let line = token.position.line;
    let first = parse_type(tape, Precedence::Lowest)?;
    if tape.matches(&[TokenKind::Colon]) {
        let value = parse_type(tape, Precedence::Lowest)?;
        tape.consume(&[TokenKind::RBracket], "']'")?;
        return Ok(TypeExpr::Map { key: Box::new(first),
                                  value: Box::new(value),
                                  line });
    }
    tape.consume(&[TokenKind::RBracket], "':' or ']'")?;
    Ok(TypeExpr::Collection { element: Box::new(first),
                              line })
}

fn parse_group_or_function(tape: &mut TokenTape, token: Token) -> ParseResult<TypeExpr> {
    if !arrow_follows_group(tape, false) {
        let inner = parse_type(tape, Precedence::Lowest)?;
        tape.consume(&[TokenKind::RParen], "')'")?;
        return Ok(inner);
    }
    let parameters = parse_comma_separated(tape, parse_type_argument, TokenKind::RParen)?;
    tape.consume(&[TokenKind::Arrow], "'=>'")?;
    let return_type = parse_type(tape, Precedence::Lowest)?;
    Ok(TypeExpr::Function { parameters,
                            return_type: Box::new(return_type),
                            line: token.position.line })
}

/// Folds `left | right` into one flat list of alternatives.
fn parse_algebraic(tape: &mut TokenTape, left: TypeExpr, token: Token) -> ParseResult<TypeExpr> {
    let right = parse_type(tape, Precedence::Or)?;
    let mut variants = match left {
        TypeExpr::Algebraic { variants, .. } => variants,
        other => vec![other],
    };
    variants.push(right);
    Ok(TypeExpr::Algebraic { variants,
                             line: token.position.line })
}
