use crate::{
    ast::{AssignTarget, Declaration, ElseBranch, Expression, FieldDefinition, IfStatement, Statement},
    error::SyntaxError,
    interpreter::{
        lexer::{Token, TokenKind},
        parser::{
            core::ParseResult,
            expression::parse_expression,
            types::parse_type,
            utils::{Precedence, parse_block, parse_body, parse_identifier},
        },
        tape::TokenTape,
    },
};

/// Parses a single statement.
///
/// The first token decides the form:
/// - `let` starts a declaration,
/// - `if`, `while`, `return`, `struct`, `extend`, `import` and `namespace`
///   start their respective statements,
/// - `{` starts a block,
/// - anything else is parsed as an expression, which becomes an assignment
///   if it is followed by `=`.
///
/// The statement terminator is left for the caller to check.
///
/// # Errors
/// Returns a `SyntaxError` describing the first token that does not fit.
pub fn parse_statement(tape: &mut TokenTape) -> ParseResult<Statement> {
    let token = tape.current().clone();
    let line = token.position.line;
    match token.kind {
        TokenKind::Let => {
            tape.advance();
            parse_declaration(tape, line)
        },
        TokenKind::If => {
            tape.advance();
            Ok(Statement::If(parse_if(tape, line)?))
        },
        TokenKind::While => {
            tape.advance();
            let condition = parse_expression(tape, Precedence::Lowest)?;
            let body = parse_body(tape, false)?;
            Ok(Statement::While { condition,
                                  body,
                                  line })
        },
        TokenKind::Return => {
            tape.advance();
            let value = parse_expression(tape, Precedence::Lowest)?;
            Ok(Statement::Return { value, line })
        },
        TokenKind::Struct => {
            tape.advance();
            parse_struct(tape, line)
        },
        TokenKind::Extend => {
            tape.advance();
            let type_name = parse_identifier(tape, "a type name")?;
            let alias = if tape.matches(&[TokenKind::As]) {
                Some(parse_identifier(tape, "an alias")?)
            } else {
                None
            };
            let open = tape.consume(&[TokenKind::LBrace], "'{'")?;
            let body = parse_block(tape, &open)?;
            Ok(Statement::Extend { type_name,
                                   alias,
                                   body,
                                   line })
        },
        TokenKind::Import => {
            tape.advance();
            let namespace = parse_identifier(tape, "a namespace")?;
            Ok(Statement::Import { namespace, line })
        },
        TokenKind::Namespace => {
            tape.advance();
            let name = parse_identifier(tape, "a namespace")?;
            Ok(Statement::Namespace { name, line })
        },
        TokenKind::LBrace => {
            let open = tape.advance();
            Ok(Statement::Block(parse_block(tape, &open)?))
        },
        _ => parse_expression_statement(tape, line),
    }
}

/// Parses `[mut] [lazy] [restricted] name [: Type] = value` after `let`.
///
/// The modifiers may appear in any order, each at most once.
fn parse_declaration(tape: &mut TokenTape, line: usize) -> ParseResult<Statement> {
    let mut mutable = false;
    let mut lazy = false;
    let mut restricted = false;
    loop {
        let token = tape.current().clone();
        let flag = match token.kind {
            TokenKind::Mut => &mut mutable,
            TokenKind::Lazy => &mut lazy,
            TokenKind::Restricted => &mut restricted,
            _ => break,
        };
        if *flag {
            return Err(SyntaxError::Other { message: format!("Modifier {token} is repeated."),
                                            token });
        }
        *flag = true;
        tape.advance();
    }

    let name = parse_identifier(tape, "a variable name")?;
    let declared_type = if tape.matches(&[TokenKind::Colon]) {
        Some(parse_type(tape, Precedence::Lowest)?)
    } else {
        None
    };
    tape.consume(&[TokenKind::Assign], "'='")?;
    let value = parse_expression(tape, Precedence::Lowest)?;

    Ok(Statement::Declaration(Declaration { name,
                                            mutable,
                                            lazy,
                                            restricted,
                                            declared_type,
                                            value,
                                            line }))
}

/// Parses an `if` statement with optional `else` and chained `else if`, the
/// `if` keyword already consumed.
///
/// Syntax:
/// ```text
///     if <condition> => <statement> | { ... }
///     else if <condition> ...
///     else => <statement> | { ... }
/// ```
/// An `else` may start on the line after the `then` branch.
fn parse_if(tape: &mut TokenTape, line: usize) -> ParseResult<IfStatement> {
    let condition = parse_expression(tape, Precedence::Lowest)?;
    let then_branch = parse_body(tape, false)?;

    if !else_follows(tape) {
        return Ok(IfStatement { condition,
                                then_branch,
                                else_branch: None,
                                line });
    }
    tape.skip_newlines();
    tape.advance();

    let else_branch = if tape.check(TokenKind::If) {
        let nested_line = tape.advance().position.line;
        ElseBranch::If(Box::new(parse_if(tape, nested_line)?))
    } else {
        ElseBranch::Block(parse_body(tape, false)?)
    };
    Ok(IfStatement { condition,
                     then_branch,
                     else_branch: Some(else_branch),
                     line })
}

/// Looks past line breaks for an `else` without consuming anything.
fn else_follows(tape: &mut TokenTape) -> bool {
    let mut offset = 0;
    while tape.peek(offset).is(TokenKind::NewLine) {
        offset += 1;
    }
    tape.peek(offset).is(TokenKind::Else)
}

/// Parses `Name { field... }` after `struct`.
///
/// A field is either `Type name` or `name = default`. Fields are separated by
/// line breaks, commas, or nothing at all.
fn parse_struct(tape: &mut TokenTape, line: usize) -> ParseResult<Statement> {
    let name = parse_identifier(tape, "a struct name")?;
    tape.consume(&[TokenKind::LBrace], "'{'")?;

    let mut fields: Vec<FieldDefinition> = Vec::new();
    loop {
        while tape.matches(&[TokenKind::NewLine, TokenKind::Comma]) {}
        if tape.matches(&[TokenKind::RBrace]) {
            break;
        }
        let start = tape.current().clone();
        let field = if start.is(TokenKind::Identifier) && tape.peek(1).is(TokenKind::Assign) {
            tape.advance();
            tape.advance();
            FieldDefinition::Defaulted { name:    start.literal.clone(),
                                         default: parse_expression(tape, Precedence::Lowest)?, }
        } else {
            let ty = parse_type(tape, Precedence::Lowest)?;
            FieldDefinition::Typed { name: parse_identifier(tape, "a field name")?,
                                     ty }
        };
        if fields.iter().any(|existing| existing.name() == field.name()) {
            return Err(SyntaxError::Other { message: format!("Field '{}' is declared twice.",
                                                             field.name()),
                                            token:   start, });
        }
        fields.push(field);
    }

    Ok(Statement::Struct { name, fields, line })
}

/// Parses an expression statement, turning it into an assignment when `=`
/// follows.
fn parse_expression_statement(tape: &mut TokenTape, line: usize) -> ParseResult<Statement> {
    let expr = parse_expression(tape, Precedence::Lowest)?;
    if !tape.check(TokenKind::Assign) {
        return Ok(Statement::Expression { expr, line });
    }

    let assign: Token = tape.advance();
    let target = match expr {
        Expression::Identifier { name, .. } => AssignTarget::Name(name),
        Expression::Property { object, name, .. } => AssignTarget::Property { object: *object,
                                                                              name },
        _ => return Err(SyntaxError::InvalidAssignmentTarget { token: assign }),
    };
    let value = parse_expression(tape, Precedence::Lowest)?;
    Ok(Statement::Assignment { target,
                               value,
                               line })
}
