use std::rc::Rc;

use tracing::trace;

use crate::{
    ast::{
        AssignTarget, BinaryOperator, Block, ElseBranch, Expression, FieldDefinition,
        IfStatement, Statement, TypeExpr, UnaryOperator,
    },
    interpreter::command::{Branch, Command, FieldCommand, Logic, ParameterRef, TypeRef},
};

/// Returns the method a binary operator dispatches to, and whether its
/// boolean result is inverted. `&&` and `||` short-circuit instead and map to
/// `None`.
///
/// # Example
/// ```
/// use kiln::{ast::BinaryOperator, interpreter::lowering::operator_method};
///
/// assert_eq!(operator_method(BinaryOperator::Add), Some(("plus", false)));
/// assert_eq!(operator_method(BinaryOperator::NotEqual), Some(("equals", true)));
/// assert_eq!(operator_method(BinaryOperator::And), None);
/// ```
#[must_use]
pub const fn operator_method(op: BinaryOperator) -> Option<(&'static str, bool)> {
    let method = match op {
        BinaryOperator::Add => ("plus", false),
        BinaryOperator::Sub => ("minus", false),
        BinaryOperator::Mul => ("times", false),
        BinaryOperator::Div => ("divide", false),
        BinaryOperator::Equal => ("equals", false),
        BinaryOperator::NotEqual => ("equals", true),
        BinaryOperator::Less => ("less", false),
        BinaryOperator::Greater => ("greater", false),
        BinaryOperator::LessEqual => ("lessOrEquals", false),
        BinaryOperator::GreaterEqual => ("greaterOrEquals", false),
        BinaryOperator::And | BinaryOperator::Or => return None,
    };
    Some(method)
}

/// Returns the method a unary operator dispatches to.
#[must_use]
pub const fn unary_method(op: UnaryOperator) -> &'static str {
    match op {
        UnaryOperator::Negate => "negate",
        UnaryOperator::Not => "not",
    }
}

/// Lowers the top-level statements of a source unit.
///
/// Every top-level statement reports a result, so each is lowered as if it
/// were the tail of a block. Statements after a top-level `return` are
/// dropped.
///
/// # Example
/// ```
/// use kiln::interpreter::{lowering::lower_program, parser::core::parse_source};
///
/// let outcome = parse_source("demo", "let a = 1 + 2\nreturn a\na");
/// let commands = lower_program(&outcome.statements);
///
/// assert_eq!(commands.len(), 2);
/// assert_eq!(commands[0].to_string(), "let a = 1.plus(2)");
/// ```
#[must_use]
pub fn lower_program(statements: &[Statement]) -> Vec<Command> {
    let mut commands = Vec::with_capacity(statements.len());
    for statement in statements {
        commands.push(lower_statement(statement, true));
        if matches!(statement, Statement::Return { .. }) {
            break;
        }
    }
    trace!(statements = statements.len(), commands = commands.len(), "lowered program");
    commands
}

/// Lowers the statements of a block. Only the last statement is in tail
/// position, and nothing after a `return` is kept.
#[must_use]
pub fn lower_block(statements: &[Statement]) -> Vec<Command> {
    let mut commands = Vec::with_capacity(statements.len());
    for (index, statement) in statements.iter().enumerate() {
        commands.push(lower_statement(statement, index + 1 == statements.len()));
        if matches!(statement, Statement::Return { .. }) {
            break;
        }
    }
    commands
}

/// Lowers one statement. `tail` marks the last statement of a block, where an
/// `if` yields the value of its taken branch.
#[must_use]
pub fn lower_statement(statement: &Statement, tail: bool) -> Command {
    match statement {
        Statement::Declaration(declaration) => {
            Command::DefineVariable { name:          declaration.name.clone(),
                                      declared_type: declaration.declared_type.as_ref().map(lower_type),
                                      mutable:       declaration.mutable,
                                      lazy:          declaration.lazy,
                                      restricted:    declaration.restricted,
                                      value:         Rc::new(lower_expression(&declaration.value)),
                                      line:          declaration.line, }
        },
        Statement::Assignment { target, value, line } => match target {
            AssignTarget::Name(name) => Command::Assign { name:  name.clone(),
                                                          value: Box::new(lower_expression(value)),
                                                          line:  *line, },
            AssignTarget::Property { object, name } => {
                Command::AssignProperty { object: Box::new(lower_expression(object)),
                                          name:   name.clone(),
                                          value:  Box::new(lower_expression(value)),
                                          line:   *line, }
            },
        },
        Statement::Block(block) => lower_block_command(block),
        Statement::If(statement) if tail => lower_conditional_expression(statement),
        Statement::If(statement) => lower_conditional(statement),
        Statement::While { condition,
                           body,
                           line, } => Command::Loop { condition: Box::new(lower_expression(condition)),
                                                      body:      lower_block(&body.statements),
                                                      line:      *line, },
        Statement::Return { value, line } => Command::Return { value: Box::new(lower_expression(value)),
                                                               line:  *line, },
        Statement::Struct { name, fields, line } => {
            let fields = fields.iter()
                               .map(|field| match field {
                                   FieldDefinition::Typed { name, ty } => {
                                       FieldCommand::Typed { name: name.clone(),
                                                             ty:   lower_type(ty), }
                                   },
                                   FieldDefinition::Defaulted { name, default } => {
                                       FieldCommand::Defaulted { name:    name.clone(),
                                                                 default: lower_expression(default), }
                                   },
                               })
                               .collect();
            Command::StructDefinition { name: name.clone(),
                                        fields,
                                        line: *line }
        },
        Statement::Extend { type_name,
                            alias,
                            body,
                            line, } => Command::Extend { type_name: type_name.clone(),
                                                         alias:     alias.clone(),
                                                         body:      lower_block(&body.statements),
                                                         line:      *line, },
        Statement::Import { namespace, line } => Command::Import { namespace: namespace.clone(),
                                                                   line:      *line, },
        Statement::Namespace { name, line } => Command::Namespace { name: name.clone(),
                                                                    line: *line, },
        Statement::Expression { expr, .. } => lower_expression(expr),
    }
}

fn lower_block_command(block: &Block) -> Command {
    Command::Block { statements: lower_block(&block.statements),
                     line:       block.line, }
}

fn lower_conditional(statement: &IfStatement) -> Command {
    let otherwise = statement.else_branch.as_ref().map(|branch| match branch {
                                                      ElseBranch::Block(block) => {
                                                          lower_block(&block.statements)
                                                      },
                                                      ElseBranch::If(nested) => {
                                                          vec![lower_conditional(nested)]
                                                      },
                                                  });
    Command::Conditional { condition: Box::new(lower_expression(&statement.condition)),
                           then: lower_block(&statement.then_branch.statements),
                           otherwise,
                           line: statement.line }
}

fn lower_conditional_expression(statement: &IfStatement) -> Command {
    let otherwise = statement.else_branch.as_ref().map(|branch| match branch {
                                                      ElseBranch::Block(block) => lower_branch(block),
                                                      ElseBranch::If(nested) => {
                                                          Branch { statements: Vec::new(),
                                                                   result:     Some(Box::new(lower_conditional_expression(nested))), }
                                                      },
                                                  });
    Command::ConditionalExpression { condition: Box::new(lower_expression(&statement.condition)),
                                     then: lower_branch(&statement.then_branch),
                                     otherwise,
                                     line: statement.line }
}

/// Splits a lowered block into leading statements and its trailing result.
fn lower_branch(block: &Block) -> Branch {
    let mut statements = lower_block(&block.statements);
    let result = statements.pop().map(Box::new);
    Branch { statements, result }
}

/// Lowers an expression.
#[must_use]
pub fn lower_expression(expr: &Expression) -> Command {
    match expr {
        Expression::Literal { value, line } => Command::Literal { value: value.clone(),
                                                                  line:  *line, },
        Expression::Identifier { name, line } => Command::ReadVariable { name: name.clone(),
                                                                         line: *line, },
        Expression::Unary { op, operand, line } => {
            Command::InvokeOnReceiver { receiver:  Box::new(lower_expression(operand)),
                                        method:    unary_method(*op).to_string(),
                                        arguments: Vec::new(),
                                        line:      *line, }
        },
        Expression::Binary { left,
                             op,
                             right,
                             line, } => {
            let left = Box::new(lower_expression(left));
            let right = Box::new(lower_expression(right));
            match operator_method(*op) {
                Some((method, negate)) => Command::BinaryOperator { method,
                                                                    left,
                                                                    right,
                                                                    negate,
                                                                    line: *line },
                None => {
                    let logic = if *op == BinaryOperator::And { Logic::And } else { Logic::Or };
                    Command::ShortCircuit { logic,
                                            left,
                                            right,
                                            line: *line }
                },
            }
        },
        Expression::Property { object, name, line } => {
            Command::ReadProperty { object: Box::new(lower_expression(object)),
                                    name:   name.clone(),
                                    line:   *line, }
        },
        Expression::Index { object, index, line } => {
            Command::InvokeOnReceiver { receiver:  Box::new(lower_expression(object)),
                                        method:    "get".to_string(),
                                        arguments: vec![lower_expression(index)],
                                        line:      *line, }
        },
        Expression::Call { callee,
                           arguments,
                           line, } => {
            let arguments = arguments.iter().map(lower_expression).collect();
            match callee.as_ref() {
                Expression::Property { object, name, .. } => {
                    Command::InvokeOnReceiver { receiver: Box::new(lower_expression(object)),
                                                method: name.clone(),
                                                arguments,
                                                line: *line }
                },
                callee => Command::Invoke { callee: Box::new(lower_expression(callee)),
                                            arguments,
                                            line: *line },
            }
        },
        Expression::TypeCheck { value, ty, line } => Command::TypeCheck { value: Box::new(lower_expression(value)),
                                                                          ty:    lower_type(ty),
                                                                          line:  *line, },
        Expression::TypeCast { value, ty, line } => Command::TypeCast { value: Box::new(lower_expression(value)),
                                                                        ty:    lower_type(ty),
                                                                        line:  *line, },
        Expression::Function(function) => {
            let parameters = function.parameters
                                     .iter()
                                     .map(|p| ParameterRef { name: p.name.clone(),
                                                             ty:   lower_type(&p.ty), })
                                     .collect();
            Command::FunctionLiteral { parameters,
                                       return_type: function.return_type.as_ref().map(lower_type),
                                       body: Rc::from(lower_block(&function.body.statements)),
                                       line: function.line }
        },
        Expression::Collection { elements, line } => {
            Command::Collection { elements: elements.iter().map(lower_expression).collect(),
                                  line:     *line, }
        },
        Expression::Map { entries, line } => {
            Command::Map { entries: entries.iter()
                                           .map(|(k, v)| (lower_expression(k), lower_expression(v)))
                                           .collect(),
                           line:    *line, }
        },
        Expression::Block(block) => lower_block_command(block),
    }
}

/// Lowers a type annotation to an unresolved reference.
#[must_use]
pub fn lower_type(ty: &TypeExpr) -> TypeRef {
    match ty {
        TypeExpr::Named { name, .. } => TypeRef::Named(name.clone()),
        TypeExpr::Function { parameters,
                             return_type,
                             .. } => TypeRef::Function { parameters:  parameters.iter().map(lower_type).collect(),
                                                         return_type: Box::new(lower_type(return_type)), },
        TypeExpr::Collection { element, .. } => TypeRef::Collection(Box::new(lower_type(element))),
        TypeExpr::Map { key, value, .. } => TypeRef::Map { key:   Box::new(lower_type(key)),
                                                           value: Box::new(lower_type(value)), },
        TypeExpr::Algebraic { variants, .. } => {
            TypeRef::Algebraic(variants.iter().map(lower_type).collect())
        },
        TypeExpr::Contract { name, arguments, .. } => {
            TypeRef::Contract { name:      name.clone(),
                                arguments: arguments.iter().map(lower_type).collect(), }
        },
    }
}
