use std::fmt;

/// Represents a literal value in the language.
///
/// `Literal` covers all raw, constant values that can appear directly in
/// source code. It is used in the AST and, unchanged, in the lowered
/// [`crate::interpreter::command::Command`] tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// A 64-bit signed integer literal.
    Int(i64),
    /// A 64-bit floating-point literal.
    Float(f64),
    /// A string literal, escapes already resolved.
    Str(String),
    /// A boolean literal value: `true` or `false`.
    Bool(bool),
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

/// Represents a binary operator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    /// Addition (`+`)
    Add,
    /// Subtraction (`-`)
    Sub,
    /// Multiplication (`*`)
    Mul,
    /// Division (`/`)
    Div,
    /// Equal to (`==`)
    Equal,
    /// Not equal to (`!=`)
    NotEqual,
    /// Less than (`<`)
    Less,
    /// Greater than (`>`)
    Greater,
    /// Less than or equal (`<=`)
    LessEqual,
    /// Greater than or equal (`>=`)
    GreaterEqual,
    /// Logical and (`&&`)
    And,
    /// Logical or (`||`)
    Or,
}

/// Represents a unary operator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    /// Arithmetic negation (e.g. `-x`).
    Negate,
    /// Logical NOT (e.g. `!x`).
    Not,
}

/// A type as written in source code.
///
/// Type expressions are resolved against the runtime type tables only when
/// the lowered program runs, so a declaration may refer to a struct defined
/// earlier in the same unit.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// A type referenced by name, e.g. `Int` or `Person`.
    Named {
        /// The type name.
        name: String,
        /// Line number in the source code.
        line: usize,
    },
    /// A function type, e.g. `(Int, Int) => Int`.
    Function {
        /// Parameter types, in order.
        parameters:  Vec<Self>,
        /// The return type.
        return_type: Box<Self>,
        /// Line number in the source code.
        line:        usize,
    },
    /// A collection type, e.g. `[Int]`.
    Collection {
        /// The element type.
        element: Box<Self>,
        /// Line number in the source code.
        line:    usize,
    },
    /// A map type, e.g. `[String: Int]`.
    Map {
        /// The key type.
        key:   Box<Self>,
        /// The value type.
        value: Box<Self>,
        /// Line number in the source code.
        line:  usize,
    },
    /// An algebraic type, e.g. `Int | String`.
    Algebraic {
        /// The alternatives, in source order.
        variants: Vec<Self>,
        /// Line number in the source code.
        line:     usize,
    },
    /// A contractual type with arguments, e.g. `Box<Int>`. The arguments are
    /// recorded but not resolved.
    Contract {
        /// The base type name.
        name:      String,
        /// The type arguments.
        arguments: Vec<Self>,
        /// Line number in the source code.
        line:      usize,
    },
}

/// A function parameter: `Type name`.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// The parameter name.
    pub name: String,
    /// The declared type.
    pub ty:   TypeExpr,
}

/// A function literal: `(Int a, Int b) Int => a + b`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionLiteral {
    /// The parameters, in order.
    pub parameters:  Vec<Parameter>,
    /// The optional named return type.
    pub return_type: Option<TypeExpr>,
    /// The body.
    pub body:        Block,
    /// Line number in the source code.
    pub line:        usize,
}

/// An abstract syntax tree (AST) node representing an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A literal value.
    Literal {
        /// The constant value.
        value: Literal,
        /// Line number in the source code.
        line:  usize,
    },
    /// Reference to a name.
    Identifier {
        /// The name.
        name: String,
        /// Line number in the source code.
        line: usize,
    },
    /// A unary operation.
    Unary {
        /// The operator.
        op:      UnaryOperator,
        /// The operand.
        operand: Box<Self>,
        /// Line number in the source code.
        line:    usize,
    },
    /// A binary operation.
    Binary {
        /// Left operand.
        left:  Box<Self>,
        /// The operator.
        op:    BinaryOperator,
        /// Right operand.
        right: Box<Self>,
        /// Line number in the source code.
        line:  usize,
    },
    /// Property access, e.g. `person.name`.
    Property {
        /// The receiver.
        object: Box<Self>,
        /// The property name.
        name:   String,
        /// Line number in the source code.
        line:   usize,
    },
    /// Index access, e.g. `items[0]`.
    Index {
        /// The indexed value.
        object: Box<Self>,
        /// The index.
        index:  Box<Self>,
        /// Line number in the source code.
        line:   usize,
    },
    /// A call, e.g. `fact(8)` or `person.greet()`.
    Call {
        /// The called expression.
        callee:    Box<Self>,
        /// The arguments.
        arguments: Vec<Self>,
        /// Line number in the source code.
        line:      usize,
    },
    /// A runtime type test: `value is Type`.
    TypeCheck {
        /// The tested value.
        value: Box<Self>,
        /// The type tested against.
        ty:    TypeExpr,
        /// Line number in the source code.
        line:  usize,
    },
    /// A checked conversion: `value as Type`.
    TypeCast {
        /// The converted value.
        value: Box<Self>,
        /// The target type.
        ty:    TypeExpr,
        /// Line number in the source code.
        line:  usize,
    },
    /// A function literal.
    Function(Box<FunctionLiteral>),
    /// A collection literal, e.g. `[1, 2, 3]`.
    Collection {
        /// The elements.
        elements: Vec<Self>,
        /// Line number in the source code.
        line:     usize,
    },
    /// A map literal, e.g. `["a": 1]` or `[:]`.
    Map {
        /// Key/value pairs, in source order.
        entries: Vec<(Self, Self)>,
        /// Line number in the source code.
        line:    usize,
    },
    /// A block used as an expression.
    Block(Block),
}

impl Expression {
    /// Gets the line number from `self`.
    /// ## Example
    /// ```
    /// use kiln::ast::Expression;
    ///
    /// let expr = Expression::Identifier { name: "x".to_string(),
    ///                                     line: 5, };
    ///
    /// assert_eq!(expr.line_number(), 5);
    /// ```
    #[must_use]
    pub fn line_number(&self) -> usize {
        match self {
            Self::Literal { line, .. }
            | Self::Identifier { line, .. }
            | Self::Unary { line, .. }
            | Self::Binary { line, .. }
            | Self::Property { line, .. }
            | Self::Index { line, .. }
            | Self::Call { line, .. }
            | Self::TypeCheck { line, .. }
            | Self::TypeCast { line, .. }
            | Self::Collection { line, .. }
            | Self::Map { line, .. } => *line,
            Self::Function(function) => function.line,
            Self::Block(block) => block.line,
        }
    }
}

/// A braced sequence of statements. Its value is the value of the last
/// statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Statements inside the block.
    pub statements: Vec<Statement>,
    /// Line number in the source code.
    pub line:       usize,
}

/// A `let` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    /// The declared name.
    pub name:          String,
    /// Whether the binding may be reassigned.
    pub mutable:       bool,
    /// Whether the initializer runs on first read.
    pub lazy:          bool,
    /// Whether the binding is hidden from other namespaces.
    pub restricted:    bool,
    /// The annotated type, if any.
    pub declared_type: Option<TypeExpr>,
    /// The initializer.
    pub value:         Expression,
    /// Line number in the source code.
    pub line:          usize,
}

/// The `else` part of an `if`.
#[derive(Debug, Clone, PartialEq)]
pub enum ElseBranch {
    /// `else { … }` or `else => statement`.
    Block(Block),
    /// `else if …`.
    If(Box<IfStatement>),
}

/// An `if` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    /// The condition.
    pub condition:   Expression,
    /// Taken when the condition is `true`.
    pub then_branch: Block,
    /// Taken otherwise.
    pub else_branch: Option<ElseBranch>,
    /// Line number in the source code.
    pub line:        usize,
}

/// One field of a struct definition.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDefinition {
    /// `Type name`: a required field.
    Typed {
        /// The field name.
        name: String,
        /// The field type.
        ty:   TypeExpr,
    },
    /// `name = expression`: a field with a default value; its type is the
    /// default's type.
    Defaulted {
        /// The field name.
        name:    String,
        /// The default value.
        default: Expression,
    },
}

impl FieldDefinition {
    /// Returns the field name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Typed { name, .. } | Self::Defaulted { name, .. } => name,
        }
    }
}

/// The left-hand side of an assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum AssignTarget {
    /// A variable, e.g. `a = 4`.
    Name(String),
    /// A field of an instance, e.g. `person.age = 51`.
    Property {
        /// The instance.
        object: Expression,
        /// The field name.
        name:   String,
    },
}

impl fmt::Display for AssignTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{name}"),
            Self::Property { object, name } => write!(f, "{object}.{name}"),
        }
    }
}

/// Represents a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `let [mut] [lazy] [restricted] name [: Type] = value`
    Declaration(Declaration),
    /// `target = value`
    Assignment {
        /// The assigned place.
        target: AssignTarget,
        /// The new value.
        value:  Expression,
        /// Line number in the source code.
        line:   usize,
    },
    /// `{ … }`
    Block(Block),
    /// `if condition … [else …]`
    If(IfStatement),
    /// `while condition …`
    While {
        /// The loop condition.
        condition: Expression,
        /// The loop body.
        body:      Block,
        /// Line number in the source code.
        line:      usize,
    },
    /// `return value`
    Return {
        /// The returned value.
        value: Expression,
        /// Line number in the source code.
        line:  usize,
    },
    /// `struct Name { … }`
    Struct {
        /// The struct name.
        name:   String,
        /// The fields, in declaration order.
        fields: Vec<FieldDefinition>,
        /// Line number in the source code.
        line:   usize,
    },
    /// `extend Name [as alias] { … }`
    Extend {
        /// The extended type.
        type_name: String,
        /// The receiver alias.
        alias:     Option<String>,
        /// The declarations to attach.
        body:      Block,
        /// Line number in the source code.
        line:      usize,
    },
    /// `import Name`
    Import {
        /// The imported namespace.
        namespace: String,
        /// Line number in the source code.
        line:      usize,
    },
    /// `namespace Name`
    Namespace {
        /// The declared namespace.
        name: String,
        /// Line number in the source code.
        line: usize,
    },
    /// A standalone expression evaluated for its result.
    Expression {
        /// The expression.
        expr: Expression,
        /// Line number in the source code.
        line: usize,
    },
}

impl Statement {
    /// Gets the line number from `self`.
    #[must_use]
    pub fn line_number(&self) -> usize {
        match self {
            Self::Declaration(declaration) => declaration.line,
            Self::Block(block) => block.line,
            Self::If(statement) => statement.line,
            Self::Assignment { line, .. }
            | Self::While { line, .. }
            | Self::Return { line, .. }
            | Self::Struct { line, .. }
            | Self::Extend { line, .. }
            | Self::Import { line, .. }
            | Self::Namespace { line, .. }
            | Self::Expression { line, .. } => *line,
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use BinaryOperator::{
            Add, And, Div, Equal, Greater, GreaterEqual, Less, LessEqual, Mul, NotEqual, Or, Sub,
        };
        let operator = match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Equal => "==",
            NotEqual => "!=",
            Less => "<",
            Greater => ">",
            LessEqual => "<=",
            GreaterEqual => ">=",
            And => "&&",
            Or => "||",
        };
        write!(f, "{operator}")
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Negate => write!(f, "-"),
            Self::Not => write!(f, "!"),
        }
    }
}

/// Renders a float so that it lexes back as a float literal.
pub(crate) fn render_float(value: f64) -> String {
    let text = value.to_string();
    if text.contains('.') || !value.is_finite() {
        text
    } else {
        format!("{text}.0")
    }
}

/// Renders a string with quotes and the escapes the lexer understands.
pub(crate) fn render_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items.iter()
         .map(ToString::to_string)
         .collect::<Vec<_>>()
         .join(", ")
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{}", render_float(*x)),
            Self::Str(s) => write!(f, "{}", render_string(s)),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named { name, .. } => write!(f, "{name}"),
            Self::Function { parameters,
                             return_type,
                             .. } => write!(f, "(({}) => {return_type})", join(parameters)),
            Self::Collection { element, .. } => write!(f, "[{element}]"),
            Self::Map { key, value, .. } => write!(f, "[{key}: {value}]"),
            Self::Algebraic { variants, .. } => {
                let rendered = variants.iter()
                                       .map(ToString::to_string)
                                       .collect::<Vec<_>>()
                                       .join(" | ");
                write!(f, "({rendered})")
            },
            Self::Contract { name, arguments, .. } => write!(f, "{name}<{}>", join(arguments)),
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{{")?;
        for statement in &self.statements {
            writeln!(f, "{statement}")?;
        }
        write!(f, "}}")
    }
}

impl fmt::Display for FunctionLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parameters = self.parameters
                             .iter()
                             .map(|p| format!("{} {}", p.ty, p.name))
                             .collect::<Vec<_>>()
                             .join(", ");
        write!(f, "(({parameters})")?;
        if let Some(return_type) = &self.return_type {
            write!(f, " {return_type}")?;
        }
        write!(f, " => {})", self.body)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal { value, .. } => write!(f, "{value}"),
            Self::Identifier { name, .. } => write!(f, "{name}"),
            Self::Unary { op, operand, .. } => write!(f, "({op}{operand})"),
            Self::Binary { left, op, right, .. } => write!(f, "({left} {op} {right})"),
            Self::Property { object, name, .. } => write!(f, "{object}.{name}"),
            Self::Index { object, index, .. } => write!(f, "{object}[{index}]"),
            Self::Call { callee,
                         arguments,
                         .. } => write!(f, "{callee}({})", join(arguments)),
            Self::TypeCheck { value, ty, .. } => write!(f, "({value} is {ty})"),
            Self::TypeCast { value, ty, .. } => write!(f, "({value} as {ty})"),
            Self::Function(function) => write!(f, "{function}"),
            Self::Collection { elements, .. } => write!(f, "[{}]", join(elements)),
            Self::Map { entries, .. } => {
                if entries.is_empty() {
                    return write!(f, "[:]");
                }
                let rendered = entries.iter()
                                      .map(|(k, v)| format!("{k}: {v}"))
                                      .collect::<Vec<_>>()
                                      .join(", ");
                write!(f, "[{rendered}]")
            },
            Self::Block(block) => write!(f, "{block}"),
        }
    }
}

impl fmt::Display for IfStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "if {} {}", self.condition, self.then_branch)?;
        match &self.else_branch {
            Some(ElseBranch::Block(block)) => write!(f, " else {block}"),
            Some(ElseBranch::If(nested)) => write!(f, " else {nested}"),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Declaration(declaration) => {
                write!(f, "let ")?;
                if declaration.mutable {
                    write!(f, "mut ")?;
                }
                if declaration.lazy {
                    write!(f, "lazy ")?;
                }
                if declaration.restricted {
                    write!(f, "restricted ")?;
                }
                write!(f, "{}", declaration.name)?;
                if let Some(ty) = &declaration.declared_type {
                    write!(f, ": {ty}")?;
                }
                write!(f, " = {}", declaration.value)
            },
            Self::Assignment { target, value, .. } => write!(f, "{target} = {value}"),
            Self::Block(block) => write!(f, "{block}"),
            Self::If(statement) => write!(f, "{statement}"),
            Self::While { condition, body, .. } => write!(f, "while {condition} {body}"),
            Self::Return { value, .. } => write!(f, "return {value}"),
            Self::Struct { name, fields, .. } => {
                writeln!(f, "struct {name} {{")?;
                for field in fields {
                    match field {
                        FieldDefinition::Typed { name, ty } => writeln!(f, "{ty} {name}")?,
                        FieldDefinition::Defaulted { name, default } => {
                            writeln!(f, "{name} = {default}")?;
                        },
                    }
                }
                write!(f, "}}")
            },
            Self::Extend { type_name,
                           alias,
                           body,
                           .. } => match alias {
                Some(alias) => write!(f, "extend {type_name} as {alias} {body}"),
                None => write!(f, "extend {type_name} {body}"),
            },
            Self::Import { namespace, .. } => write!(f, "import {namespace}"),
            Self::Namespace { name, .. } => write!(f, "namespace {name}"),
            Self::Expression { expr, .. } => write!(f, "{expr}"),
        }
    }
}
