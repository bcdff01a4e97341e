use std::{fmt, rc::Rc};

use crate::ast::Literal;

/// A type annotation as it appears in a lowered program.
///
/// Names are resolved against the running context's type tables only when
/// the command that carries the reference executes.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    /// A type referenced by name.
    Named(String),
    /// `(P, ...) => R`
    Function {
        /// Parameter types.
        parameters:  Vec<Self>,
        /// Return type.
        return_type: Box<Self>,
    },
    /// `[T]`
    Collection(Box<Self>),
    /// `[K: V]`
    Map {
        /// Key type.
        key:   Box<Self>,
        /// Value type.
        value: Box<Self>,
    },
    /// `A | B | ...`
    Algebraic(Vec<Self>),
    /// `Name<T, ...>`; the arguments are carried but not resolved.
    Contract {
        /// Base type name.
        name:      String,
        /// Type arguments.
        arguments: Vec<Self>,
    },
}

/// How a short-circuiting operator combines its operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    /// `&&`: the right side runs only if the left is `true`.
    And,
    /// `||`: the right side runs only if the left is `false`.
    Or,
}

/// One arm of a conditional expression: statements run for effect, then the
/// trailing command whose value the arm yields.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    /// Leading statements.
    pub statements: Vec<Command>,
    /// The arm's value; an empty arm yields unit.
    pub result:     Option<Box<Command>>,
}

/// A field of a lowered struct definition.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldCommand {
    /// A required field of the given type.
    Typed {
        /// Field name.
        name: String,
        /// Field type.
        ty:   TypeRef,
    },
    /// A field initialised from a default when the constructor omits it.
    Defaulted {
        /// Field name.
        name:    String,
        /// The default, evaluated once when the struct is defined.
        default: Command,
    },
}

/// A lowered parameter: name and declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterRef {
    /// The parameter name.
    pub name: String,
    /// The declared type.
    pub ty:   TypeRef,
}

/// The executable form of a statement or expression.
///
/// Commands are produced once per source unit by
/// [`crate::interpreter::lowering`] and may be executed any number of times.
/// Every variant records the source line it was lowered from, for error
/// reporting.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// A constant.
    Literal {
        /// The value.
        value: Literal,
        /// Source line.
        line:  usize,
    },
    /// Declares a binding in the current scope.
    DefineVariable {
        /// Declared name.
        name:          String,
        /// Annotated type; the initializer's type is used when absent.
        declared_type: Option<TypeRef>,
        /// Whether the binding may be reassigned.
        mutable:       bool,
        /// Whether the initializer runs on first read.
        lazy:          bool,
        /// Whether the binding is private to its namespace.
        restricted:    bool,
        /// The initializer, shared with a pending lazy binding.
        value:         Rc<Self>,
        /// Source line.
        line:          usize,
    },
    /// Reassigns a mutable binding.
    Assign {
        /// Target name.
        name:  String,
        /// New value.
        value: Box<Self>,
        /// Source line.
        line:  usize,
    },
    /// Sets a field of a struct instance.
    AssignProperty {
        /// The instance.
        object: Box<Self>,
        /// Field name.
        name:   String,
        /// New value.
        value:  Box<Self>,
        /// Source line.
        line:   usize,
    },
    /// Resolves a name.
    ReadVariable {
        /// The name.
        name: String,
        /// Source line.
        line: usize,
    },
    /// Reads a field or type member from a value.
    ReadProperty {
        /// The receiver.
        object: Box<Self>,
        /// Member name.
        name:   String,
        /// Source line.
        line:   usize,
    },
    /// Calls a function value.
    Invoke {
        /// Evaluates to the function.
        callee:    Box<Self>,
        /// Arguments, evaluated left to right in the caller's scope.
        arguments: Vec<Self>,
        /// Source line.
        line:      usize,
    },
    /// Calls a method found on a receiver's fields or type.
    InvokeOnReceiver {
        /// The receiver.
        receiver:  Box<Self>,
        /// Method name.
        method:    String,
        /// Arguments.
        arguments: Vec<Self>,
        /// Source line.
        line:      usize,
    },
    /// A binary operator dispatched as a method call on the left operand.
    BinaryOperator {
        /// The method implementing the operator.
        method: &'static str,
        /// Receiver.
        left:   Box<Self>,
        /// Sole argument.
        right:  Box<Self>,
        /// Whether the boolean result is inverted (`!=`).
        negate: bool,
        /// Source line.
        line:   usize,
    },
    /// `&&` and `||`.
    ShortCircuit {
        /// Which operator.
        logic: Logic,
        /// Always evaluated.
        left:  Box<Self>,
        /// Evaluated only when the left side does not decide the result.
        right: Box<Self>,
        /// Source line.
        line:  usize,
    },
    /// Creates a closure over the current scope.
    FunctionLiteral {
        /// Parameters.
        parameters:  Vec<ParameterRef>,
        /// Declared return type.
        return_type: Option<TypeRef>,
        /// Body, shared by every closure made from this literal.
        body:        Rc<[Self]>,
        /// Source line.
        line:        usize,
    },
    /// `[a, b, ...]`
    Collection {
        /// Elements.
        elements: Vec<Self>,
        /// Source line.
        line:     usize,
    },
    /// `[k: v, ...]`
    Map {
        /// Entries.
        entries: Vec<(Self, Self)>,
        /// Source line.
        line:    usize,
    },
    /// `value is Type`
    TypeCheck {
        /// Tested value.
        value: Box<Self>,
        /// Type.
        ty:    TypeRef,
        /// Source line.
        line:  usize,
    },
    /// `value as Type`
    TypeCast {
        /// Converted value.
        value: Box<Self>,
        /// Target type.
        ty:    TypeRef,
        /// Source line.
        line:  usize,
    },
    /// A scope yielding the value of its last command.
    Block {
        /// Commands.
        statements: Vec<Self>,
        /// Source line.
        line:       usize,
    },
    /// An `if` whose value is discarded.
    Conditional {
        /// Must evaluate to a boolean.
        condition: Box<Self>,
        /// Taken branch.
        then:      Vec<Self>,
        /// Other branch.
        otherwise: Option<Vec<Self>>,
        /// Source line.
        line:      usize,
    },
    /// An `if` in tail position, yielding the taken arm's value.
    ConditionalExpression {
        /// Must evaluate to a boolean.
        condition: Box<Self>,
        /// Taken arm.
        then:      Branch,
        /// Other arm; without one a false condition yields unit.
        otherwise: Option<Branch>,
        /// Source line.
        line:      usize,
    },
    /// `while`
    Loop {
        /// Re-evaluated before each iteration.
        condition: Box<Self>,
        /// Body.
        body:      Vec<Self>,
        /// Source line.
        line:      usize,
    },
    /// Leaves the enclosing call with a value.
    Return {
        /// Returned value.
        value: Box<Self>,
        /// Source line.
        line:  usize,
    },
    /// `namespace N`
    Namespace {
        /// Namespace name.
        name: String,
        /// Source line.
        line: usize,
    },
    /// `import N`
    Import {
        /// Namespace name.
        namespace: String,
        /// Source line.
        line:      usize,
    },
    /// `struct N { ... }`
    StructDefinition {
        /// Struct name.
        name:   String,
        /// Fields.
        fields: Vec<FieldCommand>,
        /// Source line.
        line:   usize,
    },
    /// `extend T [as alias] { ... }`
    Extend {
        /// Extended type.
        type_name: String,
        /// Receiver alias.
        alias:     Option<String>,
        /// Declarations to attach to the type.
        body:      Vec<Self>,
        /// Source line.
        line:      usize,
    },
}

impl Command {
    /// Gets the line number from `self`.
    #[must_use]
    pub const fn line_number(&self) -> usize {
        match self {
            Self::Literal { line, .. }
            | Self::DefineVariable { line, .. }
            | Self::Assign { line, .. }
            | Self::AssignProperty { line, .. }
            | Self::ReadVariable { line, .. }
            | Self::ReadProperty { line, .. }
            | Self::Invoke { line, .. }
            | Self::InvokeOnReceiver { line, .. }
            | Self::BinaryOperator { line, .. }
            | Self::ShortCircuit { line, .. }
            | Self::FunctionLiteral { line, .. }
            | Self::Collection { line, .. }
            | Self::Map { line, .. }
            | Self::TypeCheck { line, .. }
            | Self::TypeCast { line, .. }
            | Self::Block { line, .. }
            | Self::Conditional { line, .. }
            | Self::ConditionalExpression { line, .. }
            | Self::Loop { line, .. }
            | Self::Return { line, .. }
            | Self::Namespace { line, .. }
            | Self::Import { line, .. }
            | Self::StructDefinition { line, .. }
            | Self::Extend { line, .. } => *line,
        }
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items.iter()
         .map(ToString::to_string)
         .collect::<Vec<_>>()
         .join(", ")
}

fn write_commands(f: &mut fmt::Formatter<'_>, commands: &[Command]) -> fmt::Result {
    writeln!(f, "{{")?;
    for command in commands {
        writeln!(f, "{command}")?;
    }
    write!(f, "}}")
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{name}"),
            Self::Function { parameters,
                             return_type, } => write!(f, "(({}) => {return_type})", join(parameters)),
            Self::Collection(element) => write!(f, "[{element}]"),
            Self::Map { key, value } => write!(f, "[{key}: {value}]"),
            Self::Algebraic(variants) => {
                let rendered = variants.iter()
                                       .map(ToString::to_string)
                                       .collect::<Vec<_>>()
                                       .join(" | ");
                write!(f, "({rendered})")
            },
            Self::Contract { name, arguments } => write!(f, "{name}<{}>", join(arguments)),
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{{")?;
        for command in &self.statements {
            writeln!(f, "{command}")?;
        }
        if let Some(result) = &self.result {
            writeln!(f, "{result}")?;
        }
        write!(f, "}}")
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal { value, .. } => write!(f, "{value}"),
            Self::DefineVariable { name,
                                   declared_type,
                                   mutable,
                                   lazy,
                                   restricted,
                                   value,
                                   .. } => {
                write!(f, "let ")?;
                for (set, word) in [(*mutable, "mut "), (*lazy, "lazy "), (*restricted, "restricted ")] {
                    if set {
                        write!(f, "{word}")?;
                    }
                }
                write!(f, "{name}")?;
                if let Some(ty) = declared_type {
                    write!(f, ": {ty}")?;
                }
                write!(f, " = {value}")
            },
            Self::Assign { name, value, .. } => write!(f, "{name} = {value}"),
            Self::AssignProperty { object,
                                   name,
                                   value,
                                   .. } => write!(f, "{object}.{name} = {value}"),
            Self::ReadVariable { name, .. } => write!(f, "{name}"),
            Self::ReadProperty { object, name, .. } => write!(f, "{object}.{name}"),
            Self::Invoke { callee,
                           arguments,
                           .. } => write!(f, "{callee}({})", join(arguments)),
            Self::InvokeOnReceiver { receiver,
                                     method,
                                     arguments,
                                     .. } => write!(f, "{receiver}.{method}({})", join(arguments)),
            Self::BinaryOperator { method,
                                   left,
                                   right,
                                   negate,
                                   .. } => {
                if *negate {
                    write!(f, "{left}.{method}({right}).not()")
                } else {
                    write!(f, "{left}.{method}({right})")
                }
            },
            Self::ShortCircuit { logic,
                                 left,
                                 right,
                                 .. } => match logic {
                Logic::And => write!(f, "({left} && {right})"),
                Logic::Or => write!(f, "({left} || {right})"),
            },
            Self::FunctionLiteral { parameters,
                                    return_type,
                                    body,
                                    .. } => {
                let rendered = parameters.iter()
                                         .map(|p| format!("{} {}", p.ty, p.name))
                                         .collect::<Vec<_>>()
                                         .join(", ");
                write!(f, "(({rendered})")?;
                if let Some(return_type) = return_type {
                    write!(f, " {return_type}")?;
                }
                write!(f, " => ")?;
                write_commands(f, body)?;
                write!(f, ")")
            },
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
            Self::TypeCheck { value, ty, .. } => write!(f, "({value} is {ty})"),
            Self::TypeCast { value, ty, .. } => write!(f, "({value} as {ty})"),
            Self::Block { statements, .. } => write_commands(f, statements),
            Self::Conditional { condition,
                                then,
                                otherwise,
                                .. } => {
                write!(f, "if {condition} ")?;
                write_commands(f, then)?;
                if let Some(otherwise) = otherwise {
                    write!(f, " else ")?;
                    write_commands(f, otherwise)?;
                }
                Ok(())
            },
            Self::ConditionalExpression { condition,
                                          then,
                                          otherwise,
                                          .. } => {
                write!(f, "if {condition} {then}")?;
                if let Some(otherwise) = otherwise {
                    write!(f, " else {otherwise}")?;
                }
                Ok(())
            },
            Self::Loop { condition, body, .. } => {
                write!(f, "while {condition} ")?;
                write_commands(f, body)
            },
            Self::Return { value, .. } => write!(f, "return {value}"),
            Self::Namespace { name, .. } => write!(f, "namespace {name}"),
            Self::Import { namespace, .. } => write!(f, "import {namespace}"),
            Self::StructDefinition { name, fields, .. } => {
                writeln!(f, "struct {name} {{")?;
                for field in fields {
                    match field {
                        FieldCommand::Typed { name, ty } => writeln!(f, "{ty} {name}")?,
                        FieldCommand::Defaulted { name, default } => {
                            writeln!(f, "{name} = {default}")?;
                        },
                    }
                }
                write!(f, "}}")
            },
            Self::Extend { type_name,
                           alias,
                           body,
                           .. } => {
                write!(f, "extend {type_name} ")?;
                if let Some(alias) = alias {
                    write!(f, "as {alias} ")?;
                }
                write_commands(f, body)
            },
        }
    }
}
