use std::{fmt, rc::Rc};

use crate::interpreter::{
    command::Command,
    context::Context,
    evaluator::builtin::NativeDef,
    types::{FunctionType, StructType, Type, TypeRegistry},
    value::core::Value,
};

/// A function written in the language: a closure over its defining scope.
pub struct UserFunction {
    /// Parameter and return types, resolved when the literal was evaluated.
    pub signature:       Rc<FunctionType>,
    /// Parameter names, in signature order.
    pub parameter_names: Vec<String>,
    /// Whether the literal declared its return type.
    pub checks_return:   bool,
    /// The lowered body.
    pub body:            Rc<[Command]>,
    /// The scope the literal was evaluated in; call frames are its children.
    pub scope:           Rc<Context>,
    /// Alias of the receiver when the literal was written inside
    /// `extend T as alias`.
    pub receiver_alias:  Option<String>,
    /// Namespace the literal was written in; its body runs there.
    pub namespace:       Option<String>,
}

/// Anything that can be invoked.
pub enum Function {
    /// A closure.
    User(UserFunction),
    /// A function implemented by the interpreter.
    Native(&'static NativeDef),
    /// The implicit constructor of a struct type.
    Constructor(Rc<StructType>),
    /// A function read off a receiver; the receiver is bound on every call.
    Bound {
        /// The value bound as receiver.
        receiver: Value,
        /// The underlying function.
        function: Rc<Self>,
    },
}

impl UserFunction {
    /// Returns a copy of the closure that declares `return_type` and checks
    /// it on every call.
    #[must_use]
    pub fn with_return_type(&self, return_type: Type) -> Self {
        let signature = FunctionType { parameters: self.signature.parameters.clone(),
                                       return_type };
        Self { signature:       Rc::new(signature),
               parameter_names: self.parameter_names.clone(),
               checks_return:   true,
               body:            Rc::clone(&self.body),
               scope:           Rc::clone(&self.scope),
               receiver_alias:  self.receiver_alias.clone(),
               namespace:       self.namespace.clone(), }
    }
}

impl Function {
    /// Gives a function whose return type was never declared the expected
    /// one. Returns `None` if the function already has a checked return type.
    #[must_use]
    pub fn with_return_type(&self, return_type: &Type) -> Option<Self> {
        match self {
            Self::User(function) if !function.checks_return => {
                Some(Self::User(function.with_return_type(return_type.clone())))
            },
            Self::Bound { receiver, function } => {
                function.with_return_type(return_type)
                        .map(|function| Self::Bound { receiver: receiver.clone(),
                                                      function: Rc::new(function), })
            },
            _ => None,
        }
    }


    /// Returns the function's type.
    ///
    /// Natives accept anything and return anything; a constructor takes its
    /// fields in declaration order and returns its struct type.
    #[must_use]
    pub fn signature(&self, registry: &TypeRegistry) -> Rc<FunctionType> {
        match self {
            Self::User(function) => Rc::clone(&function.signature),
            Self::Native(native) => {
                Rc::new(FunctionType { parameters:  vec![registry.any.clone(); native.arity.minimum()],
                                       return_type: registry.any.clone(), })
            },
            Self::Constructor(structure) => {
                Rc::new(FunctionType { parameters:  structure.fields
                                                             .iter()
                                                             .map(|field| field.ty.clone())
                                                             .collect(),
                                       return_type: Type::Struct(Rc::clone(structure)), })
            },
            Self::Bound { function, .. } => function.signature(registry),
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({self})")
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(function) => {
                let parameters = function.signature
                                         .parameters
                                         .iter()
                                         .zip(&function.parameter_names)
                                         .map(|(ty, name)| format!("{ty} {name}"))
                                         .collect::<Vec<_>>()
                                         .join(", ");
                write!(f, "({parameters}) => {}", function.signature.return_type)
            },
            Self::Native(native) => write!(f, "<native {}>", native.name),
            Self::Constructor(structure) => write!(f, "<constructor {}>", structure.name),
            Self::Bound { function, .. } => write!(f, "{function}"),
        }
    }
}
