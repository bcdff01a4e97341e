use thiserror::Error;

/// Represents all errors that can occur during evaluation.
///
/// Runtime errors are fatal to the running unit: the evaluator stops at the
/// first one and reports it. A `return` is never expressed through this type;
/// see [`crate::interpreter::evaluator::core::Flow`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// A name could not be resolved through the receiver, the scope chain,
    /// the call parameters or the struct constructors.
    #[error("Error on line {line}: Unknown name '{name}'.")]
    UnknownName {
        /// The unresolved name.
        name: String,
        /// The source line where the error occurred.
        line: usize,
    },
    /// A type annotation names a type that does not exist.
    #[error("Error on line {line}: Unknown type '{name}'.")]
    UnknownType {
        /// The unresolved type name.
        name: String,
        /// The source line where the error occurred.
        line: usize,
    },
    /// A value was used where its type is not accepted.
    #[error("Error on line {line}: Type mismatch in {site}: expected '{expected}', found '{found}'.")]
    TypeMismatch {
        /// What was being checked, e.g. `declaration of 'a'`.
        site:     String,
        /// The expected type.
        expected: String,
        /// The type of the offending value.
        found:    String,
        /// The source line where the error occurred.
        line:     usize,
    },
    /// Tried to assign to a variable that was not declared `mut`.
    #[error("Error on line {line}: Cannot assign twice to immutable variable '{name}'.")]
    ImmutableAssignment {
        /// The name of the variable.
        name: String,
        /// The source line where the error occurred.
        line: usize,
    },
    /// Declared a name that already exists in the same scope.
    #[error("Error on line {line}: '{name}' is already declared in this scope.")]
    Redeclaration {
        /// The name of the variable or type.
        name: String,
        /// The source line where the error occurred.
        line: usize,
    },
    /// Tried to call something that is not a function.
    #[error("Error on line {line}: Value of type '{found}' is not callable.")]
    NotCallable {
        /// The type of the value.
        found: String,
        /// The source line where the error occurred.
        line:  usize,
    },
    /// The receiver's type has no field or method with this name.
    #[error("Error on line {line}: Type '{type_name}' has no member '{member}'.")]
    UnknownMember {
        /// The receiver's type.
        type_name: String,
        /// The missing field or method.
        member:    String,
        /// The source line where the error occurred.
        line:      usize,
    },
    /// A `restricted` binding was read from another namespace.
    #[error("Error on line {line}: '{name}' is restricted to namespace '{namespace}'.")]
    RestrictedAccess {
        /// The name of the binding.
        name:      String,
        /// The namespace that owns it.
        namespace: String,
        /// The source line where the error occurred.
        line:      usize,
    },
    /// A `lazy` initializer needed its own value.
    #[error("Error on line {line}: Lazy variable '{name}' depends on itself.")]
    CyclicInitialization {
        /// The name of the variable.
        name: String,
        /// The source line where the error occurred.
        line: usize,
    },
    /// A required struct field was neither supplied nor defaulted.
    #[error("Error on line {line}: Missing value for field '{field}' of '{type_name}'.")]
    MissingField {
        /// The struct type.
        type_name: String,
        /// The field without a value.
        field:     String,
        /// The source line where the error occurred.
        line:      usize,
    },
    /// A condition evaluated to something other than a boolean.
    #[error("Error on line {line}: Expected boolean, found '{found}'.")]
    ExpectedBoolean {
        /// The type of the condition value.
        found: String,
        /// The source line where the error occurred.
        line:  usize,
    },
    /// The wrong number of arguments was supplied to a function.
    #[error("Error on line {line}: Expected {expected} argument(s), found {found}.")]
    ArgumentCountMismatch {
        /// The number of parameters.
        expected: usize,
        /// The number of arguments supplied.
        found:    usize,
        /// The source line where the error occurred.
        line:     usize,
    },
    /// `import` names a namespace no unit has declared.
    #[error("Error on line {line}: Unknown namespace '{name}'.")]
    UnknownNamespace {
        /// The namespace.
        name: String,
        /// The source line where the error occurred.
        line: usize,
    },
    /// A map key has a type that cannot be hashed.
    #[error("Error on line {line}: Values of type '{found}' cannot be used as map keys.")]
    InvalidMapKey {
        /// The type of the key.
        found: String,
        /// The source line where the error occurred.
        line:  usize,
    },
    /// A map lookup did not find its key.
    #[error("Error on line {line}: Key {key} is not present.")]
    MissingKey {
        /// The rendered key.
        key:  String,
        /// The source line where the error occurred.
        line: usize,
    },
    /// Tried to access a collection element outside the allowed bounds.
    #[error("Error on line {line}: Index out of bounds. Size is {size}, but found {found} instead.")]
    IndexOutOfBounds {
        /// The collection size.
        size:  usize,
        /// The index that was actually requested.
        found: i64,
        /// The source line where the error occurred.
        line:  usize,
    },
    /// An assertion failed during execution.
    #[error("Error on line {line}: Assertion failed.")]
    AssertionFailed {
        /// The source line where the error occurred.
        line: usize,
    },
    /// Attempted integer division by zero.
    #[error("Error on line {line}: Division by zero.")]
    DivisionByZero {
        /// The source line where the error occurred.
        line: usize,
    },
    /// Integer arithmetic overflowed.
    #[error("Error on line {line}: Integer overflow while trying to compute result.")]
    Overflow {
        /// The source line where the error occurred.
        line: usize,
    },
    /// A number could not be represented in the target type.
    #[error("Error on line {line}: Value {value} cannot be converted to '{target}'.")]
    InvalidConversion {
        /// The rendered value.
        value:  String,
        /// The target type.
        target: String,
        /// The source line where the error occurred.
        line:   usize,
    },
}

impl RuntimeError {
    /// Gets the line number from `self`.
    ///
    /// ## Example
    /// ```
    /// use kiln::error::RuntimeError;
    ///
    /// let error = RuntimeError::DivisionByZero { line: 5 };
    ///
    /// assert_eq!(error.line_number(), 5);
    /// ```
    #[must_use]
    pub const fn line_number(&self) -> usize {
        match self {
            Self::UnknownName { line, .. }
            | Self::UnknownType { line, .. }
            | Self::TypeMismatch { line, .. }
            | Self::ImmutableAssignment { line, .. }
            | Self::Redeclaration { line, .. }
            | Self::NotCallable { line, .. }
            | Self::UnknownMember { line, .. }
            | Self::MissingField { line, .. }
            | Self::RestrictedAccess { line, .. }
            | Self::CyclicInitialization { line, .. }
            | Self::ExpectedBoolean { line, .. }
            | Self::ArgumentCountMismatch { line, .. }
            | Self::UnknownNamespace { line, .. }
            | Self::InvalidMapKey { line, .. }
            | Self::MissingKey { line, .. }
            | Self::IndexOutOfBounds { line, .. }
            | Self::AssertionFailed { line }
            | Self::DivisionByZero { line }
            | Self::Overflow { line }
            | Self::InvalidConversion { line, .. } => *line,
        }
    }
}
