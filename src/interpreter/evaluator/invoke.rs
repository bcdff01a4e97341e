use std::{cell::RefCell, collections::HashMap, rc::Rc};

use tracing::trace;

use crate::{
    error::RuntimeError,
    interpreter::{
        context::Receiver,
        evaluator::core::{EvalResult, Evaluator},
        types::{StructType, Type},
        value::{
            core::{Instance, Value},
            function::{Function, UserFunction},
        },
    },
    util::num::{f64_to_i64_checked, promote},
};

impl Evaluator {
    /// Calls a value with already evaluated arguments.
    ///
    /// # Errors
    /// Returns [`RuntimeError::NotCallable`] if `callee` is not a function,
    /// or whatever the call itself raises.
    pub fn call_value(&mut self, callee: &Value, arguments: Vec<Value>, line: usize) -> EvalResult<Value> {
        match callee {
            Value::Function(function) => self.call_function(function, None, arguments, line),
            other => Err(RuntimeError::NotCallable { found: other.runtime_type(&self.registry)
                                                                 .to_string(),
                                                     line }),
        }
    }

    /// Calls a function, binding `receiver` for methods.
    ///
    /// # Errors
    /// - [`RuntimeError::ArgumentCountMismatch`] on a wrong number of
    ///   arguments.
    /// - [`RuntimeError::TypeMismatch`] if an argument or the declared return
    ///   value is not accepted.
    /// - Any error raised by the body.
    pub fn call_function(&mut self,
                         function: &Rc<Function>,
                         receiver: Option<&Value>,
                         arguments: Vec<Value>,
                         line: usize)
                         -> EvalResult<Value> {
        match function.as_ref() {
            Function::User(user) => self.call_user(user, receiver, arguments, line),
            Function::Native(native) => {
                if !native.arity.check(arguments.len()) {
                    return Err(RuntimeError::ArgumentCountMismatch { expected: native.arity.minimum(),
                                                                     found: arguments.len(),
                                                                     line });
                }
                (native.func)(self, receiver.unwrap_or(&Value::Unit), &arguments, line)
            },
            Function::Constructor(structure) => self.construct(structure, arguments, line),
            Function::Bound { receiver, function } => {
                self.call_function(function, Some(receiver), arguments, line)
            },
        }
    }

    fn call_user(&mut self,
                 function: &UserFunction,
                 receiver: Option<&Value>,
                 arguments: Vec<Value>,
                 line: usize)
                 -> EvalResult<Value> {
        let signature = &function.signature;
        if signature.parameters.len() != arguments.len() {
            return Err(RuntimeError::ArgumentCountMismatch { expected: signature.parameters.len(),
                                                             found: arguments.len(),
                                                             line });
        }
        let arguments = signature.parameters
                                 .iter()
                                 .zip(&function.parameter_names)
                                 .zip(arguments)
                                 .map(|((expected, name), argument)| {
                                     self.admit(expected, argument, || format!("parameter '{name}'"), line)
                                 })
                                 .collect::<EvalResult<Vec<_>>>()?;

        let frame = self.pool.acquire(&function.scope);
        frame.set_namespace(function.namespace.clone());
        for (name, argument) in function.parameter_names.iter().zip(arguments) {
            frame.bind_parameter(name, argument);
        }
        if let Some(receiver) = receiver {
            frame.bind_receiver(Receiver { value: receiver.clone(),
                                           alias: function.receiver_alias.clone(), });
        }
        trace!(line, "entering call frame");
        let result = self.execute_sequence(&function.body, &frame);
        self.pool.release(frame);

        let value = result?.into_value();
        if function.checks_return {
            return self.admit(&signature.return_type, value, || "return value".to_string(), line);
        }
        Ok(value)
    }

    /// Builds an instance from positional arguments, filling omitted trailing
    /// fields from their defaults.
    fn construct(&self, structure: &Rc<StructType>, arguments: Vec<Value>, line: usize) -> EvalResult<Value> {
        if arguments.len() > structure.fields.len() {
            return Err(RuntimeError::ArgumentCountMismatch { expected: structure.fields.len(),
                                                             found: arguments.len(),
                                                             line });
        }
        let mut supplied = arguments.into_iter();
        let mut fields = HashMap::with_capacity(structure.fields.len());
        for field in &structure.fields {
            let value = match supplied.next() {
                Some(value) => self.admit(&field.ty,
                                          value,
                                          || format!("field '{}' of '{}'", field.name, structure.name),
                                          line)?,
                None => field.default
                             .clone()
                             .ok_or_else(|| RuntimeError::MissingField { type_name: structure.name.clone(),
                                                                         field: field.name.clone(),
                                                                         line })?,
            };
            fields.insert(field.name.clone(), value);
        }
        Ok(Value::Instance(Rc::new(Instance { ty:     Rc::clone(structure),
                                              fields: RefCell::new(fields), })))
    }

    /// Invokes `method` on `receiver`.
    ///
    /// A function stored in an instance field is called as a plain function.
    /// Otherwise the method comes from the receiver's type and is called with
    /// the receiver bound.
    ///
    /// # Errors
    /// - [`RuntimeError::UnknownMember`] if neither exists.
    /// - [`RuntimeError::NotCallable`] if the member is not a function.
    pub fn invoke_method(&mut self,
                         receiver: &Value,
                         method: &str,
                         arguments: Vec<Value>,
                         line: usize)
                         -> EvalResult<Value> {
        if let Value::Instance(instance) = receiver {
            let field = instance.fields.borrow().get(method).cloned();
            if let Some(field) = field {
                return self.call_value(&field, arguments, line);
            }
        }
        match self.find_type_member(receiver, method) {
            Some(Value::Function(function)) => self.call_function(&function, Some(receiver), arguments, line),
            Some(other) => Err(RuntimeError::NotCallable { found: other.runtime_type(&self.registry)
                                                                       .to_string(),
                                                           line }),
            None => Err(RuntimeError::UnknownMember { type_name: receiver.runtime_type(&self.registry)
                                                                         .to_string(),
                                                      member: method.to_string(),
                                                      line }),
        }
    }

    /// Converts `value` for `value as target`.
    ///
    /// A value the target already accepts is returned unchanged. Beyond that,
    /// `Int` and `Float` convert into each other, anything converts to
    /// `String`, and strings parse into numbers.
    ///
    /// # Errors
    /// Returns [`RuntimeError::InvalidConversion`] when no conversion applies
    /// or the value cannot be represented in the target type.
    pub fn convert(&self, value: Value, target: &Type, line: usize) -> EvalResult<Value> {
        let found = value.runtime_type(&self.registry);
        if target.accepts(&found) {
            return Ok(value);
        }
        let registry = &self.registry;
        let invalid = |value: &Value| RuntimeError::InvalidConversion { value: value.repr(),
                                                                        target: target.to_string(),
                                                                        line };
        match &value {
            _ if target.is_nominal(&registry.string) => Ok(Value::from(value.to_string())),
            Value::Int(i) if target.is_nominal(&registry.float) => Ok(Value::Float(promote(*i, line)?)),
            Value::Float(x) if target.is_nominal(&registry.int) => Ok(Value::Int(f64_to_i64_checked(*x, line)?)),
            Value::Str(s) if target.is_nominal(&registry.int) => {
                s.trim().parse::<i64>().map(Value::Int).map_err(|_| invalid(&value))
            },
            Value::Str(s) if target.is_nominal(&registry.float) => {
                s.trim().parse::<f64>().map(Value::Float).map_err(|_| invalid(&value))
            },
            _ => Err(invalid(&value)),
        }
    }
}
