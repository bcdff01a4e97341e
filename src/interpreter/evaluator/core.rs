use std::{
    collections::{BTreeMap, HashSet},
    io::Write,
    rc::Rc,
};

use tracing::{debug, trace, warn};

use crate::{
    error::RuntimeError,
    interpreter::{
        command::{Branch, Command, FieldCommand, Logic, TypeRef},
        context::{Binding, BindingState, Context, ContextPool},
        evaluator::builtin,
        types::{Field, FunctionType, MapType, StructType, Type, TypeBindings, TypeRegistry},
        value::{
            core::{Instance, Value},
            function::{Function, UserFunction},
            map_key::MapKey,
        },
    },
};

/// Result type used by the evaluator.
///
/// All evaluation functions return either a value of type `T` or a
/// `RuntimeError` describing the failure.
pub type EvalResult<T> = Result<T, RuntimeError>;

/// How a command finished.
///
/// Together with the error case of [`EvalResult`] this forms the three-way
/// result of evaluation: a normal value, a `return` travelling up to the
/// nearest call boundary, or a runtime error.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow<T = Value> {
    /// Evaluation completed with a value.
    Normal(T),
    /// A `return` is unwinding with its value.
    Return(Value),
}

impl Flow {
    /// Returns the carried value, whichever way evaluation finished.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Normal(value) | Self::Return(value) => value,
        }
    }
}

/// Unwraps a normal result, or leaves the current function with the
/// unwinding `return`.
macro_rules! value_of {
    ($flow:expr) => {
        match $flow {
            Flow::Normal(value) => value,
            Flow::Return(value) => return Ok(Flow::Return(value)),
        }
    };
}

/// Iterates over a scope and its ancestors as shared handles, innermost first.
pub(crate) fn scopes(context: &Rc<Context>) -> impl Iterator<Item = Rc<Context>> {
    std::iter::successors(Some(Rc::clone(context)), |scope| scope.parent().cloned())
}

/// Executes commands.
///
/// The evaluator holds what outlives a single scope: the type registry with
/// the shared member tables, the pool of reusable frames, the namespaces
/// declared so far and the stream program output is written to.
///
/// # Example
/// ```
/// use kiln::interpreter::{
///     evaluator::core::Evaluator,
///     lowering::lower_program,
///     parser::core::parse_source,
///     value::core::Value,
/// };
///
/// let mut evaluator = Evaluator::new(Box::new(std::io::sink()));
/// let scope = evaluator.global_scope().unwrap();
///
/// let outcome = parse_source("demo", "let a = 20\na * 2 + 2");
/// let commands = lower_program(&outcome.statements);
///
/// let last = commands.iter()
///                    .map(|command| evaluator.execute(command, &scope).unwrap().into_value())
///                    .last();
/// assert_eq!(last, Some(Value::Int(42)));
/// ```
pub struct Evaluator {
    /// Built-in types and shared member tables.
    pub registry:    TypeRegistry,
    pub(super) pool: ContextPool,
    output:          Box<dyn Write>,
    namespaces:      HashSet<String>,
}

impl Evaluator {
    /// Creates an evaluator writing program output to `output`, with the
    /// native methods installed on the built-in types.
    #[must_use]
    pub fn new(output: Box<dyn Write>) -> Self {
        let registry = TypeRegistry::new();
        builtin::install(&registry);
        Self { registry,
               pool: ContextPool::default(),
               output,
               namespaces: HashSet::new() }
    }

    /// Creates the scope programs run in.
    ///
    /// Its parent holds the built-in types and global natives, so programs may
    /// shadow them without redeclaring.
    ///
    /// # Errors
    /// Never fails on a fresh prelude; redeclaration errors are propagated.
    pub fn global_scope(&mut self) -> EvalResult<Rc<Context>> {
        let prelude = Context::root();
        for (name, ty) in self.registry.builtins() {
            prelude.define_type(name, ty.clone(), 0)?;
        }
        for native in builtin::globals() {
            let function = Rc::new(Function::Native(native));
            let ty = Type::Function(function.signature(&self.registry));
            prelude.declare(native.name, Binding::ready(Value::Function(function), ty, false), 0)?;
        }
        Ok(self.pool.acquire(&prelude))
    }

    /// Returns `true` once some unit has declared `namespace`.
    #[must_use]
    pub fn knows_namespace(&self, namespace: &str) -> bool {
        self.namespaces.contains(namespace)
    }

    /// Number of frames ready for reuse.
    #[must_use]
    pub fn pool_available(&self) -> usize {
        self.pool.available()
    }

    /// Writes one line of program output.
    pub fn write_output(&mut self, text: &str) {
        if let Err(error) = writeln!(self.output, "{text}") {
            warn!(%error, "failed to write program output");
        }
    }

    /// Executes a single command in `context`.
    ///
    /// Statements that only have an effect (declarations, assignments,
    /// definitions, loops and discarded conditionals) produce unit.
    ///
    /// # Errors
    /// Returns the first [`RuntimeError`] raised while executing.
    pub fn execute(&mut self, command: &Command, context: &Rc<Context>) -> EvalResult<Flow> {
        match command {
            Command::Literal { value, .. } => Ok(Flow::Normal(value.into())),
            Command::DefineVariable { name,
                                      declared_type,
                                      mutable,
                                      lazy,
                                      restricted,
                                      value,
                                      line, } => {
                let declaration = Declaration { name,
                                                declared_type: declared_type.as_ref(),
                                                mutable: *mutable,
                                                lazy: *lazy,
                                                restricted: *restricted,
                                                line: *line };
                self.define_variable(&declaration, value, context)
            },
            Command::Assign { name, value, line } => self.assign(name, value, context, *line),
            Command::AssignProperty { object,
                                      name,
                                      value,
                                      line, } => self.assign_property(object, name, value, context, *line),
            Command::ReadVariable { name, line } => Ok(Flow::Normal(self.lookup(name, context, *line)?)),
            Command::ReadProperty { object, name, line } => {
                let object = value_of!(self.execute(object, context)?);
                Ok(Flow::Normal(self.member(&object, name, *line)?))
            },
            Command::Invoke { callee,
                              arguments,
                              line, } => {
                let callee = value_of!(self.execute(callee, context)?);
                let arguments = value_of!(self.evaluate_all(arguments, context)?);
                Ok(Flow::Normal(self.call_value(&callee, arguments, *line)?))
            },
            Command::InvokeOnReceiver { receiver,
                                        method,
                                        arguments,
                                        line, } => {
                let receiver = value_of!(self.execute(receiver, context)?);
                let arguments = value_of!(self.evaluate_all(arguments, context)?);
                Ok(Flow::Normal(self.invoke_method(&receiver, method, arguments, *line)?))
            },
            Command::BinaryOperator { method,
                                      left,
                                      right,
                                      negate,
                                      line, } => {
                let left = value_of!(self.execute(left, context)?);
                let right = value_of!(self.execute(right, context)?);
                let result = self.invoke_method(&left, method, vec![right], *line)?;
                if *negate {
                    return Ok(Flow::Normal(self.invoke_method(&result, "not", Vec::new(), *line)?));
                }
                Ok(Flow::Normal(result))
            },
            Command::ShortCircuit { logic,
                                    left,
                                    right,
                                    line, } => {
                let left = value_of!(self.execute(left, context)?).as_bool(&self.registry, *line)?;
                match (logic, left) {
                    (Logic::And, false) => Ok(Flow::Normal(Value::Bool(false))),
                    (Logic::Or, true) => Ok(Flow::Normal(Value::Bool(true))),
                    _ => {
                        let right = value_of!(self.execute(right, context)?);
                        Ok(Flow::Normal(Value::Bool(right.as_bool(&self.registry, *line)?)))
                    },
                }
            },
            Command::FunctionLiteral { parameters,
                                       return_type,
                                       body,
                                       line, } => {
                let parameter_types = parameters.iter()
                                                .map(|parameter| self.resolve_type(&parameter.ty, context, *line))
                                                .collect::<EvalResult<Vec<_>>>()?;
                let declared_return = return_type.as_ref()
                                                 .map(|ty| self.resolve_type(ty, context, *line))
                                                 .transpose()?;
                let checks_return = declared_return.is_some();
                let signature = FunctionType { parameters:  parameter_types,
                                               return_type: declared_return.unwrap_or_else(|| self.registry.any.clone()), };
                let function = UserFunction { signature: Rc::new(signature),
                                              parameter_names: parameters.iter().map(|p| p.name.clone()).collect(),
                                              checks_return,
                                              body: Rc::clone(body),
                                              scope: Rc::clone(context),
                                              receiver_alias: context.extension_alias(),
                                              namespace: context.namespace() };
                Ok(Flow::Normal(Value::Function(Rc::new(Function::User(function)))))
            },
            Command::Collection { elements, .. } => {
                let items = value_of!(self.evaluate_all(elements, context)?);
                let element_type = self.common_type(items.iter());
                Ok(Flow::Normal(Value::collection(element_type, items)))
            },
            Command::Map { entries, line } => self.map_literal(entries, context, *line),
            Command::TypeCheck { value, ty, line } => {
                let value = value_of!(self.execute(value, context)?);
                let ty = self.resolve_type(ty, context, *line)?;
                Ok(Flow::Normal(Value::Bool(ty.accepts(&value.runtime_type(&self.registry)))))
            },
            Command::TypeCast { value, ty, line } => {
                let value = value_of!(self.execute(value, context)?);
                let ty = self.resolve_type(ty, context, *line)?;
                Ok(Flow::Normal(self.convert(value, &ty, *line)?))
            },
            Command::Block { statements, .. } => self.execute_scoped(statements, context),
            Command::Conditional { condition,
                                   then,
                                   otherwise,
                                   line, } => {
                let taken = value_of!(self.execute(condition, context)?).as_bool(&self.registry, *line)?;
                let branch = if taken { Some(then) } else { otherwise.as_ref() };
                if let Some(branch) = branch {
                    value_of!(self.execute_scoped(branch, context)?);
                }
                Ok(Flow::Normal(Value::Unit))
            },
            Command::ConditionalExpression { condition,
                                             then,
                                             otherwise,
                                             line, } => {
                let taken = value_of!(self.execute(condition, context)?).as_bool(&self.registry, *line)?;
                let branch = if taken { Some(then) } else { otherwise.as_ref() };
                match branch {
                    Some(branch) => self.execute_branch(branch, context),
                    None => Ok(Flow::Normal(Value::Unit)),
                }
            },
            Command::Loop { condition, body, line } => {
                while value_of!(self.execute(condition, context)?).as_bool(&self.registry, *line)? {
                    value_of!(self.execute_scoped(body, context)?);
                }
                Ok(Flow::Normal(Value::Unit))
            },
            Command::Return { value, .. } => {
                let value = value_of!(self.execute(value, context)?);
                Ok(Flow::Return(value))
            },
            Command::Namespace { name, .. } => {
                debug!(namespace = %name, "entering namespace");
                self.namespaces.insert(name.clone());
                context.set_namespace(Some(name.clone()));
                Ok(Flow::Normal(Value::Unit))
            },
            Command::Import { namespace, line } => {
                if !self.knows_namespace(namespace) {
                    return Err(RuntimeError::UnknownNamespace { name: namespace.clone(),
                                                                line: *line, });
                }
                context.record_import(namespace);
                Ok(Flow::Normal(Value::Unit))
            },
            Command::StructDefinition { name, fields, line } => {
                self.define_struct(name, fields, context, *line)
            },
            Command::Extend { type_name,
                              alias,
                              body,
                              line, } => self.extend(type_name, alias.as_deref(), body, context, *line),
        }
    }

    /// Executes commands in order in `context`, yielding the value of the
    /// last one, or unit if there are none. A `return` stops the sequence.
    ///
    /// # Errors
    /// Returns the first [`RuntimeError`] raised.
    pub fn execute_sequence(&mut self, commands: &[Command], context: &Rc<Context>) -> EvalResult<Flow> {
        let mut last = Value::Unit;
        for command in commands {
            last = value_of!(self.execute(command, context)?);
        }
        Ok(Flow::Normal(last))
    }

    /// Runs commands in a fresh child scope, which is returned to the pool on
    /// every exit path.
    fn execute_scoped(&mut self, commands: &[Command], context: &Rc<Context>) -> EvalResult<Flow> {
        let scope = self.pool.acquire(context);
        let result = self.execute_sequence(commands, &scope);
        self.pool.release(scope);
        result
    }

    fn execute_branch(&mut self, branch: &Branch, context: &Rc<Context>) -> EvalResult<Flow> {
        let scope = self.pool.acquire(context);
        let result = self.execute_sequence(&branch.statements, &scope)
                         .and_then(|flow| match (flow, &branch.result) {
                             (Flow::Return(value), _) => Ok(Flow::Return(value)),
                             (Flow::Normal(_), Some(result)) => self.execute(result, &scope),
                             (Flow::Normal(_), None) => Ok(Flow::Normal(Value::Unit)),
                         });
        self.pool.release(scope);
        result
    }

    /// Evaluates commands left to right.
    pub(crate) fn evaluate_all(&mut self,
                               commands: &[Command],
                               context: &Rc<Context>)
                               -> EvalResult<Flow<Vec<Value>>> {
        let mut values = Vec::with_capacity(commands.len());
        for command in commands {
            values.push(value_of!(self.execute(command, context)?));
        }
        Ok(Flow::Normal(values))
    }

    fn define_variable(&mut self,
                       declaration: &Declaration<'_>,
                       initializer: &Rc<Command>,
                       context: &Rc<Context>)
                       -> EvalResult<Flow> {
        let Declaration { name, line, .. } = *declaration;
        let declared = declaration.declared_type
                                  .map(|ty| self.resolve_type(ty, context, line))
                                  .transpose()?;
        let namespace = if declaration.restricted { context.namespace() } else { None };

        if declaration.lazy {
            let binding = Binding { state: BindingState::Pending(Rc::clone(initializer)),
                                    ty: declared,
                                    mutable: declaration.mutable,
                                    namespace };
            context.declare(name, binding, line)?;
            trace!(name, "declared lazy binding");
            return Ok(Flow::Normal(Value::Unit));
        }

        let value = value_of!(self.execute(initializer, context)?);
        let (value, ty) = match declared {
            Some(declared) => {
                (self.admit(&declared, value, || format!("declaration of '{name}'"), line)?, declared)
            },
            None => {
                let found = value.runtime_type(&self.registry);
                (value, found)
            },
        };
        let mut binding = Binding::ready(value, ty, declaration.mutable);
        binding.namespace = namespace;
        context.declare(name, binding, line)?;
        Ok(Flow::Normal(Value::Unit))
    }

    /// Assigns to a name, resolved in the same order as [`Evaluator::lookup`]:
    /// a field of the nearest receiver, then a variable, and a parameter last,
    /// which is always immutable.
    fn assign(&mut self, name: &str, value: &Command, context: &Rc<Context>, line: usize) -> EvalResult<Flow> {
        let value = value_of!(self.execute(value, context)?);
        if let Some(receiver) = scopes(context).find_map(|scope| scope.receiver())
           && let Value::Instance(instance) = &receiver.value
           && instance.ty.field(name).is_some()
        {
            self.set_field(instance, name, value, line)?;
            return Ok(Flow::Normal(Value::Unit));
        }
        let namespace = context.namespace();
        for scope in scopes(context) {
            if let Some(binding) = scope.binding(name) {
                if let Some(owner) = &binding.namespace
                   && !binding.visible_from(namespace.as_deref())
                {
                    return Err(RuntimeError::RestrictedAccess { name: name.to_string(),
                                                                namespace: owner.clone(),
                                                                line });
                }
                if !binding.mutable {
                    return Err(RuntimeError::ImmutableAssignment { name: name.to_string(),
                                                                   line });
                }
                let value = match &binding.ty {
                    Some(expected) => self.admit(expected, value, || format!("assignment to '{name}'"), line)?,
                    None => value,
                };
                let found = value.runtime_type(&self.registry);
                scope.store(name, value, Some(found));
                return Ok(Flow::Normal(Value::Unit));
            }
        }
        if scopes(context).any(|scope| scope.parameter(name).is_some()) {
            return Err(RuntimeError::ImmutableAssignment { name: name.to_string(),
                                                           line });
        }
        Err(RuntimeError::UnknownName { name: name.to_string(),
                                        line })
    }

    fn assign_property(&mut self,
                       object: &Command,
                       name: &str,
                       value: &Command,
                       context: &Rc<Context>,
                       line: usize)
                       -> EvalResult<Flow> {
        let object = value_of!(self.execute(object, context)?);
        let value = value_of!(self.execute(value, context)?);
        match &object {
            Value::Instance(instance) if instance.ty.field(name).is_some() => {
                self.set_field(instance, name, value, line)?;
                Ok(Flow::Normal(Value::Unit))
            },
            other => Err(RuntimeError::UnknownMember { type_name: other.runtime_type(&self.registry)
                                                                       .to_string(),
                                                       member: name.to_string(),
                                                       line }),
        }
    }

    fn set_field(&self,
                 instance: &Instance,
                 name: &str,
                 value: Value,
                 line: usize)
                 -> EvalResult<()> {
        let value = match instance.ty.field(name) {
            Some(field) => {
                self.admit(&field.ty, value, || format!("field '{name}' of '{}'", instance.ty.name), line)?
            },
            None => value,
        };
        instance.fields.borrow_mut().insert(name.to_string(), value);
        Ok(())
    }

    /// Resolves a name.
    ///
    /// The order is fixed:
    /// 1. the nearest bound receiver: `this`, its alias, its fields, then the
    ///    members of its type;
    /// 2. declared variables, innermost scope first, up to the root;
    /// 3. call parameters, innermost frame first;
    /// 4. the implicit constructor of a struct type.
    ///
    /// A variable anywhere in the chain therefore wins over a parameter of
    /// the same name.
    ///
    /// # Errors
    /// - [`RuntimeError::RestrictedAccess`] for a `restricted` binding owned by
    ///   another namespace.
    /// - [`RuntimeError::CyclicInitialization`] for a lazy binding read while
    ///   it initializes.
    /// - [`RuntimeError::UnknownName`] if nothing matches.
    ///
    /// # Example
    /// ```
    /// use kiln::{execute, interpreter::value::core::Value};
    ///
    /// let report = execute("demo", "let n = 1\nlet f = (Int n) => n\nf(5)", false).unwrap();
    ///
    /// assert_eq!(report.last(), Some(&Value::Int(1)));
    /// ```
    pub fn lookup(&mut self, name: &str, context: &Rc<Context>, line: usize) -> EvalResult<Value> {
        if let Some(receiver) = scopes(context).find_map(|scope| scope.receiver()) {
            if receiver.answers_to(name) {
                return Ok(receiver.value);
            }
            if let Some(value) = self.find_member(&receiver.value, name) {
                return Ok(value);
            }
        }
        let namespace = context.namespace();
        for scope in scopes(context) {
            if let Some(binding) = scope.binding(name) {
                if let Some(owner) = &binding.namespace
                   && !binding.visible_from(namespace.as_deref())
                {
                    return Err(RuntimeError::RestrictedAccess { name: name.to_string(),
                                                                namespace: owner.clone(),
                                                                line });
                }
                return self.read_binding(&scope, name, binding, line);
            }
        }
        if let Some(value) = scopes(context).find_map(|scope| scope.parameter(name)) {
            return Ok(value);
        }
        match context.lookup_type(name) {
            Some(Type::Struct(structure)) => Ok(Value::Function(Rc::new(Function::Constructor(structure)))),
            _ => Err(RuntimeError::UnknownName { name: name.to_string(),
                                                 line }),
        }
    }

    fn read_binding(&mut self,
                    scope: &Rc<Context>,
                    name: &str,
                    binding: Binding,
                    line: usize)
                    -> EvalResult<Value> {
        match binding.state {
            BindingState::Ready(value) => Ok(value),
            BindingState::Pending(initializer) => self.force(scope, name, initializer, binding.ty, line),
            BindingState::Forcing => Err(RuntimeError::CyclicInitialization { name: name.to_string(),
                                                                              line }),
        }
    }

    /// Runs a lazy initializer in its declaring scope and caches the result.
    /// On failure the binding is left pending.
    fn force(&mut self,
             scope: &Rc<Context>,
             name: &str,
             initializer: Rc<Command>,
             declared: Option<Type>,
             line: usize)
             -> EvalResult<Value> {
        trace!(name, "forcing lazy binding");
        scope.set_state(name, BindingState::Forcing);
        let result = self.execute(&initializer, scope)
                         .map(Flow::into_value)
                         .and_then(|value| match &declared {
                             Some(expected) => self.admit(expected, value, || format!("declaration of '{name}'"), line),
                             None => Ok(value),
                         })
                         .map(|value| {
                             let found = value.runtime_type(&self.registry);
                             (value, found)
                         });
        match result {
            Ok((value, found)) => {
                scope.store(name, value.clone(), Some(found));
                Ok(value)
            },
            Err(error) => {
                scope.set_state(name, BindingState::Pending(initializer));
                Err(error)
            },
        }
    }

    /// Looks up a type-level member of `value`, falling back to the members
    /// every value has. Functions are returned unbound.
    pub(crate) fn find_type_member(&self, value: &Value, name: &str) -> Option<Value> {
        let ty = value.runtime_type(&self.registry);
        self.registry
            .bindings_for(&ty)
            .and_then(|bindings| bindings.get(name))
            .or_else(|| {
                self.registry
                    .any
                    .own_bindings()
                    .and_then(|bindings| bindings.get(name))
            })
    }

    /// Looks up a field or type member of `value`. Type-level functions come
    /// back bound to `value`.
    pub(crate) fn find_member(&self, value: &Value, name: &str) -> Option<Value> {
        if let Value::Instance(instance) = value
           && let Some(field) = instance.fields.borrow().get(name)
        {
            return Some(field.clone());
        }
        let member = self.find_type_member(value, name)?;
        Some(match member {
            Value::Function(function) => {
                Value::Function(Rc::new(Function::Bound { receiver: value.clone(),
                                                          function }))
            },
            other => other,
        })
    }

    /// Reads a field or member of `value`.
    ///
    /// # Errors
    /// Returns [`RuntimeError::UnknownMember`] if there is none.
    pub fn member(&self, value: &Value, name: &str, line: usize) -> EvalResult<Value> {
        self.find_member(value, name)
            .ok_or_else(|| RuntimeError::UnknownMember { type_name: value.runtime_type(&self.registry)
                                                                         .to_string(),
                                                         member: name.to_string(),
                                                         line })
    }

    fn map_literal(&mut self,
                   entries: &[(Command, Command)],
                   context: &Rc<Context>,
                   line: usize)
                   -> EvalResult<Flow> {
        let mut keys = Vec::with_capacity(entries.len());
        let mut values = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            keys.push(value_of!(self.execute(key, context)?));
            values.push(value_of!(self.execute(value, context)?));
        }
        let key_type = self.common_type(keys.iter());
        let value_type = self.common_type(values.iter());
        let mut map = BTreeMap::new();
        for (key, value) in keys.into_iter().zip(values) {
            let key = MapKey::from_value(&key).ok_or_else(|| {
                          RuntimeError::InvalidMapKey { found: key.runtime_type(&self.registry)
                                                                  .to_string(),
                                                        line }
                      })?;
            map.insert(key, value);
        }
        Ok(Flow::Normal(Value::map(key_type, value_type, map)))
    }

    /// The narrowest type describing every value: their shared type, or the
    /// alternatives among them. No values give `Any`.
    pub(crate) fn common_type<'a>(&self, values: impl Iterator<Item = &'a Value>) -> Type {
        let mut distinct: Vec<Type> = Vec::new();
        for value in values {
            let ty = value.runtime_type(&self.registry);
            if !distinct.iter().any(|known| known.accepts(&ty) && ty.accepts(known)) {
                distinct.push(ty);
            }
        }
        match distinct.len() {
            0 => self.registry.any.clone(),
            1 => distinct.swap_remove(0),
            _ => Type::Algebraic(distinct.into()),
        }
    }

    /// Resolves a type reference against the scope's type tables.
    ///
    /// # Errors
    /// Returns [`RuntimeError::UnknownType`] for names no scope defines.
    pub fn resolve_type(&self, reference: &TypeRef, context: &Context, line: usize) -> EvalResult<Type> {
        match reference {
            TypeRef::Named(name) => {
                context.lookup_type(name)
                       .ok_or_else(|| RuntimeError::UnknownType { name: name.clone(),
                                                                  line })
            },
            TypeRef::Function { parameters,
                                return_type, } => {
                let parameters = parameters.iter()
                                           .map(|parameter| self.resolve_type(parameter, context, line))
                                           .collect::<EvalResult<Vec<_>>>()?;
                let return_type = self.resolve_type(return_type, context, line)?;
                Ok(Type::Function(Rc::new(FunctionType { parameters,
                                                         return_type })))
            },
            TypeRef::Collection(element) => {
                Ok(Type::Collection(Rc::new(self.resolve_type(element, context, line)?)))
            },
            TypeRef::Map { key, value } => {
                Ok(Type::Map(Rc::new(MapType { key:   self.resolve_type(key, context, line)?,
                                               value: self.resolve_type(value, context, line)?, })))
            },
            TypeRef::Algebraic(variants) => {
                let variants = variants.iter()
                                       .map(|variant| self.resolve_type(variant, context, line))
                                       .collect::<EvalResult<Vec<_>>>()?;
                Ok(Type::Algebraic(variants.into()))
            },
            TypeRef::Contract { name, arguments } => {
                trace!(name = %name, arguments = arguments.len(), "contract arguments not resolved");
                self.resolve_type(&TypeRef::Named(name.clone()), context, line)
            },
        }
    }

    fn define_struct(&mut self,
                     name: &str,
                     fields: &[FieldCommand],
                     context: &Rc<Context>,
                     line: usize)
                     -> EvalResult<Flow> {
        let mut resolved = Vec::with_capacity(fields.len());
        for field in fields {
            let field = match field {
                FieldCommand::Typed { name, ty } => Field { name:    name.clone(),
                                                            ty:      self.resolve_type(ty, context, line)?,
                                                            default: None, },
                FieldCommand::Defaulted { name, default } => {
                    let value = value_of!(self.execute(default, context)?);
                    Field { name:    name.clone(),
                            ty:      value.runtime_type(&self.registry),
                            default: Some(value), }
                },
            };
            resolved.push(field);
        }
        debug!(name, fields = resolved.len(), "defined struct");
        let structure = StructType { name:     name.to_string(),
                                     fields:   resolved,
                                     bindings: TypeBindings::default(), };
        context.define_type(name, Type::Struct(Rc::new(structure)), line)?;
        Ok(Flow::Normal(Value::Unit))
    }

    /// Runs an extension body and moves every binding it declares onto the
    /// type's shared member table.
    fn extend(&mut self,
              type_name: &str,
              alias: Option<&str>,
              body: &[Command],
              context: &Rc<Context>,
              line: usize)
              -> EvalResult<Flow> {
        let target = context.lookup_type(type_name)
                            .ok_or_else(|| RuntimeError::UnknownType { name: type_name.to_string(),
                                                                       line })?;
        let scope = self.pool.acquire(context);
        scope.set_extension_alias(alias.map(str::to_string));
        let result = self.execute_sequence(body, &scope)
                         .and_then(|_| self.collect_members(&scope, line));
        self.pool.release(scope);

        let members = result?;
        let Some(bindings) = target.own_bindings() else {
            return Err(RuntimeError::UnknownType { name: type_name.to_string(),
                                                   line });
        };
        debug!(type_name, members = members.len(), "extended type");
        for (name, value) in members {
            bindings.set(&name, value);
        }
        Ok(Flow::Normal(Value::Unit))
    }

    fn collect_members(&mut self, scope: &Rc<Context>, line: usize) -> EvalResult<Vec<(String, Value)>> {
        let mut members = Vec::new();
        for name in scope.variable_names() {
            if let Some(binding) = scope.binding(&name) {
                let value = self.read_binding(scope, &name, binding, line)?;
                members.push((name, value));
            }
        }
        scope.drain_variables();
        Ok(members)
    }
}

/// The parts of a `let` that shape the binding.
struct Declaration<'a> {
    name:          &'a str,
    declared_type: Option<&'a TypeRef>,
    mutable:       bool,
    lazy:          bool,
    restricted:    bool,
    line:          usize,
}

impl Evaluator {
    /// Binds `value` to a declared type: settles what the value left open,
    /// then fails with a type mismatch unless `expected` accepts it.
    ///
    /// An empty collection or map literal takes its element types from
    /// `expected`, in place, so every alias sees the settled type. A function
    /// that never declared a return type takes the expected one, checked on
    /// every call.
    pub(crate) fn admit(&self,
                        expected: &Type,
                        value: Value,
                        site: impl FnOnce() -> String,
                        line: usize)
                        -> EvalResult<Value> {
        let value = settle(expected, value);
        let found = value.runtime_type(&self.registry);
        check_accepts(expected, &found, site, line)?;
        Ok(value)
    }
}

fn settle(expected: &Type, value: Value) -> Value {
    match (expected, value) {
        (Type::Collection(element), Value::Collection(collection)) => {
            if collection.items.borrow().is_empty() && collection.element_type.borrow().is_any() {
                *collection.element_type.borrow_mut() = (**element).clone();
            }
            Value::Collection(collection)
        },
        (Type::Map(expected), Value::Map(map)) => {
            if map.entries.borrow().is_empty()
               && map.key_type.borrow().is_any()
               && map.value_type.borrow().is_any()
            {
                *map.key_type.borrow_mut() = expected.key.clone();
                *map.value_type.borrow_mut() = expected.value.clone();
            }
            Value::Map(map)
        },
        (Type::Function(expected), Value::Function(function)) => {
            match function.with_return_type(&expected.return_type) {
                Some(settled) => Value::Function(Rc::new(settled)),
                None => Value::Function(function),
            }
        },
        (_, value) => value,
    }
}

/// Fails with a type mismatch unless `expected` accepts `found`. The site
/// description is only built on failure.
pub(crate) fn check_accepts(expected: &Type,
                            found: &Type,
                            site: impl FnOnce() -> String,
                            line: usize)
                            -> EvalResult<()> {
    if expected.accepts(found) {
        return Ok(());
    }
    Err(RuntimeError::TypeMismatch { site: site(),
                                     expected: expected.to_string(),
                                     found: found.to_string(),
                                     line })
}
