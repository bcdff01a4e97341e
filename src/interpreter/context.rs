use std::{
    cell::RefCell,
    collections::HashMap,
    rc::Rc,
};

use tracing::trace;

use crate::{
    error::RuntimeError,
    interpreter::{command::Command, evaluator::core::EvalResult, types::Type, value::core::Value},
};

/// The most frames kept for reuse; further released frames are dropped.
pub const MAX_POOLED_FRAMES: usize = 256;

/// The current state of a variable binding.
#[derive(Debug, Clone)]
pub enum BindingState {
    /// The value is known.
    Ready(Value),
    /// A `lazy` binding whose initializer has not run yet.
    Pending(Rc<Command>),
    /// A `lazy` binding whose initializer is running.
    Forcing,
}

/// A declared variable.
#[derive(Debug, Clone)]
pub struct Binding {
    /// Current state.
    pub state:     BindingState,
    /// The type every assigned value must be accepted by. Unknown only for a
    /// pending lazy binding without an annotation.
    pub ty:        Option<Type>,
    /// Whether assignment is allowed.
    pub mutable:   bool,
    /// For `restricted` bindings, the only namespace that may see them.
    pub namespace: Option<String>,
}

impl Binding {
    /// Creates an initialised binding.
    #[must_use]
    pub fn ready(value: Value, ty: Type, mutable: bool) -> Self {
        Self { state: BindingState::Ready(value),
               ty: Some(ty),
               mutable,
               namespace: None }
    }

    /// Returns `true` if code running in `namespace` may see the binding.
    #[must_use]
    pub fn visible_from(&self, namespace: Option<&str>) -> bool {
        self.namespace
            .as_deref()
            .is_none_or(|owner| Some(owner) == namespace)
    }
}

/// The value a method was invoked on, with the alias it may be read under.
#[derive(Debug, Clone)]
pub struct Receiver {
    /// The receiver.
    pub value: Value,
    /// The name given by `extend T as alias`, if any.
    pub alias: Option<String>,
}

impl Receiver {
    /// Returns `true` if `name` refers to the receiver itself.
    #[must_use]
    pub fn answers_to(&self, name: &str) -> bool {
        name == "this" || self.alias.as_deref() == Some(name)
    }
}

/// A lexical scope.
///
/// A context owns its bindings outright. The parent link is shared: closures
/// keep their defining scope alive, so a child only ever reads through it.
/// Interior mutability lets bindings be declared through a shared handle.
#[derive(Debug, Default)]
pub struct Context {
    variables:       RefCell<HashMap<String, Binding>>,
    parameters:      RefCell<HashMap<String, Value>>,
    receiver:        RefCell<Option<Receiver>>,
    namespace:       RefCell<Option<String>>,
    extension_alias: RefCell<Option<String>>,
    types:           RefCell<HashMap<String, Type>>,
    imports:         RefCell<Vec<String>>,
    parent:          Option<Rc<Self>>,
}

impl Context {
    /// Creates an empty root context.
    #[must_use]
    pub fn root() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Returns the enclosing scope.
    #[must_use]
    pub fn parent(&self) -> Option<&Rc<Self>> {
        self.parent.as_ref()
    }

    /// Iterates over this scope and its ancestors, innermost first.
    pub fn ancestors(&self) -> impl Iterator<Item = &Self> {
        std::iter::successors(Some(self), |context| context.parent.as_deref())
    }

    /// Declares a variable in this scope.
    ///
    /// # Errors
    /// Returns [`RuntimeError::Redeclaration`] if this scope already has a
    /// variable of that name. Outer scopes may be shadowed freely.
    pub fn declare(&self, name: &str, binding: Binding, line: usize) -> EvalResult<()> {
        let mut variables = self.variables.borrow_mut();
        if variables.contains_key(name) {
            return Err(RuntimeError::Redeclaration { name: name.to_string(),
                                                     line });
        }
        variables.insert(name.to_string(), binding);
        Ok(())
    }

    /// Returns a copy of this scope's own binding for `name`.
    #[must_use]
    pub fn binding(&self, name: &str) -> Option<Binding> {
        self.variables.borrow().get(name).cloned()
    }

    /// Replaces the state of an existing binding in this scope.
    pub fn set_state(&self, name: &str, state: BindingState) {
        if let Some(binding) = self.variables.borrow_mut().get_mut(name) {
            binding.state = state;
        }
    }

    /// Replaces the value of an existing binding in this scope, fixing its
    /// type when it was still unknown.
    pub fn store(&self, name: &str, value: Value, ty: Option<Type>) {
        if let Some(binding) = self.variables.borrow_mut().get_mut(name) {
            binding.state = BindingState::Ready(value);
            if binding.ty.is_none() {
                binding.ty = ty;
            }
        }
    }

    /// Returns the names declared directly in this scope, sorted.
    #[must_use]
    pub fn variable_names(&self) -> Vec<String> {
        let mut names = self.variables.borrow().keys().cloned().collect::<Vec<_>>();
        names.sort();
        names
    }

    /// Takes every binding out of this scope.
    pub fn drain_variables(&self) -> Vec<(String, Binding)> {
        let mut drained = self.variables.borrow_mut().drain().collect::<Vec<_>>();
        drained.sort_by(|a, b| a.0.cmp(&b.0));
        drained
    }

    /// Binds a call parameter.
    pub fn bind_parameter(&self, name: &str, value: Value) {
        self.parameters.borrow_mut().insert(name.to_string(), value);
    }

    /// Returns a parameter bound in this scope.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<Value> {
        self.parameters.borrow().get(name).cloned()
    }

    /// Binds the receiver of a method call.
    pub fn bind_receiver(&self, receiver: Receiver) {
        *self.receiver.borrow_mut() = Some(receiver);
    }

    /// Returns the receiver bound in this scope.
    #[must_use]
    pub fn receiver(&self) -> Option<Receiver> {
        self.receiver.borrow().clone()
    }

    /// Returns the namespace code in this scope runs under.
    #[must_use]
    pub fn namespace(&self) -> Option<String> {
        self.namespace.borrow().clone()
    }

    /// Sets the namespace code in this scope runs under.
    pub fn set_namespace(&self, namespace: Option<String>) {
        *self.namespace.borrow_mut() = namespace;
    }

    /// Marks this scope as the body of `extend ... as alias`.
    pub fn set_extension_alias(&self, alias: Option<String>) {
        *self.extension_alias.borrow_mut() = alias;
    }

    /// Returns the alias of the innermost enclosing extension body.
    #[must_use]
    pub fn extension_alias(&self) -> Option<String> {
        self.ancestors()
            .find_map(|context| context.extension_alias.borrow().clone())
    }

    /// Records an imported namespace.
    pub fn record_import(&self, namespace: &str) {
        let mut imports = self.imports.borrow_mut();
        if !imports.iter().any(|existing| existing == namespace) {
            imports.push(namespace.to_string());
        }
    }

    /// Returns the namespaces imported in this scope.
    #[must_use]
    pub fn imports(&self) -> Vec<String> {
        self.imports.borrow().clone()
    }

    /// Declares a type in this scope.
    ///
    /// # Errors
    /// Returns [`RuntimeError::Redeclaration`] if this scope already has a
    /// type of that name.
    pub fn define_type(&self, name: &str, ty: Type, line: usize) -> EvalResult<()> {
        let mut types = self.types.borrow_mut();
        if types.contains_key(name) {
            return Err(RuntimeError::Redeclaration { name: name.to_string(),
                                                     line });
        }
        types.insert(name.to_string(), ty);
        Ok(())
    }

    /// Resolves a type name through this scope and its ancestors.
    #[must_use]
    pub fn lookup_type(&self, name: &str) -> Option<Type> {
        self.ancestors()
            .find_map(|context| context.types.borrow().get(name).cloned())
    }

    /// Returns `true` if nothing is bound in this scope.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.borrow().is_empty()
        && self.parameters.borrow().is_empty()
        && self.receiver.borrow().is_none()
        && self.types.borrow().is_empty()
        && self.imports.borrow().is_empty()
        && self.namespace.borrow().is_none()
        && self.extension_alias.borrow().is_none()
        && self.parent.is_none()
    }

    /// Clears every field, keeping the allocated maps for reuse.
    fn reset(&mut self) {
        self.variables.get_mut().clear();
        self.parameters.get_mut().clear();
        *self.receiver.get_mut() = None;
        *self.namespace.get_mut() = None;
        *self.extension_alias.get_mut() = None;
        self.types.get_mut().clear();
        self.imports.get_mut().clear();
        self.parent = None;
    }
}

/// Reusable scopes for blocks and call frames.
///
/// A released frame is reset before it is stored, and handed out again only
/// through [`ContextPool::acquire`], which links it to its new parent. A frame
/// that is still referenced, typically because a closure captured it, is not
/// recycled.
///
/// # Example
/// ```
/// use kiln::interpreter::{
///     context::{Context, ContextPool},
///     value::core::Value,
/// };
///
/// let root = Context::root();
/// let mut pool = ContextPool::default();
///
/// let frame = pool.acquire(&root);
/// frame.bind_parameter("n", Value::Int(3));
/// pool.release(frame);
///
/// assert_eq!(pool.available(), 1);
/// let reused = pool.acquire(&root);
/// assert!(reused.parameter("n").is_none());
/// ```
#[derive(Debug, Default)]
pub struct ContextPool {
    free: Vec<Context>,
}

impl ContextPool {
    /// Hands out an empty scope whose parent is `parent`. The scope starts in
    /// its parent's namespace.
    pub fn acquire(&mut self, parent: &Rc<Context>) -> Rc<Context> {
        let mut context = self.free.pop().unwrap_or_default();
        context.parent = Some(Rc::clone(parent));
        *context.namespace.get_mut() = parent.namespace();
        Rc::new(context)
    }

    /// Returns a scope to the pool.
    pub fn release(&mut self, context: Rc<Context>) {
        match Rc::try_unwrap(context) {
            Ok(mut context) => {
                if self.free.len() < MAX_POOLED_FRAMES {
                    context.reset();
                    self.free.push(context);
                }
            },
            Err(_) => trace!("scope still captured, not recycled"),
        }
    }

    /// Number of scopes ready for reuse.
    #[must_use]
    pub fn available(&self) -> usize {
        self.free.len()
    }
}
