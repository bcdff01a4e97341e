use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap},
    fmt,
    rc::Rc,
};

use crate::{
    ast::{Literal, render_float, render_string},
    error::RuntimeError,
    interpreter::{
        evaluator::core::EvalResult,
        types::{MapType, StructType, Type, TypeRegistry},
        value::{function::Function, map_key::MapKey},
    },
};

/// An instance of a struct type.
#[derive(Debug)]
pub struct Instance {
    /// The struct type the instance was constructed from.
    pub ty:     Rc<StructType>,
    /// Field values by name. Every declared field is present.
    pub fields: RefCell<HashMap<String, Value>>,
}

/// A growable, shared sequence of values with a fixed element type.
///
/// An empty literal starts out typed `[Any]`; its element type is settled the
/// first time it is bound to a declared collection type.
#[derive(Debug)]
pub struct Collection {
    /// Every element is accepted by this type.
    pub element_type: RefCell<Type>,
    /// The elements.
    pub items:        RefCell<Vec<Value>>,
}

/// A shared mapping from scalar keys to values.
#[derive(Debug)]
pub struct MapValue {
    /// Every key is accepted by this type.
    pub key_type:   RefCell<Type>,
    /// Every value is accepted by this type.
    pub value_type: RefCell<Type>,
    /// Entries, ordered by key.
    pub entries:    RefCell<BTreeMap<MapKey, Value>>,
}

/// Represents a runtime value in the interpreter.
///
/// Scalars are stored inline. Structured payloads (functions, instances,
/// collections, maps) are reference-counted: cloning a `Value` shares them,
/// so a mutation made through one copy is visible through every other.
#[derive(Debug, Clone)]
pub enum Value {
    /// The result of statements that produce nothing.
    Unit,
    /// A 64-bit integer.
    Int(i64),
    /// A 64-bit float.
    Float(f64),
    /// An immutable string.
    Str(Rc<str>),
    /// A boolean value.
    Bool(bool),
    /// A callable value.
    Function(Rc<Function>),
    /// A struct instance.
    Instance(Rc<Instance>),
    /// A collection.
    Collection(Rc<Collection>),
    /// A map.
    Map(Rc<MapValue>),
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(Rc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(Rc::from(v))
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Int(i) => Self::Int(*i),
            Literal::Float(x) => Self::Float(*x),
            Literal::Str(s) => Self::from(s.as_str()),
            Literal::Bool(b) => Self::Bool(*b),
        }
    }
}

/// Scalars compare by value, structured values by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Unit, Self::Unit) => true,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            (Self::Instance(a), Self::Instance(b)) => Rc::ptr_eq(a, b),
            (Self::Collection(a), Self::Collection(b)) => Rc::ptr_eq(a, b),
            (Self::Map(a), Self::Map(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Value {
    /// Creates a collection value.
    #[must_use]
    pub fn collection(element_type: Type, items: Vec<Self>) -> Self {
        Self::Collection(Rc::new(Collection { element_type: RefCell::new(element_type),
                                              items:        RefCell::new(items), }))
    }

    /// Creates a map value.
    #[must_use]
    pub fn map(key_type: Type, value_type: Type, entries: BTreeMap<MapKey, Self>) -> Self {
        Self::Map(Rc::new(MapValue { key_type:   RefCell::new(key_type),
                                     value_type: RefCell::new(value_type),
                                     entries:    RefCell::new(entries), }))
    }

    /// Returns the runtime type of the value.
    ///
    /// # Example
    /// ```
    /// use kiln::interpreter::{types::TypeRegistry, value::core::Value};
    ///
    /// let registry = TypeRegistry::new();
    ///
    /// assert_eq!(Value::Int(1).runtime_type(&registry).to_string(), "Int");
    /// assert_eq!(Value::collection(registry.string.clone(), vec![]).runtime_type(&registry)
    ///                                                              .to_string(),
    ///            "[String]");
    /// ```
    #[must_use]
    pub fn runtime_type(&self, registry: &TypeRegistry) -> Type {
        match self {
            Self::Unit => registry.unit.clone(),
            Self::Int(_) => registry.int.clone(),
            Self::Float(_) => registry.float.clone(),
            Self::Str(_) => registry.string.clone(),
            Self::Bool(_) => registry.bool.clone(),
            Self::Function(function) => Type::Function(function.signature(registry)),
            Self::Instance(instance) => Type::Struct(Rc::clone(&instance.ty)),
            Self::Collection(collection) => {
                Type::Collection(Rc::new(collection.element_type.borrow().clone()))
            },
            Self::Map(map) => Type::Map(Rc::new(MapType { key:   map.key_type.borrow().clone(),
                                                          value: map.value_type.borrow().clone(), })),
        }
    }

    /// Returns the boolean payload, or an error naming the actual type.
    pub fn as_bool(&self, registry: &TypeRegistry, line: usize) -> EvalResult<bool> {
        match self {
            Self::Bool(b) => Ok(*b),
            other => Err(RuntimeError::ExpectedBoolean { found: other.runtime_type(registry)
                                                                     .to_string(),
                                                         line }),
        }
    }

    /// Renders the value the way it appears nested inside another value:
    /// strings are quoted, everything else matches `Display`.
    #[must_use]
    pub fn repr(&self) -> String {
        match self {
            Self::Str(s) => render_string(s),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => write!(f, "unit"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{}", render_float(*x)),
            Self::Str(s) => write!(f, "{s}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Function(function) => write!(f, "{function}"),
            Self::Instance(instance) => {
                let fields = instance.fields.borrow();
                let rendered = instance.ty
                                       .fields
                                       .iter()
                                       .filter_map(|field| {
                                           fields.get(&field.name)
                                                 .map(|value| format!("{}: {}", field.name, value.repr()))
                                       })
                                       .collect::<Vec<_>>()
                                       .join(", ");
                write!(f, "{}({rendered})", instance.ty.name)
            },
            Self::Collection(collection) => {
                let rendered = collection.items
                                         .borrow()
                                         .iter()
                                         .map(Self::repr)
                                         .collect::<Vec<_>>()
                                         .join(", ");
                write!(f, "[{rendered}]")
            },
            Self::Map(map) => {
                let entries = map.entries.borrow();
                if entries.is_empty() {
                    return write!(f, "[:]");
                }
                let rendered = entries.iter()
                                      .map(|(key, value)| format!("{key}: {}", value.repr()))
                                      .collect::<Vec<_>>()
                                      .join(", ");
                write!(f, "[{rendered}]")
            },
        }
    }
}
