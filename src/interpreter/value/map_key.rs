use std::{fmt, rc::Rc};

use ordered_float::OrderedFloat;

use crate::{ast::render_string, interpreter::value::core::Value};

/// A value usable as a map key.
///
/// Only scalar values qualify. Floats are wrapped in [`OrderedFloat`] so that
/// keys are totally ordered and hashable; `Int(1)` and `Float(1.0)` remain
/// distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapKey {
    /// `true` / `false`
    Bool(bool),
    /// An integer key.
    Int(i64),
    /// A float key.
    Float(OrderedFloat<f64>),
    /// A string key.
    Str(Rc<str>),
}

impl MapKey {
    /// Converts a value into a key, or returns `None` for values that cannot
    /// be keys.
    ///
    /// # Example
    /// ```
    /// use kiln::interpreter::value::{core::Value, map_key::MapKey};
    ///
    /// assert_eq!(MapKey::from_value(&Value::Int(3)), Some(MapKey::Int(3)));
    /// assert_eq!(MapKey::from_value(&Value::Unit), None);
    /// ```
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Int(i) => Some(Self::Int(*i)),
            Value::Float(x) => Some(Self::Float(OrderedFloat(*x))),
            Value::Str(s) => Some(Self::Str(Rc::clone(s))),
            _ => None,
        }
    }
}

impl From<&MapKey> for Value {
    fn from(key: &MapKey) -> Self {
        match key {
            MapKey::Bool(b) => Self::Bool(*b),
            MapKey::Int(i) => Self::Int(*i),
            MapKey::Float(x) => Self::Float(x.into_inner()),
            MapKey::Str(s) => Self::Str(Rc::clone(s)),
        }
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{}", render_string(s)),
            other => write!(f, "{}", Value::from(other)),
        }
    }
}
