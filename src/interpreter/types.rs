use std::{cell::RefCell, collections::HashMap, fmt, rc::Rc};

use crate::interpreter::value::core::Value;

/// Members attached to a type: native methods installed at start-up plus
/// whatever `extend` adds later.
///
/// The table is shared by every value of the type, so an extension is
/// visible to values created before it ran.
#[derive(Debug, Default)]
pub struct TypeBindings {
    members: RefCell<HashMap<String, Value>>,
}

impl TypeBindings {
    /// Looks up a member by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        self.members.borrow().get(name).cloned()
    }

    /// Adds or replaces a member.
    pub fn set(&self, name: &str, value: Value) {
        self.members.borrow_mut().insert(name.to_string(), value);
    }

    /// Returns `true` if a member of that name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.members.borrow().contains_key(name)
    }

    /// Returns the member names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names = self.members.borrow().keys().cloned().collect::<Vec<_>>();
        names.sort();
        names
    }
}

/// A type identified by name alone, such as `Int` or `Bool`.
#[derive(Debug)]
pub struct NominalType {
    /// The type name.
    pub name:      String,
    /// Set for `Any`, which accepts every type.
    pub universal: bool,
    /// Members shared by all values of the type.
    pub bindings:  TypeBindings,
}

/// `(P, ...) => R`
#[derive(Debug, Clone)]
pub struct FunctionType {
    /// Parameter types, in order.
    pub parameters:  Vec<Type>,
    /// Return type.
    pub return_type: Type,
}

/// `[K: V]`
#[derive(Debug, Clone)]
pub struct MapType {
    /// Key type.
    pub key:   Type,
    /// Value type.
    pub value: Type,
}

/// A field of a struct type.
#[derive(Debug, Clone)]
pub struct Field {
    /// Field name.
    pub name:    String,
    /// Field type.
    pub ty:      Type,
    /// Used when a constructor call omits the field.
    pub default: Option<Value>,
}

/// A composite type declared with `struct`.
#[derive(Debug)]
pub struct StructType {
    /// The struct name.
    pub name:     String,
    /// Fields in declaration order; their order is the constructor's
    /// parameter order.
    pub fields:   Vec<Field>,
    /// Members added by `extend`.
    pub bindings: TypeBindings,
}

impl StructType {
    /// Looks up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// A runtime type.
///
/// Types are shared by reference. Nominal types compare by identity; the
/// other kinds compare by shape through [`Type::accepts`].
#[derive(Debug, Clone)]
pub enum Type {
    /// A nominal type.
    Nominal(Rc<NominalType>),
    /// A function type.
    Function(Rc<FunctionType>),
    /// A collection with a single element type.
    Collection(Rc<Self>),
    /// A map.
    Map(Rc<MapType>),
    /// A struct type.
    Struct(Rc<StructType>),
    /// One of several alternatives.
    Algebraic(Rc<[Self]>),
}

/// Pairs of struct types already assumed compatible while comparing
/// recursive types.
type Assumptions = Vec<(*const StructType, *const StructType)>;

impl Type {
    /// Creates a fresh nominal type.
    #[must_use]
    pub fn nominal(name: &str, universal: bool) -> Self {
        Self::Nominal(Rc::new(NominalType { name: name.to_string(),
                                            universal,
                                            bindings: TypeBindings::default() }))
    }

    /// Answers whether a value of type `other` may be used where `self` is
    /// expected.
    ///
    /// - `Any` accepts every type.
    /// - Other nominal types accept only themselves; in particular they do
    ///   not accept `Any`.
    /// - Function types need equal arity, every parameter of `self` accepting
    ///   the matching parameter of `other`, and the return types accepting
    ///   likewise.
    /// - Collections and maps compare their element, key and value types.
    /// - Structs use width subtyping: every field of `self` must exist on
    ///   `other` with an accepted type; extra fields are ignored.
    /// - An algebraic `other` is accepted if each of its alternatives is; an
    ///   algebraic `self` accepts whatever one of its alternatives accepts.
    ///
    /// # Example
    /// ```
    /// use kiln::interpreter::types::{Type, TypeRegistry};
    ///
    /// let registry = TypeRegistry::new();
    /// let ints = Type::Collection(registry.int.clone().into());
    ///
    /// assert!(registry.any.accepts(&ints));
    /// assert!(ints.accepts(&ints));
    /// assert!(!registry.int.accepts(&registry.float));
    /// assert!(!registry.int.accepts(&registry.any));
    /// ```
    #[must_use]
    pub fn accepts(&self, other: &Self) -> bool {
        self.accepts_with(other, &mut Vec::new())
    }

    fn accepts_with(&self, other: &Self, assumed: &mut Assumptions) -> bool {
        if self.is_any() {
            return true;
        }
        if let Self::Algebraic(variants) = other {
            return variants.iter().all(|variant| self.accepts_with(variant, assumed));
        }
        match (self, other) {
            (Self::Algebraic(variants), _) => {
                variants.iter().any(|variant| variant.accepts_with(other, assumed))
            },
            (Self::Nominal(a), Self::Nominal(b)) => Rc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => {
                a.parameters.len() == b.parameters.len()
                && a.parameters
                    .iter()
                    .zip(&b.parameters)
                    .all(|(expected, found)| expected.accepts_with(found, assumed))
                && a.return_type.accepts_with(&b.return_type, assumed)
            },
            (Self::Collection(a), Self::Collection(b)) => a.accepts_with(b, assumed),
            (Self::Map(a), Self::Map(b)) => {
                a.key.accepts_with(&b.key, assumed) && a.value.accepts_with(&b.value, assumed)
            },
            (Self::Struct(a), Self::Struct(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let pair = (Rc::as_ptr(a), Rc::as_ptr(b));
                if assumed.contains(&pair) {
                    return true;
                }
                assumed.push(pair);
                a.fields.iter().all(|field| {
                                   b.field(&field.name)
                                    .is_some_and(|found| field.ty.accepts_with(&found.ty, assumed))
                               })
            },
            _ => false,
        }
    }

    /// Returns `true` for the universal type.
    #[must_use]
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Nominal(nominal) if nominal.universal)
    }

    /// Returns `true` if both are the same nominal type.
    #[must_use]
    pub fn is_nominal(&self, other: &Self) -> bool {
        matches!((self, other), (Self::Nominal(a), Self::Nominal(b)) if Rc::ptr_eq(a, b))
    }

    /// Returns the type's own member table, if it has one. Collections, maps
    /// and functions share tables held by the [`TypeRegistry`] instead.
    #[must_use]
    pub fn own_bindings(&self) -> Option<&TypeBindings> {
        match self {
            Self::Nominal(nominal) => Some(&nominal.bindings),
            Self::Struct(structure) => Some(&structure.bindings),
            _ => None,
        }
    }

    /// Returns the name of a nominal or struct type.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Nominal(nominal) => Some(&nominal.name),
            Self::Struct(structure) => Some(&structure.name),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nominal(nominal) => write!(f, "{}", nominal.name),
            Self::Struct(structure) => write!(f, "{}", structure.name),
            Self::Function(function) => {
                let parameters = function.parameters
                                         .iter()
                                         .map(ToString::to_string)
                                         .collect::<Vec<_>>()
                                         .join(", ");
                write!(f, "({parameters}) => {}", function.return_type)
            },
            Self::Collection(element) => write!(f, "[{element}]"),
            Self::Map(map) => write!(f, "[{}: {}]", map.key, map.value),
            Self::Algebraic(variants) => {
                let rendered = variants.iter()
                                       .map(ToString::to_string)
                                       .collect::<Vec<_>>()
                                       .join(" | ");
                write!(f, "{rendered}")
            },
        }
    }
}

/// The built-in types and the member tables shared by structural kinds.
#[derive(Debug)]
pub struct TypeRegistry {
    /// The universal type.
    pub any:                Type,
    /// 64-bit integers.
    pub int:                Type,
    /// 64-bit floats.
    pub float:              Type,
    /// Strings.
    pub string:             Type,
    /// Booleans.
    pub bool:               Type,
    /// The type of statements that produce no value.
    pub unit:               Type,
    /// Members of every collection.
    pub collection_members: TypeBindings,
    /// Members of every map.
    pub map_members:        TypeBindings,
    /// Members of every function.
    pub function_members:   TypeBindings,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Creates the built-in types with empty member tables.
    #[must_use]
    pub fn new() -> Self {
        Self { any:                Type::nominal("Any", true),
               int:                Type::nominal("Int", false),
               float:              Type::nominal("Float", false),
               string:             Type::nominal("String", false),
               bool:               Type::nominal("Bool", false),
               unit:               Type::nominal("Unit", false),
               collection_members: TypeBindings::default(),
               map_members:        TypeBindings::default(),
               function_members:   TypeBindings::default(), }
    }

    /// The built-in types with their source names.
    #[must_use]
    pub fn builtins(&self) -> [(&'static str, &Type); 6] {
        [("Any", &self.any),
         ("Int", &self.int),
         ("Float", &self.float),
         ("String", &self.string),
         ("Bool", &self.bool),
         ("Unit", &self.unit)]
    }

    /// Returns the member table consulted for values of type `ty`.
    #[must_use]
    pub fn bindings_for<'a>(&'a self, ty: &'a Type) -> Option<&'a TypeBindings> {
        match ty {
            Type::Collection(_) => Some(&self.collection_members),
            Type::Map(_) => Some(&self.map_members),
            Type::Function(_) => Some(&self.function_members),
            Type::Algebraic(_) => None,
            other => other.own_bindings(),
        }
    }
}
