use std::rc::Rc;

use crate::{
    error::RuntimeError,
    interpreter::{
        evaluator::core::{EvalResult, Evaluator, check_accepts},
        types::TypeRegistry,
        value::{
            core::{Collection, MapValue, Value},
            function::Function,
            map_key::MapKey,
        },
    },
    util::num::{checked_index, promote, usize_to_i64_checked},
};

/// Signature of a native function.
///
/// A native receives the evaluator, its receiver (unit for global functions),
/// the evaluated arguments, whose count has already been checked against its
/// [`Arity`], and the line number of the call.
pub type NativeFn = fn(&mut Evaluator, &Value, &[Value], usize) -> EvalResult<Value>;

/// Specifies the allowed number of arguments for a native.
///
/// - `Exact(n)` means the native must receive exactly `n` arguments.
/// - `OneOf(slice)` means the native accepts any arity listed in `slice`.
#[derive(Debug, Clone, Copy)]
pub enum Arity {
    /// Exactly this many.
    Exact(usize),
    /// Any of these counts.
    OneOf(&'static [usize]),
}

impl Arity {
    /// Tests whether the given argument count satisfies this arity constraint.
    ///
    /// # Example
    /// ```
    /// use kiln::interpreter::evaluator::builtin::Arity;
    ///
    /// assert!(Arity::Exact(1).check(1));
    /// assert!(!Arity::OneOf(&[0, 2]).check(1));
    /// ```
    #[must_use]
    pub fn check(&self, n: usize) -> bool {
        match self {
            Self::Exact(m) => n == *m,
            Self::OneOf(counts) => counts.contains(&n),
        }
    }

    /// The smallest accepted argument count.
    #[must_use]
    pub fn minimum(&self) -> usize {
        match self {
            Self::Exact(m) => *m,
            Self::OneOf(counts) => counts.iter().copied().min().unwrap_or(0),
        }
    }
}

/// A native function: name, arity and implementation.
#[derive(Debug)]
pub struct NativeDef {
    /// The name it is installed under.
    pub name:  &'static str,
    /// Accepted argument counts, not counting the receiver.
    pub arity: Arity,
    /// The implementation.
    pub func:  NativeFn,
}

/// Where a native is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    /// A global function.
    Global,
    /// A member of every value.
    Any,
    /// `Int` method.
    Int,
    /// `Float` method.
    Float,
    /// `String` method.
    String,
    /// `Bool` method.
    Bool,
    /// Method of every collection.
    Collection,
    /// Method of every map.
    Map,
}

/// Defines natives by generating a static lookup table.
///
/// Each entry provides:
/// - the owner and the name it is installed under,
/// - an arity specification,
/// - a function pointer implementing the native.
macro_rules! native_functions {
    (
        $(
            $owner:ident . $name:literal => {
                arity: $arity:expr,
                func: $func:expr $(,)?
            }
        ),* $(,)?
    ) => {
        static NATIVE_TABLE: &[(Owner, NativeDef)] = &[
            $(
                (Owner::$owner, NativeDef { name: $name, arity: $arity, func: $func }),
            )*
        ];
    };
}

native_functions! {
    Global.     "print"           => { arity: Arity::Exact(1), func: print },
    Global.     "assert"          => { arity: Arity::Exact(1), func: assert_fn },
    Any.        "toString"        => { arity: Arity::Exact(0), func: to_string },
    Any.        "equals"          => { arity: Arity::Exact(1), func: identity_equals },
    Int.        "plus"            => { arity: Arity::Exact(1), func: plus },
    Int.        "minus"           => { arity: Arity::Exact(1), func: minus },
    Int.        "times"           => { arity: Arity::Exact(1), func: times },
    Int.        "divide"          => { arity: Arity::Exact(1), func: divide },
    Int.        "equals"          => { arity: Arity::Exact(1), func: number_equals },
    Int.        "less"            => { arity: Arity::Exact(1), func: less },
    Int.        "greater"         => { arity: Arity::Exact(1), func: greater },
    Int.        "lessOrEquals"    => { arity: Arity::Exact(1), func: less_or_equals },
    Int.        "greaterOrEquals" => { arity: Arity::Exact(1), func: greater_or_equals },
    Int.        "negate"          => { arity: Arity::Exact(0), func: negate },
    Float.      "plus"            => { arity: Arity::Exact(1), func: plus },
    Float.      "minus"           => { arity: Arity::Exact(1), func: minus },
    Float.      "times"           => { arity: Arity::Exact(1), func: times },
    Float.      "divide"          => { arity: Arity::Exact(1), func: divide },
    Float.      "equals"          => { arity: Arity::Exact(1), func: number_equals },
    Float.      "less"            => { arity: Arity::Exact(1), func: less },
    Float.      "greater"         => { arity: Arity::Exact(1), func: greater },
    Float.      "lessOrEquals"    => { arity: Arity::Exact(1), func: less_or_equals },
    Float.      "greaterOrEquals" => { arity: Arity::Exact(1), func: greater_or_equals },
    Float.      "negate"          => { arity: Arity::Exact(0), func: negate },
    String.     "plus"            => { arity: Arity::Exact(1), func: concat },
    String.     "equals"          => { arity: Arity::Exact(1), func: identity_equals },
    String.     "size"            => { arity: Arity::Exact(0), func: string_size },
    Bool.       "equals"          => { arity: Arity::Exact(1), func: identity_equals },
    Bool.       "not"             => { arity: Arity::Exact(0), func: not },
    Collection. "size"            => { arity: Arity::Exact(0), func: collection_size },
    Collection. "get"             => { arity: Arity::Exact(1), func: collection_get },
    Collection. "add"             => { arity: Arity::Exact(1), func: collection_add },
    Collection. "equals"          => { arity: Arity::Exact(1), func: collection_equals },
    Map.        "size"            => { arity: Arity::Exact(0), func: map_size },
    Map.        "get"             => { arity: Arity::Exact(1), func: map_get },
    Map.        "set"             => { arity: Arity::Exact(2), func: map_set },
    Map.        "contains"        => { arity: Arity::Exact(1), func: map_contains },
}

/// Installs every native method on the member tables of `registry`.
pub fn install(registry: &TypeRegistry) {
    for (owner, native) in NATIVE_TABLE {
        let bindings = match owner {
            Owner::Global => continue,
            Owner::Any => registry.any.own_bindings(),
            Owner::Int => registry.int.own_bindings(),
            Owner::Float => registry.float.own_bindings(),
            Owner::String => registry.string.own_bindings(),
            Owner::Bool => registry.bool.own_bindings(),
            Owner::Collection => Some(&registry.collection_members),
            Owner::Map => Some(&registry.map_members),
        };
        if let Some(bindings) = bindings {
            bindings.set(native.name, Value::Function(Rc::new(Function::Native(native))));
        }
    }
}

/// Returns the global natives.
pub fn globals() -> impl Iterator<Item = &'static NativeDef> {
    NATIVE_TABLE.iter()
                .filter(|(owner, _)| *owner == Owner::Global)
                .map(|(_, native)| native)
}

fn mismatch(evaluator: &Evaluator, site: &str, expected: &str, found: &Value, line: usize) -> RuntimeError {
    RuntimeError::TypeMismatch { site: site.to_string(),
                                 expected: expected.to_string(),
                                 found: found.runtime_type(&evaluator.registry).to_string(),
                                 line }
}

/// Writes a value's string form to the program output.
fn print(evaluator: &mut Evaluator, _: &Value, args: &[Value], _: usize) -> EvalResult<Value> {
    evaluator.write_output(&args[0].to_string());
    Ok(Value::Unit)
}

/// Fails unless the argument is `true`.
fn assert_fn(evaluator: &mut Evaluator, _: &Value, args: &[Value], line: usize) -> EvalResult<Value> {
    if !args[0].as_bool(&evaluator.registry, line)? {
        return Err(RuntimeError::AssertionFailed { line });
    }
    Ok(Value::Unit)
}

fn to_string(_: &mut Evaluator, receiver: &Value, _: &[Value], _: usize) -> EvalResult<Value> {
    Ok(Value::from(receiver.to_string()))
}

/// Scalars compare by value, everything else by identity.
fn identity_equals(_: &mut Evaluator, receiver: &Value, args: &[Value], _: usize) -> EvalResult<Value> {
    Ok(Value::Bool(*receiver == args[0]))
}

/// Numeric operands after promotion.
enum Operands {
    Ints(i64, i64),
    Floats(f64, f64),
}

fn operands(evaluator: &Evaluator, receiver: &Value, argument: &Value, method: &str, line: usize) -> EvalResult<Operands> {
    match (receiver, argument) {
        (Value::Int(a), Value::Int(b)) => Ok(Operands::Ints(*a, *b)),
        (Value::Int(a), Value::Float(b)) => Ok(Operands::Floats(promote(*a, line)?, *b)),
        (Value::Float(a), Value::Int(b)) => Ok(Operands::Floats(*a, promote(*b, line)?)),
        (Value::Float(a), Value::Float(b)) => Ok(Operands::Floats(*a, *b)),
        (Value::Int(_) | Value::Float(_), other) => {
            Err(mismatch(evaluator, &format!("argument of '{method}'"), "Int | Float", other, line))
        },
        (other, _) => Err(mismatch(evaluator, &format!("receiver of '{method}'"), "Int | Float", other, line)),
    }
}

/// Generates a numeric operator: checked on integers, IEEE on floats.
macro_rules! arithmetic_native {
    ($fname:ident, $method:literal, $checked:ident, $op:tt) => {
        fn $fname(evaluator: &mut Evaluator, receiver: &Value, args: &[Value], line: usize) -> EvalResult<Value> {
            match operands(evaluator, receiver, &args[0], $method, line)? {
                Operands::Ints(a, b) => a.$checked(b).map(Value::Int).ok_or(RuntimeError::Overflow { line }),
                Operands::Floats(a, b) => Ok(Value::Float(a $op b)),
            }
        }
    };
}

arithmetic_native!(plus, "plus", checked_add, +);
arithmetic_native!(minus, "minus", checked_sub, -);
arithmetic_native!(times, "times", checked_mul, *);

/// Integer division truncates and rejects a zero divisor; float division
/// follows IEEE.
fn divide(evaluator: &mut Evaluator, receiver: &Value, args: &[Value], line: usize) -> EvalResult<Value> {
    match operands(evaluator, receiver, &args[0], "divide", line)? {
        Operands::Ints(_, 0) => Err(RuntimeError::DivisionByZero { line }),
        Operands::Ints(a, b) => a.checked_div(b).map(Value::Int).ok_or(RuntimeError::Overflow { line }),
        Operands::Floats(a, b) => Ok(Value::Float(a / b)),
    }
}

/// Generates a numeric comparison.
macro_rules! comparison_native {
    ($fname:ident, $method:literal, $op:tt) => {
        fn $fname(evaluator: &mut Evaluator, receiver: &Value, args: &[Value], line: usize) -> EvalResult<Value> {
            match operands(evaluator, receiver, &args[0], $method, line)? {
                Operands::Ints(a, b) => Ok(Value::Bool(a $op b)),
                Operands::Floats(a, b) => Ok(Value::Bool(a $op b)),
            }
        }
    };
}

comparison_native!(less, "less", <);
comparison_native!(greater, "greater", >);
comparison_native!(less_or_equals, "lessOrEquals", <=);
comparison_native!(greater_or_equals, "greaterOrEquals", >=);

/// Numbers compare across `Int` and `Float`; anything else is unequal.
fn number_equals(evaluator: &mut Evaluator, receiver: &Value, args: &[Value], line: usize) -> EvalResult<Value> {
    if !matches!(args[0], Value::Int(_) | Value::Float(_)) {
        return Ok(Value::Bool(false));
    }
    match operands(evaluator, receiver, &args[0], "equals", line)? {
        Operands::Ints(a, b) => Ok(Value::Bool(a == b)),
        Operands::Floats(a, b) => Ok(Value::Bool(a == b)),
    }
}

fn negate(evaluator: &mut Evaluator, receiver: &Value, _: &[Value], line: usize) -> EvalResult<Value> {
    match receiver {
        Value::Int(i) => i.checked_neg().map(Value::Int).ok_or(RuntimeError::Overflow { line }),
        Value::Float(x) => Ok(Value::Float(-x)),
        other => Err(mismatch(evaluator, "receiver of 'negate'", "Int | Float", other, line)),
    }
}

fn not(evaluator: &mut Evaluator, receiver: &Value, _: &[Value], line: usize) -> EvalResult<Value> {
    match receiver {
        Value::Bool(b) => Ok(Value::Bool(!b)),
        other => Err(mismatch(evaluator, "receiver of 'not'", "Bool", other, line)),
    }
}

/// Appends the argument's string form.
fn concat(evaluator: &mut Evaluator, receiver: &Value, args: &[Value], line: usize) -> EvalResult<Value> {
    match receiver {
        Value::Str(s) => Ok(Value::from(format!("{s}{}", args[0]))),
        other => Err(mismatch(evaluator, "receiver of 'plus'", "String", other, line)),
    }
}

fn string_size(evaluator: &mut Evaluator, receiver: &Value, _: &[Value], line: usize) -> EvalResult<Value> {
    match receiver {
        Value::Str(s) => Ok(Value::Int(usize_to_i64_checked(s.chars().count(), line)?)),
        other => Err(mismatch(evaluator, "receiver of 'size'", "String", other, line)),
    }
}

fn with_collection<T>(evaluator: &Evaluator,
                      receiver: &Value,
                      method: &str,
                      line: usize,
                      f: impl FnOnce(&Collection) -> EvalResult<T>)
                      -> EvalResult<T> {
    match receiver {
        Value::Collection(collection) => f(collection),
        other => Err(mismatch(evaluator, &format!("receiver of '{method}'"), "collection", other, line)),
    }
}

fn collection_size(evaluator: &mut Evaluator, receiver: &Value, _: &[Value], line: usize) -> EvalResult<Value> {
    with_collection(evaluator, receiver, "size", line, |collection| {
        Ok(Value::Int(usize_to_i64_checked(collection.items.borrow().len(), line)?))
    })
}

fn collection_get(evaluator: &mut Evaluator, receiver: &Value, args: &[Value], line: usize) -> EvalResult<Value> {
    let Value::Int(index) = args[0] else {
        return Err(mismatch(evaluator, "index", "Int", &args[0], line));
    };
    with_collection(evaluator, receiver, "get", line, |collection| {
        let items = collection.items.borrow();
        let position = checked_index(index, items.len(), line)?;
        Ok(items[position].clone())
    })
}

/// Appends to the shared storage after checking the element type.
fn collection_add(evaluator: &mut Evaluator, receiver: &Value, args: &[Value], line: usize) -> EvalResult<Value> {
    let evaluator = &*evaluator;
    with_collection(evaluator, receiver, "add", line, |collection| {
        let element_type = collection.element_type.borrow().clone();
        let element = evaluator.admit(&element_type, args[0].clone(), || "collection element".to_string(), line)?;
        collection.items.borrow_mut().push(element);
        Ok(Value::Unit)
    })
}

/// Collections are equal when their elements are pairwise equal.
fn collection_equals(evaluator: &mut Evaluator, receiver: &Value, args: &[Value], line: usize) -> EvalResult<Value> {
    with_collection(evaluator, receiver, "equals", line, |collection| {
        let Value::Collection(other) = &args[0] else {
            return Ok(Value::Bool(false));
        };
        Ok(Value::Bool(*collection.items.borrow() == *other.items.borrow()))
    })
}

fn map_key(evaluator: &Evaluator, key: &Value, line: usize) -> EvalResult<MapKey> {
    MapKey::from_value(key).ok_or_else(|| RuntimeError::InvalidMapKey { found: key.runtime_type(&evaluator.registry)
                                                                                  .to_string(),
                                                                        line })
}

fn with_map<T>(evaluator: &Evaluator,
               receiver: &Value,
               method: &str,
               line: usize,
               f: impl FnOnce(&MapValue) -> EvalResult<T>)
               -> EvalResult<T> {
    match receiver {
        Value::Map(map) => f(map),
        other => Err(mismatch(evaluator, &format!("receiver of '{method}'"), "map", other, line)),
    }
}

fn map_size(evaluator: &mut Evaluator, receiver: &Value, _: &[Value], line: usize) -> EvalResult<Value> {
    with_map(evaluator, receiver, "size", line, |map| {
        Ok(Value::Int(usize_to_i64_checked(map.entries.borrow().len(), line)?))
    })
}

fn map_get(evaluator: &mut Evaluator, receiver: &Value, args: &[Value], line: usize) -> EvalResult<Value> {
    let key = map_key(evaluator, &args[0], line)?;
    with_map(evaluator, receiver, "get", line, |map| {
        map.entries
           .borrow()
           .get(&key)
           .cloned()
           .ok_or_else(|| RuntimeError::MissingKey { key: key.to_string(),
                                                     line })
    })
}

fn map_contains(evaluator: &mut Evaluator, receiver: &Value, args: &[Value], line: usize) -> EvalResult<Value> {
    let key = map_key(evaluator, &args[0], line)?;
    with_map(evaluator, receiver, "contains", line, |map| {
        Ok(Value::Bool(map.entries.borrow().contains_key(&key)))
    })
}

/// Inserts or replaces an entry after checking key and value types.
fn map_set(evaluator: &mut Evaluator, receiver: &Value, args: &[Value], line: usize) -> EvalResult<Value> {
    let key = map_key(evaluator, &args[0], line)?;
    let key_type = args[0].runtime_type(&evaluator.registry);
    let evaluator = &*evaluator;
    with_map(evaluator, receiver, "set", line, |map| {
        check_accepts(&map.key_type.borrow(), &key_type, || "map key".to_string(), line)?;
        let value_type = map.value_type.borrow().clone();
        let value = evaluator.admit(&value_type, args[1].clone(), || "map value".to_string(), line)?;
        map.entries.borrow_mut().insert(key, value);
        Ok(Value::Unit)
    })
}
