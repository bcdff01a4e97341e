/// Core value definitions.
///
/// Declares the `Value` enum and the shared payloads behind structured values
/// (instances, collections, maps), with conversions and rendering.
pub mod core;

/// Callable values.
///
/// Closures, native functions, struct constructors and receiver-bound
/// methods.
pub mod function;

/// Map keys.
///
/// The scalar subset of values that can index a map, totally ordered through
/// `OrderedFloat`.
pub mod map_key;
