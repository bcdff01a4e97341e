/// Numeric conversion helpers.
///
/// This module provides safe functions for converting between integer and
/// floating-point types without risking silent data loss or rounding errors.
/// The evaluator uses them for mixed `Int`/`Float` arithmetic, `as`
/// conversions, collection sizes and indexing.
///
/// All functions return a `Result`, which is `Ok` if the conversion is lossless
/// and valid, or a runtime error if the value is out of range or not an
/// integer.
pub mod num;
