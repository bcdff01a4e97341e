use crate::{error::RuntimeError, interpreter::evaluator::core::EvalResult};

/// Largest integer magnitude exactly representable as an `f64` (`2^53 - 1`).
pub const MAX_SAFE_U64_INT: u64 = 9_007_199_254_740_991;

/// Safely converts an `i64` to `f64` if and only if it is exactly
/// representable.
///
/// ## Errors
/// Returns `Err(error)` if the value exceeds `MAX_SAFE_U64_INT` in absolute
/// value.
///
/// ## Example
/// ```
/// use kiln::util::num::{MAX_SAFE_U64_INT, i64_to_f64_checked};
///
/// // Works for safe values
/// let result = i64_to_f64_checked(42, "too big!");
/// assert_eq!(result.unwrap(), 42.0);
///
/// // Fails for values outside safe range
/// let big = MAX_SAFE_U64_INT as i64 + 1;
/// assert!(i64_to_f64_checked(big, "too big!").is_err());
/// ```
#[allow(clippy::cast_precision_loss)]
pub fn i64_to_f64_checked<E>(value: i64, error: E) -> Result<f64, E> {
    if value.unsigned_abs() > MAX_SAFE_U64_INT {
        return Err(error);
    }
    Ok(value as f64)
}

/// Converts an integer operand to a float for mixed arithmetic.
///
/// ## Errors
/// Returns [`RuntimeError::InvalidConversion`] if the integer cannot be
/// represented exactly.
pub fn promote(value: i64, line: usize) -> EvalResult<f64> {
    i64_to_f64_checked(value,
                       RuntimeError::InvalidConversion { value: value.to_string(),
                                                         target: "Float".to_string(),
                                                         line })
}

/// Safely converts an `f64` to `i64` if the value is finite, within range, and
/// not fractional.
///
/// ## Errors
/// Returns [`RuntimeError::InvalidConversion`] for non-finite, out-of-range or
/// fractional values.
///
/// ## Example
/// ```
/// use kiln::{error::RuntimeError, util::num::f64_to_i64_checked};
///
/// assert_eq!(f64_to_i64_checked(1000.0, 1).unwrap(), 1000);
///
/// let err = f64_to_i64_checked(1.5, 123).unwrap_err();
/// assert!(matches!(err, RuntimeError::InvalidConversion { line: 123, .. }));
///
/// assert!(f64_to_i64_checked(1e20, 5).is_err());
/// ```
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_precision_loss)]
pub fn f64_to_i64_checked(value: f64, line: usize) -> EvalResult<i64> {
    let invalid = || RuntimeError::InvalidConversion { value: value.to_string(),
                                                       target: "Int".to_string(),
                                                       line };
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(invalid());
    }
    // i64::MAX as f64 rounds up to 2^63, which is itself out of range.
    if value < i64::MIN as f64 || value >= i64::MAX as f64 {
        return Err(invalid());
    }
    Ok(value as i64)
}

/// Converts a collection size to an integer value.
///
/// ## Errors
/// Returns [`RuntimeError::Overflow`] if the size does not fit in an `i64`.
pub fn usize_to_i64_checked(value: usize, line: usize) -> EvalResult<i64> {
    i64::try_from(value).map_err(|_| RuntimeError::Overflow { line })
}

/// Converts an index value into a position within a collection of `size`
/// elements.
///
/// ## Errors
/// Returns [`RuntimeError::IndexOutOfBounds`] if the index is negative or not
/// below `size`.
///
/// ## Example
/// ```
/// use kiln::{error::RuntimeError, util::num::checked_index};
///
/// assert_eq!(checked_index(2, 3, 0).unwrap(), 2);
///
/// let err = checked_index(-1, 3, 7).unwrap_err();
/// assert!(matches!(err, RuntimeError::IndexOutOfBounds { size: 3, found: -1, line: 7 }));
/// ```
pub fn checked_index(index: i64, size: usize, line: usize) -> EvalResult<usize> {
    usize::try_from(index).ok()
                          .filter(|position| *position < size)
                          .ok_or(RuntimeError::IndexOutOfBounds { size,
                                                                  found: index,
                                                                  line })
}
