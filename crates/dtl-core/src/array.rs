//! Columnar arrays and the kernels the evaluator is built on.
//!
//! All kernels are pure: they read their operands and produce fresh arrays.
//! Length and dtype checking happens here, so callers can rely on a kernel
//! either returning an array of the documented shape or an `ArrayError`.

use crate::dtype::{DType, Value};

#[derive(Debug, Clone, thiserror::Error)]
pub enum ArrayError {
    #[error("dtype mismatch: {left} vs {right}")]
    DTypeMismatch { left: DType, right: DType },

    #[error("length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("index {index} out of bounds for array of {len} rows")]
    IndexOutOfBounds { index: u64, len: usize },

    #[error("arithmetic is not defined for {dtype} arrays")]
    NonNumeric { dtype: DType },

    #[error("integer overflow")]
    Overflow,

    #[error("division by zero")]
    DivisionByZero,
}

/// A typed column of values.
#[derive(Clone, Debug, PartialEq)]
pub enum Array {
    Bool(Vec<bool>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Double(Vec<f64>),
    Text(Vec<String>),
    Bytes(Vec<Vec<u8>>),
    Index(Vec<u64>),
    /// Microseconds since the Unix epoch.
    Timestamp(Vec<i64>),
    /// Days since the Unix epoch.
    Date(Vec<i32>),
}

/// Apply `$f` to the payload of any variant, rebuilding the same variant
/// from the result. `$f` is expanded once per variant, so it may be a
/// generic function or a closure over locals.
macro_rules! map_values {
    ($array:expr, $f:expr) => {
        match $array {
            Array::Bool(values) => Array::Bool($f(values)?),
            Array::Int32(values) => Array::Int32($f(values)?),
            Array::Int64(values) => Array::Int64($f(values)?),
            Array::Double(values) => Array::Double($f(values)?),
            Array::Text(values) => Array::Text($f(values)?),
            Array::Bytes(values) => Array::Bytes($f(values)?),
            Array::Index(values) => Array::Index($f(values)?),
            Array::Timestamp(values) => Array::Timestamp($f(values)?),
            Array::Date(values) => Array::Date($f(values)?),
        }
    };
}

impl Array {
    pub fn dtype(&self) -> DType {
        match self {
            Array::Bool(_) => DType::Bool,
            Array::Int32(_) => DType::Int32,
            Array::Int64(_) => DType::Int64,
            Array::Double(_) => DType::Double,
            Array::Text(_) => DType::Text,
            Array::Bytes(_) => DType::Bytes,
            Array::Index(_) => DType::Index,
            Array::Timestamp(_) => DType::Timestamp,
            Array::Date(_) => DType::Date,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Array::Bool(values) => values.len(),
            Array::Int32(values) => values.len(),
            Array::Int64(values) => values.len(),
            Array::Double(values) => values.len(),
            Array::Text(values) => values.len(),
            Array::Bytes(values) => values.len(),
            Array::Index(values) => values.len(),
            Array::Timestamp(values) => values.len(),
            Array::Date(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Point read. Panics if `index` is out of bounds; kernels are the
    /// bounds-checked surface, this is for tests and exporters walking rows.
    pub fn value(&self, index: usize) -> Value {
        match self {
            Array::Bool(v) => Value::Bool(v[index]),
            Array::Int32(v) => Value::Int32(v[index]),
            Array::Int64(v) => Value::Int64(v[index]),
            Array::Double(v) => Value::Double(v[index]),
            Array::Text(v) => Value::Text(v[index].clone()),
            Array::Bytes(v) => Value::Bytes(v[index].clone()),
            Array::Index(v) => Value::Index(v[index]),
            Array::Timestamp(v) => Value::Timestamp(v[index]),
            Array::Date(v) => Value::Date(v[index]),
        }
    }

    /// Borrow the payload of a `Bool` array.
    pub fn as_bool(&self) -> Result<&[bool], ArrayError> {
        match self {
            Array::Bool(values) => Ok(values),
            other => Err(ArrayError::DTypeMismatch {
                left: DType::Bool,
                right: other.dtype(),
            }),
        }
    }

    /// Borrow the payload of an `Index` array.
    pub fn as_index(&self) -> Result<&[u64], ArrayError> {
        match self {
            Array::Index(values) => Ok(values),
            other => Err(ArrayError::DTypeMismatch {
                left: DType::Index,
                right: other.dtype(),
            }),
        }
    }
}

fn filter_values<T: Clone>(values: &[T], mask: &[bool]) -> Result<Vec<T>, ArrayError> {
    if values.len() != mask.len() {
        return Err(ArrayError::LengthMismatch {
            left: values.len(),
            right: mask.len(),
        });
    }
    Ok(values
        .iter()
        .zip(mask)
        .filter(|(_, keep)| **keep)
        .map(|(value, _)| value.clone())
        .collect())
}

/// Keep the rows of `array` where `mask` is true.
pub fn filter(array: &Array, mask: &[bool]) -> Result<Array, ArrayError> {
    Ok(map_values!(array, |values| filter_values(values, mask)))
}

fn take_values<T: Clone>(values: &[T], indexes: &[u64]) -> Result<Vec<T>, ArrayError> {
    indexes
        .iter()
        .map(|&index| {
            values
                .get(index as usize)
                .cloned()
                .ok_or(ArrayError::IndexOutOfBounds {
                    index,
                    len: values.len(),
                })
        })
        .collect()
}

/// Gather: `result[i] = array[indexes[i]]`.
pub fn take(array: &Array, indexes: &[u64]) -> Result<Array, ArrayError> {
    Ok(map_values!(array, |values| take_values(values, indexes)))
}

fn check_binary(a: &Array, b: &Array) -> Result<(), ArrayError> {
    if a.dtype() != b.dtype() {
        return Err(ArrayError::DTypeMismatch {
            left: a.dtype(),
            right: b.dtype(),
        });
    }
    if a.len() != b.len() {
        return Err(ArrayError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(())
}

fn zip_i32(
    a: &[i32],
    b: &[i32],
    op: impl Fn(i32, i32) -> Result<i32, ArrayError>,
) -> Result<Vec<i32>, ArrayError> {
    a.iter().zip(b).map(|(&x, &y)| op(x, y)).collect()
}

fn zip_i64(
    a: &[i64],
    b: &[i64],
    op: impl Fn(i64, i64) -> Result<i64, ArrayError>,
) -> Result<Vec<i64>, ArrayError> {
    a.iter().zip(b).map(|(&x, &y)| op(x, y)).collect()
}

fn zip_f64(a: &[f64], b: &[f64], op: impl Fn(f64, f64) -> f64) -> Vec<f64> {
    a.iter().zip(b).map(|(&x, &y)| op(x, y)).collect()
}

/// Element-wise addition over matching numeric arrays.
pub fn add(a: &Array, b: &Array) -> Result<Array, ArrayError> {
    check_binary(a, b)?;
    match (a, b) {
        (Array::Int32(x), Array::Int32(y)) => Ok(Array::Int32(zip_i32(x, y, |x, y| {
            x.checked_add(y).ok_or(ArrayError::Overflow)
        })?)),
        (Array::Int64(x), Array::Int64(y)) => Ok(Array::Int64(zip_i64(x, y, |x, y| {
            x.checked_add(y).ok_or(ArrayError::Overflow)
        })?)),
        (Array::Double(x), Array::Double(y)) => Ok(Array::Double(zip_f64(x, y, |x, y| x + y))),
        _ => Err(ArrayError::NonNumeric { dtype: a.dtype() }),
    }
}

/// Element-wise subtraction over matching numeric arrays.
pub fn subtract(a: &Array, b: &Array) -> Result<Array, ArrayError> {
    check_binary(a, b)?;
    match (a, b) {
        (Array::Int32(x), Array::Int32(y)) => Ok(Array::Int32(zip_i32(x, y, |x, y| {
            x.checked_sub(y).ok_or(ArrayError::Overflow)
        })?)),
        (Array::Int64(x), Array::Int64(y)) => Ok(Array::Int64(zip_i64(x, y, |x, y| {
            x.checked_sub(y).ok_or(ArrayError::Overflow)
        })?)),
        (Array::Double(x), Array::Double(y)) => Ok(Array::Double(zip_f64(x, y, |x, y| x - y))),
        _ => Err(ArrayError::NonNumeric { dtype: a.dtype() }),
    }
}

/// Element-wise multiplication over matching numeric arrays.
pub fn multiply(a: &Array, b: &Array) -> Result<Array, ArrayError> {
    check_binary(a, b)?;
    match (a, b) {
        (Array::Int32(x), Array::Int32(y)) => Ok(Array::Int32(zip_i32(x, y, |x, y| {
            x.checked_mul(y).ok_or(ArrayError::Overflow)
        })?)),
        (Array::Int64(x), Array::Int64(y)) => Ok(Array::Int64(zip_i64(x, y, |x, y| {
            x.checked_mul(y).ok_or(ArrayError::Overflow)
        })?)),
        (Array::Double(x), Array::Double(y)) => Ok(Array::Double(zip_f64(x, y, |x, y| x * y))),
        _ => Err(ArrayError::NonNumeric { dtype: a.dtype() }),
    }
}

/// Element-wise division. Integer division by zero is an error; doubles
/// follow IEEE-754.
pub fn divide(a: &Array, b: &Array) -> Result<Array, ArrayError> {
    check_binary(a, b)?;
    match (a, b) {
        (Array::Int32(x), Array::Int32(y)) => Ok(Array::Int32(zip_i32(x, y, |x, y| {
            if y == 0 {
                Err(ArrayError::DivisionByZero)
            } else {
                x.checked_div(y).ok_or(ArrayError::Overflow)
            }
        })?)),
        (Array::Int64(x), Array::Int64(y)) => Ok(Array::Int64(zip_i64(x, y, |x, y| {
            if y == 0 {
                Err(ArrayError::DivisionByZero)
            } else {
                x.checked_div(y).ok_or(ArrayError::Overflow)
            }
        })?)),
        (Array::Double(x), Array::Double(y)) => Ok(Array::Double(zip_f64(x, y, |x, y| x / y))),
        _ => Err(ArrayError::NonNumeric { dtype: a.dtype() }),
    }
}

fn zip_eq<T: PartialEq>(a: &[T], b: &[T]) -> Vec<bool> {
    a.iter().zip(b).map(|(x, y)| x == y).collect()
}

/// Element-wise equality over matching arrays of any dtype.
pub fn equal(a: &Array, b: &Array) -> Result<Array, ArrayError> {
    check_binary(a, b)?;
    let mask = match (a, b) {
        (Array::Bool(x), Array::Bool(y)) => zip_eq(x, y),
        (Array::Int32(x), Array::Int32(y)) => zip_eq(x, y),
        (Array::Int64(x), Array::Int64(y)) => zip_eq(x, y),
        (Array::Double(x), Array::Double(y)) => zip_eq(x, y),
        (Array::Text(x), Array::Text(y)) => zip_eq(x, y),
        (Array::Bytes(x), Array::Bytes(y)) => zip_eq(x, y),
        (Array::Index(x), Array::Index(y)) => zip_eq(x, y),
        (Array::Timestamp(x), Array::Timestamp(y)) => zip_eq(x, y),
        (Array::Date(x), Array::Date(y)) => zip_eq(x, y),
        _ => unreachable!("check_binary accepted mismatched variants"),
    };
    Ok(Array::Bool(mask))
}

/// Number of true cells in a mask.
pub fn sum(mask: &[bool]) -> u64 {
    mask.iter().filter(|&&keep| keep).count() as u64
}

/// `[0, 1, ..., n-1]` as an index array.
pub fn range(n: u64) -> Array {
    Array::Index((0..n).collect())
}

/// Repeat `value` `n` times.
pub fn broadcast(value: &Value, n: u64) -> Array {
    let n = n as usize;
    match value {
        Value::Bool(v) => Array::Bool(vec![*v; n]),
        Value::Int32(v) => Array::Int32(vec![*v; n]),
        Value::Int64(v) => Array::Int64(vec![*v; n]),
        Value::Double(v) => Array::Double(vec![*v; n]),
        Value::Text(v) => Array::Text(vec![v.clone(); n]),
        Value::Bytes(v) => Array::Bytes(vec![v.clone(); n]),
        Value::Index(v) => Array::Index(vec![*v; n]),
        Value::Timestamp(v) => Array::Timestamp(vec![*v; n]),
        Value::Date(v) => Array::Date(vec![*v; n]),
    }
}
