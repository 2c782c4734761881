//! Element types and scalar values.

use std::fmt;

/// Element type of an array. Closed set; every array is homogeneous.
///
/// `Index` is a non-negative row position into some other array. It is
/// deliberately distinct from `Int64`: index arrays participate in lineage
/// and gather operations, never in user arithmetic.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DType {
    Bool,
    Int32,
    Int64,
    Double,
    Text,
    Bytes,
    Index,
    /// Microseconds since the Unix epoch.
    Timestamp,
    /// Days since the Unix epoch.
    Date,
}

impl DType {
    /// True for the types arithmetic kernels accept.
    pub fn is_numeric(self) -> bool {
        matches!(self, DType::Int32 | DType::Int64 | DType::Double)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::Bool => "bool",
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::Double => "double",
            DType::Text => "text",
            DType::Bytes => "bytes",
            DType::Index => "index",
            DType::Timestamp => "timestamp",
            DType::Date => "date",
        };
        f.write_str(name)
    }
}

/// A single cell value. Used for literals (broadcast to a shape at
/// evaluation time) and for point reads out of arrays in tests.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
    Index(u64),
    Timestamp(i64),
    Date(i32),
}

impl Value {
    pub fn dtype(&self) -> DType {
        match self {
            Value::Bool(_) => DType::Bool,
            Value::Int32(_) => DType::Int32,
            Value::Int64(_) => DType::Int64,
            Value::Double(_) => DType::Double,
            Value::Text(_) => DType::Text,
            Value::Bytes(_) => DType::Bytes,
            Value::Index(_) => DType::Index,
            Value::Timestamp(_) => DType::Timestamp,
            Value::Date(_) => DType::Date,
        }
    }
}
