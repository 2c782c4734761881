//! Core data structures for DTL.
//!
//! This crate holds everything both the compiler and the evaluator need to
//! agree on without depending on each other:
//! - `dtype` - the closed set of element types and scalar values
//! - `array` - the columnar array runtime and its kernels
//! - `table` - runtime tables (ordered named columns) and schemas
//! - `location` - byte offsets, line/column positions, spans

pub mod array;
pub mod dtype;
pub mod location;
pub mod table;


pub use array::{Array, ArrayError};
pub use dtype::{DType, Value};
pub use location::{LineIndex, Location, Span};
pub use table::{Field, Schema, Table};
