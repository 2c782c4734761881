//! Compiler error types.
//!
//! Both carry a byte span into the source; the caller owns turning offsets
//! into line/column pairs (`dtl_core::LineIndex`). Lowering invariant
//! violations are not represented here: those are bugs and panic.

use dtl_core::Span;

/// Surface-syntax error. The parser stops at the first one.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

/// Name-resolution, dtype, arity, or unimplemented-construct error raised
/// during lowering.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct CompileError {
    pub message: String,
    pub span: Span,
}

impl CompileError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}
