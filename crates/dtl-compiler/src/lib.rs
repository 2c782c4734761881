//! DTL compiler: lexer, parser, lowering, lineage mappings, scheduler.
//!
//! The crate is organised as a pipeline:
//! - `lexer` / `parser` - source text to AST
//! - `lower` - AST to IR (`Program`)
//! - `mappings` - per-node lineage candidates and transitive composition
//! - `schedule` - reachable IR to the linear command stream
//! - `compile` - the whole thing in one call

pub mod ast;
pub mod compile;
pub mod error;
pub mod lexer;
pub mod lower;
pub mod mappings;
pub mod parser;
pub mod schedule;

#[cfg(test)]
mod lexer_tests;
#[cfg(test)]
mod parser_tests;

pub use compile::{CompiledScript, Error, compile};
pub use error::{CompileError, ParseError};
pub use lower::lower_script;
pub use mappings::generate_mappings;
pub use parser::parse;
pub use schedule::compile_ir_to_commands;
