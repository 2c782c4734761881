//! AST to IR lowering.
//!
//! Statements are compiled in program order against a `Context` holding the
//! growing program, the `WITH` bindings, and the importer (consulted for
//! input schemas only; no data moves during compilation).
//!
//! # Module organization
//!
//! - `scope` - compile-time column visibility
//! - `table` - table expressions: imports, references, SELECT with joins
//! - `expression` - column expressions against a scope

mod expression;
mod scope;
mod table;

use std::collections::HashMap;

use dtl_core::Span;
use dtl_ir::{Column, ExportTable, Importer, Level, Program, Table, TraceTable};

use crate::ast::{Script, Statement};
use crate::error::CompileError;

use self::scope::Scope;

/// Lower a parsed script into a `Program`.
pub fn lower_script(
    script: &Script,
    importer: &mut dyn Importer,
) -> Result<Program, CompileError> {
    let mut context = Context {
        program: Program::default(),
        globals: HashMap::new(),
        inputs: HashMap::new(),
        importer,
    };

    for statement in &script.statements {
        compile_statement(&mut context, statement)?;
    }

    Ok(context.program)
}

pub(crate) struct Context<'a> {
    pub program: Program,
    /// `WITH` bindings, by name.
    globals: HashMap<String, Scope>,
    /// One scope per import location, so repeated imports share IR nodes
    /// (and therefore shapes stay compatible under identity checking).
    inputs: HashMap<String, Scope>,
    importer: &'a mut dyn Importer,
}

impl Context<'_> {
    /// Materialise a scope into a trace table. Columns shadowed by an
    /// earlier column of the same name are dropped, mirroring lookup order.
    fn trace(&mut self, scope: &Scope, span: Span, level: Level) {
        let mut seen = std::collections::HashSet::new();
        let columns = scope
            .columns
            .iter()
            .filter(|column| seen.insert(column.name.clone()))
            .map(|column| Column {
                name: column.name.clone(),
                expression: column.expression,
            })
            .collect();
        self.program.tables.push(Table::Trace(TraceTable {
            span,
            level,
            columns,
        }));
    }

    fn export(&mut self, scope: &Scope, name: &str) {
        let columns = scope
            .columns
            .iter()
            .map(|column| Column {
                name: column.name.clone(),
                expression: column.expression,
            })
            .collect();
        self.program.tables.push(Table::Export(ExportTable {
            export_as: name.to_owned(),
            columns,
        }));
    }
}

fn compile_statement(context: &mut Context, statement: &Statement) -> Result<(), CompileError> {
    match statement {
        Statement::With(stmt) => {
            if context.globals.contains_key(&stmt.target.name) {
                return Err(CompileError::new(
                    format!("table '{}' is already defined", stmt.target.name),
                    stmt.target.span,
                ));
            }
            let scope = table::compile_table_expression(context, &stmt.expression)?;
            let stripped = scope.strip_namespaces();
            context.trace(&stripped, stmt.span, Level::Statement);
            context.globals.insert(stmt.target.name.clone(), stripped);
            Ok(())
        }
        Statement::Export(stmt) => {
            let scope = table::compile_table_expression(context, &stmt.expression)?;
            let stripped = scope.strip_namespaces();
            context.trace(&stripped, stmt.span, Level::Export);
            context.export(&stripped, &stmt.sink.value);
            Ok(())
        }
    }
}
