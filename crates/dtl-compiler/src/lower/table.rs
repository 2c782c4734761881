//! Table expression lowering.

use indexmap::IndexMap;

use dtl_core::{DType, Span};
use dtl_ir::{ArrayId, Level, ShapeId};

use crate::ast::{
    ColumnBinding, Expression, JoinClause, JoinConstraint, SelectExpression, TableExpression,
};
use crate::error::CompileError;

use super::Context;
use super::expression::compile_expression;
use super::scope::{Scope, ScopeColumn, default_namespaces};

pub(crate) fn compile_table_expression(
    context: &mut Context,
    expression: &TableExpression,
) -> Result<Scope, CompileError> {
    match expression {
        TableExpression::Reference(reference) => {
            let bound = context.globals.get(&reference.name.name).ok_or_else(|| {
                CompileError::new(
                    format!("unknown table '{}'", reference.name.name),
                    reference.span,
                )
            })?;
            let scope = Scope {
                columns: bound
                    .columns
                    .iter()
                    .map(|column| ScopeColumn {
                        name: column.name.clone(),
                        namespaces: default_namespaces(),
                        expression: column.expression,
                    })
                    .collect(),
            };
            context.trace(&scope, reference.span, Level::TableExpression);
            Ok(scope)
        }

        TableExpression::Import(import) => {
            let location = import.location.value.clone();
            if !context.inputs.contains_key(&location) {
                let schema = context.importer.import_schema(&location).map_err(|err| {
                    CompileError::new(format!("cannot import '{location}': {err}"), import.span)
                })?;
                let shape = context.program.arena.import_shape(&location);
                let columns = schema
                    .fields
                    .iter()
                    .map(|field| ScopeColumn {
                        name: field.name.clone(),
                        namespaces: default_namespaces(),
                        expression: context.program.arena.import(
                            &location,
                            &field.name,
                            field.dtype,
                            shape,
                        ),
                    })
                    .collect();
                context.inputs.insert(location.clone(), Scope { columns });
            }
            let scope = context.inputs[&location].clone();
            context.trace(&scope, import.span, Level::TableExpression);
            Ok(scope)
        }

        TableExpression::Select(select) => compile_select_expression(context, select),
    }
}

fn compile_select_expression(
    context: &mut Context,
    select: &SelectExpression,
) -> Result<Scope, CompileError> {
    if let Some(distinct) = &select.distinct {
        return Err(CompileError::new(
            "SELECT DISTINCT is not implemented",
            distinct.span,
        ));
    }

    let mut scope = compile_table_expression(context, &select.source.expression)?;

    // The source's columns become reachable unqualified and, when the
    // binding has a name, qualified through it.
    let source_name = select.source.binding_name().map(str::to_owned);
    for column in &mut scope.columns {
        column.namespaces.insert(None);
        if let Some(name) = &source_name {
            column.namespaces.insert(Some(name.clone()));
        }
    }

    for join in &select.joins {
        scope = compile_join_clause(context, scope, join)?;
    }

    if let Some(where_clause) = &select.where_clause {
        let mask = compile_expression(context, &scope, &where_clause.predicate)?;
        require_bool(context, mask, "WHERE predicate", where_clause.predicate.span())?;

        let shape = context.program.arena.where_shape(mask);
        scope = Scope {
            columns: scope
                .columns
                .iter()
                .map(|column| ScopeColumn {
                    name: column.name.clone(),
                    namespaces: column.namespaces.clone(),
                    expression: context.program.arena.filter(column.expression, mask, shape),
                })
                .collect(),
        };
    }

    if let Some(group_by) = &select.group_by {
        return Err(CompileError::new(
            "GROUP BY is not implemented",
            group_by.span,
        ));
    }

    // Collect the select list into a name-indexed ordered map. Later
    // bindings overwrite earlier ones of the same name; the wildcard never
    // overwrites anything.
    let mut columns: IndexMap<String, ArrayId> = IndexMap::new();
    for binding in &select.columns {
        match binding {
            ColumnBinding::Wildcard { .. } => {
                for column in &scope.columns {
                    if column.namespaces.contains(&None) && !columns.contains_key(&column.name) {
                        columns.insert(column.name.clone(), column.expression);
                    }
                }
            }
            ColumnBinding::Expression { expression, alias } => {
                let compiled = compile_expression(context, &scope, expression)?;
                let name = match alias {
                    Some(alias) => alias.name.clone(),
                    None => implicit_name(expression)?,
                };
                columns.insert(name, compiled);
            }
        }
    }

    let result = Scope {
        columns: columns
            .into_iter()
            .map(|(name, expression)| ScopeColumn {
                name,
                namespaces: default_namespaces(),
                expression,
            })
            .collect(),
    };
    context.trace(&result, select.span, Level::Statement);
    Ok(result)
}

fn compile_join_clause(
    context: &mut Context,
    scope: Scope,
    join: &JoinClause,
) -> Result<Scope, CompileError> {
    let predicate = match &join.constraint {
        JoinConstraint::On(predicate) => predicate,
        JoinConstraint::Using { span, .. } => {
            return Err(CompileError::new("JOIN ... USING is not implemented", *span));
        }
    };

    let join_scope = compile_table_expression(context, &join.table.expression)?;
    let join_name = join.table.binding_name().map(str::to_owned);

    let source_shape = scope_shape(context, &scope, join.span)?;
    let join_shape = scope_shape(context, &join_scope, join.span)?;

    // Indexes realising the full Cartesian product of both sides.
    let shape_full = context.program.arena.join_shape(source_shape, join_shape);
    let left_full = context.program.arena.join_left(shape_full);
    let right_full = context.program.arena.join_right(shape_full);

    // Scratch scope over the product, for compiling the predicate.
    let mut scratch = Vec::new();
    for column in &scope.columns {
        scratch.push(ScopeColumn {
            name: column.name.clone(),
            namespaces: column.namespaces.clone(),
            expression: context.program.arena.pick(column.expression, left_full),
        });
    }
    for column in &join_scope.columns {
        let mut namespaces = column.namespaces.clone();
        if let Some(name) = &join_name {
            namespaces.insert(Some(name.clone()));
        }
        scratch.push(ScopeColumn {
            name: column.name.clone(),
            namespaces,
            expression: context.program.arena.pick(column.expression, right_full),
        });
    }
    let scratch = Scope { columns: scratch };

    let mask = compile_expression(context, &scratch, predicate)?;
    require_bool(context, mask, "join predicate", predicate.span())?;

    // Filter both index arrays, then rebuild the scope by picking every
    // original column through the filtered indexes.
    let shape = context.program.arena.where_shape(mask);
    let left = context.program.arena.filter(left_full, mask, shape);
    let right = context.program.arena.filter(right_full, mask, shape);

    let mut columns = Vec::new();
    for column in &scope.columns {
        columns.push(ScopeColumn {
            name: column.name.clone(),
            namespaces: column.namespaces.clone(),
            expression: context.program.arena.pick(column.expression, left),
        });
    }
    for column in &join_scope.columns {
        let mut namespaces = column.namespaces.clone();
        if let Some(name) = &join_name {
            namespaces.insert(Some(name.clone()));
        }
        columns.push(ScopeColumn {
            name: column.name.clone(),
            namespaces,
            expression: context.program.arena.pick(column.expression, right),
        });
    }

    let result = Scope { columns };
    context.trace(&result, join.span, Level::Internal);
    Ok(result)
}

/// The common shape of a scope's columns (they all share one by
/// construction, so the first column's shape is it).
fn scope_shape(context: &Context, scope: &Scope, span: Span) -> Result<ShapeId, CompileError> {
    match scope.columns.first() {
        Some(column) => Ok(context.program.arena.array(column.expression).shape),
        None => Err(CompileError::new(
            "cannot join a table with no columns",
            span,
        )),
    }
}

fn require_bool(
    context: &Context,
    expression: ArrayId,
    what: &str,
    span: Span,
) -> Result<(), CompileError> {
    let dtype = context.program.arena.array(expression).dtype;
    if dtype != DType::Bool {
        return Err(CompileError::new(
            format!("{what} must be bool, found {dtype}"),
            span,
        ));
    }
    Ok(())
}

/// The column name a bare expression binds under. Only column references
/// have one; everything else needs an explicit alias.
fn implicit_name(expression: &Expression) -> Result<String, CompileError> {
    match expression {
        Expression::ColumnReference(reference) => Ok(reference.name.clone()),
        other => Err(CompileError::new(
            "expression must be given a name with AS",
            other.span(),
        )),
    }
}
