//! Column expression lowering against a scope.

use dtl_core::{DType, Span, Value};
use dtl_ir::ArrayId;

use crate::ast::{BinaryOp, Expression, FunctionCall, LiteralValue};
use crate::error::CompileError;

use super::Context;
use super::scope::Scope;

pub(crate) fn compile_expression(
    context: &mut Context,
    scope: &Scope,
    expression: &Expression,
) -> Result<ArrayId, CompileError> {
    match expression {
        Expression::ColumnReference(reference) => scope
            .lookup(reference.namespace.as_deref(), &reference.name)
            .ok_or_else(|| {
                let shown = match &reference.namespace {
                    Some(namespace) => format!("{namespace}.{}", reference.name),
                    None => reference.name.clone(),
                };
                CompileError::new(format!("could not resolve column '{shown}'"), reference.span)
            }),

        Expression::Literal(literal) => {
            // Literals broadcast to the scope's row count, so there must be
            // at least one column to take the shape from.
            let Some(column) = scope.columns.first() else {
                return Err(CompileError::new(
                    "cannot infer the shape of a literal in a table with no columns",
                    literal.span,
                ));
            };
            let shape = context.program.arena.array(column.expression).shape;
            let value = match &literal.value {
                LiteralValue::Bool(value) => Value::Bool(*value),
                LiteralValue::Integer(value) => Value::Int64(*value),
                LiteralValue::Float(value) => Value::Double(*value),
                LiteralValue::Text(value) => Value::Text(value.clone()),
                LiteralValue::Bytes(value) => Value::Bytes(value.clone()),
            };
            Ok(context.program.arena.literal(value, shape))
        }

        Expression::FunctionCall(call) => compile_function_call(context, scope, call),

        Expression::Binary(binary) => {
            let left = compile_expression(context, scope, &binary.left)?;
            let right = compile_expression(context, scope, &binary.right)?;
            match binary.op {
                BinaryOp::Add => {
                    require_numeric_operands(context, left, right, binary.op, binary.span)?;
                    Ok(context.program.arena.add(left, right))
                }
                BinaryOp::Subtract => {
                    require_numeric_operands(context, left, right, binary.op, binary.span)?;
                    Ok(context.program.arena.subtract(left, right))
                }
                BinaryOp::Multiply => {
                    require_numeric_operands(context, left, right, binary.op, binary.span)?;
                    Ok(context.program.arena.multiply(left, right))
                }
                BinaryOp::Divide => {
                    require_numeric_operands(context, left, right, binary.op, binary.span)?;
                    Ok(context.program.arena.divide(left, right))
                }
                BinaryOp::Equal => {
                    require_matching_dtypes(context, left, right, binary.op, binary.span)?;
                    Ok(context.program.arena.equal_to(left, right))
                }
                BinaryOp::NotEqual
                | BinaryOp::LessThan
                | BinaryOp::LessThanEqual
                | BinaryOp::GreaterThan
                | BinaryOp::GreaterThanEqual => Err(CompileError::new(
                    format!("comparison '{}' is not implemented", binary.op.symbol()),
                    binary.span,
                )),
            }
        }
    }
}

fn compile_function_call(
    context: &mut Context,
    scope: &Scope,
    call: &FunctionCall,
) -> Result<ArrayId, CompileError> {
    if call.name.name != "add" {
        return Err(CompileError::new(
            format!("unknown function '{}'", call.name.name),
            call.name.span,
        ));
    }
    if call.args.len() != 2 {
        return Err(CompileError::new(
            format!("add() takes exactly 2 arguments, got {}", call.args.len()),
            call.span,
        ));
    }

    let a = compile_expression(context, scope, &call.args[0])?;
    let b = compile_expression(context, scope, &call.args[1])?;
    require_numeric_operands(context, a, b, BinaryOp::Add, call.span)?;
    Ok(context.program.arena.add(a, b))
}

fn require_matching_dtypes(
    context: &Context,
    left: ArrayId,
    right: ArrayId,
    op: BinaryOp,
    span: Span,
) -> Result<(DType, DType), CompileError> {
    let left = context.program.arena.array(left).dtype;
    let right = context.program.arena.array(right).dtype;
    if left != right {
        return Err(CompileError::new(
            format!(
                "operands of '{}' have different dtypes: {left} vs {right}",
                op.symbol(),
            ),
            span,
        ));
    }
    Ok((left, right))
}

fn require_numeric_operands(
    context: &Context,
    left: ArrayId,
    right: ArrayId,
    op: BinaryOp,
    span: Span,
) -> Result<(), CompileError> {
    let (dtype, _) = require_matching_dtypes(context, left, right, op, span)?;
    if !dtype.is_numeric() {
        return Err(CompileError::new(
            format!("'{}' is not defined for {dtype} values", op.symbol()),
            span,
        ));
    }
    Ok(())
}
