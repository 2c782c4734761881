//! DAG traversal and rewriting.

use std::collections::{HashMap, HashSet};

use crate::expr::{Arena, ArrayOp, ExprId, ShapeExpr};

/// Every node reachable from `roots`, exactly once, with every dependency
/// before its dependents (reverse-postorder).
///
/// Lowered scripts can chain thousands of nodes, so this runs on an explicit
/// work stack instead of recursing.
pub fn traverse_depth_first(arena: &Arena, roots: &[ExprId]) -> Vec<ExprId> {
    let mut order = Vec::new();
    let mut emitted = HashSet::new();
    let mut stack: Vec<(ExprId, bool)> = roots.iter().rev().map(|&id| (id, false)).collect();

    while let Some((id, expanded)) = stack.pop() {
        if expanded {
            if emitted.insert(id) {
                order.push(id);
            }
            continue;
        }
        if emitted.contains(&id) {
            continue;
        }
        stack.push((id, true));
        let deps = arena.dependencies(id);
        for dep in deps.into_iter().rev() {
            if !emitted.contains(&dep) {
                stack.push((dep, false));
            }
        }
    }

    order
}

/// Rebuild the DAG reachable from `roots`, applying `f` to every node after
/// its children have been rewritten. Memoised by identity: shared
/// sub-expressions are rewritten once and stay shared.
///
/// `f` receives the node whose children already point at their rewritten
/// versions (the original node when nothing below it changed) and returns
/// the node to use in its place. Returns the full old-id to new-id mapping;
/// `f` must not change a node's kind.
pub fn map(
    arena: &mut Arena,
    roots: &[ExprId],
    mut f: impl FnMut(&mut Arena, ExprId) -> ExprId,
) -> HashMap<ExprId, ExprId> {
    let mut memo: HashMap<ExprId, ExprId> = HashMap::new();

    for id in traverse_depth_first(arena, roots) {
        let rebuilt = rebuild(arena, id, &memo);
        let mapped = f(arena, rebuilt);
        assert_eq!(
            std::mem::discriminant(&mapped),
            std::mem::discriminant(&id),
            "rewriter changed the kind of a node",
        );
        memo.insert(id, mapped);
    }

    memo
}

fn mapped_shape(memo: &HashMap<ExprId, ExprId>, id: crate::expr::ShapeId) -> crate::expr::ShapeId {
    match memo.get(&ExprId::Shape(id)) {
        Some(ExprId::Shape(mapped)) => *mapped,
        Some(ExprId::Array(_)) => panic!("shape rewritten into an array"),
        None => id,
    }
}

fn mapped_array(memo: &HashMap<ExprId, ExprId>, id: crate::expr::ArrayId) -> crate::expr::ArrayId {
    match memo.get(&ExprId::Array(id)) {
        Some(ExprId::Array(mapped)) => *mapped,
        Some(ExprId::Shape(_)) => panic!("array rewritten into a shape"),
        None => id,
    }
}

/// Clone `id` with its children substituted through `memo`, inserting a
/// fresh node only if some child actually changed.
fn rebuild(arena: &mut Arena, id: ExprId, memo: &HashMap<ExprId, ExprId>) -> ExprId {
    match id {
        ExprId::Shape(shape_id) => {
            let rewritten = match arena.shape(shape_id) {
                ShapeExpr::Import { .. } => return id,
                ShapeExpr::Where { mask } => ShapeExpr::Where {
                    mask: mapped_array(memo, *mask),
                },
                ShapeExpr::Join { a, b } => ShapeExpr::Join {
                    a: mapped_shape(memo, *a),
                    b: mapped_shape(memo, *b),
                },
            };
            if rewritten == *arena.shape(shape_id) {
                id
            } else {
                arena.insert_shape(rewritten).into()
            }
        }
        ExprId::Array(array_id) => {
            let expr = arena.array(array_id).clone();
            let shape = mapped_shape(memo, expr.shape);
            let op = match &expr.op {
                ArrayOp::BoolLiteral(_)
                | ArrayOp::IntegerLiteral(_)
                | ArrayOp::FloatLiteral(_)
                | ArrayOp::TextLiteral(_)
                | ArrayOp::BytesLiteral(_)
                | ArrayOp::Import { .. }
                | ArrayOp::Range
                | ArrayOp::JoinLeft
                | ArrayOp::JoinRight => expr.op.clone(),
                ArrayOp::Where { source, mask } => ArrayOp::Where {
                    source: mapped_array(memo, *source),
                    mask: mapped_array(memo, *mask),
                },
                ArrayOp::Pick { source, indexes } => ArrayOp::Pick {
                    source: mapped_array(memo, *source),
                    indexes: mapped_array(memo, *indexes),
                },
                ArrayOp::Add { a, b } => ArrayOp::Add {
                    a: mapped_array(memo, *a),
                    b: mapped_array(memo, *b),
                },
                ArrayOp::Subtract { a, b } => ArrayOp::Subtract {
                    a: mapped_array(memo, *a),
                    b: mapped_array(memo, *b),
                },
                ArrayOp::Multiply { a, b } => ArrayOp::Multiply {
                    a: mapped_array(memo, *a),
                    b: mapped_array(memo, *b),
                },
                ArrayOp::Divide { a, b } => ArrayOp::Divide {
                    a: mapped_array(memo, *a),
                    b: mapped_array(memo, *b),
                },
                ArrayOp::EqualTo { a, b } => ArrayOp::EqualTo {
                    a: mapped_array(memo, *a),
                    b: mapped_array(memo, *b),
                },
            };
            if shape == expr.shape && op == expr.op {
                id
            } else {
                arena
                    .insert_array(crate::expr::ArrayExpr {
                        dtype: expr.dtype,
                        shape,
                        op,
                    })
                    .into()
            }
        }
    }
}
