use dtl_core::{DType, Value};

use crate::expr::{Arena, ArrayOp, ExprId, ShapeExpr};

#[test]
fn nodes_are_identity_distinct() {
    let mut arena = Arena::new();
    let shape = arena.import_shape("input");
    let a = arena.range(shape);
    let b = arena.range(shape);
    // Structurally identical, but distinct nodes.
    assert_ne!(a, b);
    assert_eq!(arena.array(a), arena.array(b));
}

#[test]
fn import_column_signature() {
    let mut arena = Arena::new();
    let shape = arena.import_shape("input");
    let column = arena.import("input", "a", DType::Int64, shape);
    let expr = arena.array(column);
    assert_eq!(expr.dtype, DType::Int64);
    assert_eq!(expr.shape, shape);
    assert!(matches!(
        &expr.op,
        ArrayOp::Import { location, name } if location == "input" && name == "a"
    ));
}

#[test]
fn filter_takes_shape_from_mask() {
    let mut arena = Arena::new();
    let shape = arena.import_shape("input");
    let source = arena.import("input", "a", DType::Int64, shape);
    let flag = arena.import("input", "keep", DType::Bool, shape);
    let filtered_shape = arena.where_shape(flag);
    let filtered = arena.filter(source, flag, filtered_shape);

    assert_eq!(arena.array(filtered).shape, filtered_shape);
    assert_eq!(arena.array(filtered).dtype, DType::Int64);
    assert!(matches!(
        arena.shape(filtered_shape),
        ShapeExpr::Where { mask } if *mask == flag
    ));
}

#[test]
fn pick_takes_shape_from_indexes() {
    let mut arena = Arena::new();
    let src_shape = arena.import_shape("a");
    let idx_shape = arena.import_shape("b");
    let source = arena.import("a", "value", DType::Text, src_shape);
    let indexes = arena.range(idx_shape);
    let picked = arena.pick(source, indexes);

    assert_eq!(arena.array(picked).shape, idx_shape);
    assert_eq!(arena.array(picked).dtype, DType::Text);
}

#[test]
fn equal_to_is_bool() {
    let mut arena = Arena::new();
    let shape = arena.import_shape("input");
    let a = arena.import("input", "a", DType::Int64, shape);
    let b = arena.import("input", "b", DType::Int64, shape);
    let eq = arena.equal_to(a, b);
    assert_eq!(arena.array(eq).dtype, DType::Bool);
    assert_eq!(arena.array(eq).shape, shape);
}

#[test]
#[should_panic(expected = "different shapes")]
fn binary_over_mismatched_shapes_panics() {
    let mut arena = Arena::new();
    let shape_a = arena.import_shape("a");
    let shape_b = arena.import_shape("b");
    let a = arena.import("a", "x", DType::Int64, shape_a);
    let b = arena.import("b", "y", DType::Int64, shape_b);
    arena.add(a, b);
}

#[test]
#[should_panic(expected = "different dtypes")]
fn binary_over_mismatched_dtypes_panics() {
    let mut arena = Arena::new();
    let shape = arena.import_shape("input");
    let a = arena.import("input", "x", DType::Int64, shape);
    let b = arena.import("input", "y", DType::Double, shape);
    arena.add(a, b);
}

#[test]
#[should_panic(expected = "non-bool mask")]
fn filter_by_non_bool_mask_panics() {
    let mut arena = Arena::new();
    let shape = arena.import_shape("input");
    let source = arena.import("input", "a", DType::Int64, shape);
    let not_a_mask = arena.import("input", "b", DType::Int64, shape);
    let bool_col = arena.import("input", "c", DType::Bool, shape);
    let where_shape = arena.where_shape(bool_col);
    arena.filter(source, not_a_mask, where_shape);
}

#[test]
fn literal_from_value() {
    let mut arena = Arena::new();
    let shape = arena.import_shape("input");
    let lit = arena.literal(Value::Int64(42), shape);
    assert_eq!(arena.array(lit).dtype, DType::Int64);
    assert!(matches!(arena.array(lit).op, ArrayOp::IntegerLiteral(42)));
}

#[test]
fn dependencies_list_shape_first() {
    let mut arena = Arena::new();
    let shape = arena.import_shape("input");
    let a = arena.import("input", "a", DType::Int64, shape);
    let b = arena.import("input", "b", DType::Int64, shape);
    let sum = arena.add(a, b);

    let deps = arena.dependencies(sum.into());
    assert_eq!(
        deps,
        vec![ExprId::Shape(shape), ExprId::Array(a), ExprId::Array(b)]
    );

    assert_eq!(arena.dependencies(shape.into()), vec![]);
}

#[test]
fn join_shape_dependencies() {
    let mut arena = Arena::new();
    let a = arena.import_shape("a");
    let b = arena.import_shape("b");
    let joined = arena.join_shape(a, b);
    assert_eq!(
        arena.dependencies(joined.into()),
        vec![ExprId::Shape(a), ExprId::Shape(b)]
    );

    let left = arena.join_left(joined);
    let right = arena.join_right(joined);
    assert_eq!(arena.dependencies(left.into()), vec![ExprId::Shape(joined)]);
    assert_eq!(arena.array(left).dtype, DType::Index);
    assert_eq!(arena.array(right).dtype, DType::Index);
}
