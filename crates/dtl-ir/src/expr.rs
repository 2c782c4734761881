//! The expression DAG.
//!
//! Expressions live in an append-only `Arena`; handles (`ShapeId`,
//! `ArrayId`) are the node identities. Identity is deliberately
//! reference-like, not structural: two `Range` nodes over the same shape are
//! distinct nodes with distinct handles, and mapping composition depends on
//! that to detect shared sub-expressions. Nothing is ever mutated or removed
//! once inserted.
//!
//! Constructors check the structural invariants (operand shapes of a binary
//! op are the same node, masks are BOOL, pick indexes are INDEX). A failed
//! check is a compiler bug, so they assert rather than return errors.

use dtl_core::{DType, Value};

/// Handle of a shape expression.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(u32);

/// Handle of an array expression.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArrayId(u32);

/// Handle of either kind of expression, for code that walks the whole DAG.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExprId {
    Shape(ShapeId),
    Array(ArrayId),
}

impl From<ShapeId> for ExprId {
    fn from(id: ShapeId) -> Self {
        ExprId::Shape(id)
    }
}

impl From<ArrayId> for ExprId {
    fn from(id: ArrayId) -> Self {
        ExprId::Array(id)
    }
}

/// A runtime row count, kept symbolic until evaluation.
///
/// `Join` is the only way shapes grow and `Where` the only way they shrink;
/// every other array operation carries its operand's shape through.
#[derive(Clone, Debug, PartialEq)]
pub enum ShapeExpr {
    /// Row count of an externally supplied table.
    Import { location: String },
    /// Popcount of a BOOL mask.
    Where { mask: ArrayId },
    /// `|a| * |b|`, the Cartesian product before any join predicate.
    Join { a: ShapeId, b: ShapeId },
}

/// An array-valued node: operation plus its `(dtype, shape)` signature.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrayExpr {
    pub dtype: DType,
    pub shape: ShapeId,
    pub op: ArrayOp,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ArrayOp {
    /// Literals broadcast to the node's shape at evaluation time.
    BoolLiteral(bool),
    IntegerLiteral(i64),
    FloatLiteral(f64),
    TextLiteral(String),
    BytesLiteral(Vec<u8>),
    /// A named column of an input table.
    Import { location: String, name: String },
    /// Element-wise filter of `source` by `mask`.
    Where { source: ArrayId, mask: ArrayId },
    /// Gather: `result[i] = source[indexes[i]]`.
    Pick { source: ArrayId, indexes: ArrayId },
    /// `[0, 1, ..., shape-1]` with dtype INDEX.
    Range,
    /// Left half of the Cartesian product indexes: each index of the
    /// shape's `a` operand repeated `|b|` times. The factor shapes are the
    /// operands of the node's `Join` shape.
    JoinLeft,
    /// Right half: `[0, |b|)` cycled `|a|` times.
    JoinRight,
    Add { a: ArrayId, b: ArrayId },
    Subtract { a: ArrayId, b: ArrayId },
    Multiply { a: ArrayId, b: ArrayId },
    Divide { a: ArrayId, b: ArrayId },
    /// Element-wise equality; dtype BOOL.
    EqualTo { a: ArrayId, b: ArrayId },
}

/// Append-only store of expression nodes.
#[derive(Clone, Debug, Default)]
pub struct Arena {
    shapes: Vec<ShapeExpr>,
    arrays: Vec<ArrayExpr>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shape(&self, id: ShapeId) -> &ShapeExpr {
        &self.shapes[id.0 as usize]
    }

    pub fn array(&self, id: ArrayId) -> &ArrayExpr {
        &self.arrays[id.0 as usize]
    }

    pub fn num_shapes(&self) -> usize {
        self.shapes.len()
    }

    pub fn num_arrays(&self) -> usize {
        self.arrays.len()
    }

    fn push_shape(&mut self, expr: ShapeExpr) -> ShapeId {
        let id = ShapeId(self.shapes.len() as u32);
        self.shapes.push(expr);
        id
    }

    fn push_array(&mut self, expr: ArrayExpr) -> ArrayId {
        let id = ArrayId(self.arrays.len() as u32);
        self.arrays.push(expr);
        id
    }

    // --- shape constructors ---

    pub fn import_shape(&mut self, location: impl Into<String>) -> ShapeId {
        self.push_shape(ShapeExpr::Import {
            location: location.into(),
        })
    }

    pub fn where_shape(&mut self, mask: ArrayId) -> ShapeId {
        assert_eq!(
            self.array(mask).dtype,
            DType::Bool,
            "where shape over a {} mask",
            self.array(mask).dtype,
        );
        self.push_shape(ShapeExpr::Where { mask })
    }

    pub fn join_shape(&mut self, a: ShapeId, b: ShapeId) -> ShapeId {
        self.push_shape(ShapeExpr::Join { a, b })
    }

    // --- array constructors ---

    pub fn literal(&mut self, value: Value, shape: ShapeId) -> ArrayId {
        let dtype = value.dtype();
        let op = match value {
            Value::Bool(v) => ArrayOp::BoolLiteral(v),
            Value::Int64(v) => ArrayOp::IntegerLiteral(v),
            Value::Double(v) => ArrayOp::FloatLiteral(v),
            Value::Text(v) => ArrayOp::TextLiteral(v),
            Value::Bytes(v) => ArrayOp::BytesLiteral(v),
            other => panic!("no literal form for {} values", other.dtype()),
        };
        self.push_array(ArrayExpr { dtype, shape, op })
    }

    pub fn import(
        &mut self,
        location: impl Into<String>,
        name: impl Into<String>,
        dtype: DType,
        shape: ShapeId,
    ) -> ArrayId {
        self.push_array(ArrayExpr {
            dtype,
            shape,
            op: ArrayOp::Import {
                location: location.into(),
                name: name.into(),
            },
        })
    }

    /// `Where` node. `shape` must be a `Where` shape over the same mask;
    /// the caller owns it so that every column filtered by one mask shares
    /// one shape node.
    pub fn filter(&mut self, source: ArrayId, mask: ArrayId, shape: ShapeId) -> ArrayId {
        assert_eq!(self.array(mask).dtype, DType::Bool, "filter by non-bool mask");
        assert_eq!(
            self.array(source).shape,
            self.array(mask).shape,
            "filter source and mask shapes differ",
        );
        assert!(
            matches!(self.shape(shape), ShapeExpr::Where { mask: m } if *m == mask),
            "filter shape is not the where-shape of its mask",
        );
        let dtype = self.array(source).dtype;
        self.push_array(ArrayExpr {
            dtype,
            shape,
            op: ArrayOp::Where { source, mask },
        })
    }

    pub fn pick(&mut self, source: ArrayId, indexes: ArrayId) -> ArrayId {
        assert_eq!(
            self.array(indexes).dtype,
            DType::Index,
            "pick through non-index array",
        );
        let dtype = self.array(source).dtype;
        let shape = self.array(indexes).shape;
        self.push_array(ArrayExpr {
            dtype,
            shape,
            op: ArrayOp::Pick { source, indexes },
        })
    }

    pub fn range(&mut self, shape: ShapeId) -> ArrayId {
        self.push_array(ArrayExpr {
            dtype: DType::Index,
            shape,
            op: ArrayOp::Range,
        })
    }

    pub fn join_left(&mut self, shape: ShapeId) -> ArrayId {
        assert!(
            matches!(self.shape(shape), ShapeExpr::Join { .. }),
            "join-left over a non-join shape",
        );
        self.push_array(ArrayExpr {
            dtype: DType::Index,
            shape,
            op: ArrayOp::JoinLeft,
        })
    }

    pub fn join_right(&mut self, shape: ShapeId) -> ArrayId {
        assert!(
            matches!(self.shape(shape), ShapeExpr::Join { .. }),
            "join-right over a non-join shape",
        );
        self.push_array(ArrayExpr {
            dtype: DType::Index,
            shape,
            op: ArrayOp::JoinRight,
        })
    }

    pub fn add(&mut self, a: ArrayId, b: ArrayId) -> ArrayId {
        self.arithmetic(a, b, |a, b| ArrayOp::Add { a, b })
    }

    pub fn subtract(&mut self, a: ArrayId, b: ArrayId) -> ArrayId {
        self.arithmetic(a, b, |a, b| ArrayOp::Subtract { a, b })
    }

    pub fn multiply(&mut self, a: ArrayId, b: ArrayId) -> ArrayId {
        self.arithmetic(a, b, |a, b| ArrayOp::Multiply { a, b })
    }

    pub fn divide(&mut self, a: ArrayId, b: ArrayId) -> ArrayId {
        self.arithmetic(a, b, |a, b| ArrayOp::Divide { a, b })
    }

    fn arithmetic(
        &mut self,
        a: ArrayId,
        b: ArrayId,
        op: impl FnOnce(ArrayId, ArrayId) -> ArrayOp,
    ) -> ArrayId {
        let (dtype, shape) = self.binary_signature(a, b);
        assert!(dtype.is_numeric(), "arithmetic over {dtype} arrays");
        self.push_array(ArrayExpr {
            dtype,
            shape,
            op: op(a, b),
        })
    }

    pub fn equal_to(&mut self, a: ArrayId, b: ArrayId) -> ArrayId {
        let (_, shape) = self.binary_signature(a, b);
        self.push_array(ArrayExpr {
            dtype: DType::Bool,
            shape,
            op: ArrayOp::EqualTo { a, b },
        })
    }

    fn binary_signature(&self, a: ArrayId, b: ArrayId) -> (DType, ShapeId) {
        let lhs = self.array(a);
        let rhs = self.array(b);
        assert_eq!(
            lhs.dtype, rhs.dtype,
            "binary operands have different dtypes",
        );
        assert_eq!(
            lhs.shape, rhs.shape,
            "binary operands have different shapes",
        );
        (lhs.dtype, lhs.shape)
    }

    /// Direct predecessors of a node: for arrays, the shape first, then the
    /// array operands in operand order.
    pub fn dependencies(&self, id: ExprId) -> Vec<ExprId> {
        match id {
            ExprId::Shape(id) => match self.shape(id) {
                ShapeExpr::Import { .. } => vec![],
                ShapeExpr::Where { mask } => vec![(*mask).into()],
                ShapeExpr::Join { a, b } => vec![(*a).into(), (*b).into()],
            },
            ExprId::Array(id) => {
                let expr = self.array(id);
                let mut deps: Vec<ExprId> = vec![expr.shape.into()];
                match &expr.op {
                    ArrayOp::BoolLiteral(_)
                    | ArrayOp::IntegerLiteral(_)
                    | ArrayOp::FloatLiteral(_)
                    | ArrayOp::TextLiteral(_)
                    | ArrayOp::BytesLiteral(_)
                    | ArrayOp::Import { .. }
                    | ArrayOp::Range
                    | ArrayOp::JoinLeft
                    | ArrayOp::JoinRight => {}
                    ArrayOp::Where { source, mask } => {
                        deps.push((*source).into());
                        deps.push((*mask).into());
                    }
                    ArrayOp::Pick { source, indexes } => {
                        deps.push((*source).into());
                        deps.push((*indexes).into());
                    }
                    ArrayOp::Add { a, b }
                    | ArrayOp::Subtract { a, b }
                    | ArrayOp::Multiply { a, b }
                    | ArrayOp::Divide { a, b }
                    | ArrayOp::EqualTo { a, b } => {
                        deps.push((*a).into());
                        deps.push((*b).into());
                    }
                }
                deps
            }
        }
    }

    /// Re-insert an already-built node verbatim. Used by the rewriter when a
    /// transformation changed one of the node's children.
    pub(crate) fn insert_shape(&mut self, expr: ShapeExpr) -> ShapeId {
        self.push_shape(expr)
    }

    pub(crate) fn insert_array(&mut self, expr: ArrayExpr) -> ArrayId {
        self.push_array(expr)
    }
}
