//! The linear execution plan.
//!
//! The scheduler flattens the reachable DAG into a list of commands; the
//! evaluator runs them strictly in order. Every value a command reads must
//! have been produced by an earlier command.

use uuid::Uuid;

use crate::expr::{Arena, ArrayId, ExprId, ShapeId};

#[derive(Clone, Debug)]
pub enum Command {
    /// Compute a row count and cache it.
    EvaluateShape { expression: ShapeId },
    /// Compute an array and cache it.
    EvaluateArray { expression: ArrayId },
    /// Drop a cached array whose last consumer has run.
    CollectArray { expression: ArrayId },
    /// Persist a cached array to the tracer under a stable identifier.
    TraceArray { expression: ArrayId, uuid: Uuid },
    /// Materialise a named result table.
    ExportTable {
        name: String,
        columns: Vec<(String, ArrayId)>,
    },
}

impl Command {
    /// The expression this command caches, if any.
    pub fn provides(&self) -> Option<ExprId> {
        match self {
            Command::EvaluateShape { expression } => Some((*expression).into()),
            Command::EvaluateArray { expression } => Some((*expression).into()),
            Command::CollectArray { .. }
            | Command::TraceArray { .. }
            | Command::ExportTable { .. } => None,
        }
    }

    /// The cached arrays this command reads.
    pub fn array_dependencies(&self, arena: &Arena) -> Vec<ArrayId> {
        match self {
            Command::EvaluateShape { expression } => arena
                .dependencies((*expression).into())
                .into_iter()
                .filter_map(as_array)
                .collect(),
            Command::EvaluateArray { expression } => arena
                .dependencies((*expression).into())
                .into_iter()
                .filter_map(as_array)
                .collect(),
            Command::CollectArray { expression } => vec![*expression],
            Command::TraceArray { expression, .. } => vec![*expression],
            Command::ExportTable { columns, .. } => {
                columns.iter().map(|(_, expression)| *expression).collect()
            }
        }
    }
}

fn as_array(id: ExprId) -> Option<ArrayId> {
    match id {
        ExprId::Array(id) => Some(id),
        ExprId::Shape(_) => None,
    }
}
