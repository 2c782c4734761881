//! Command-stream execution.
//!
//! Each command is a one-to-one translation to an array-runtime call. The
//! first failure aborts the run; nothing is exported after an error (and
//! sinks that buffer see nothing at all).

use std::sync::Arc;

use dtl_core::{Array, ArrayError, Table, Value, array};
use dtl_ir::{
    Arena, ArrayId, ArrayOp, Command, Exporter, Importer, RuntimeError, ShapeExpr, ShapeId, Tracer,
};

use crate::context::EvalContext;

pub struct Evaluator<'a, 'b, 't> {
    arena: &'a Arena,
    importer: &'b mut dyn Importer,
    exporter: &'b mut dyn Exporter,
    tracer: Option<&'t mut dyn Tracer>,
    context: EvalContext,
}

impl<'a, 'b, 't> Evaluator<'a, 'b, 't> {
    pub fn new(
        arena: &'a Arena,
        importer: &'b mut dyn Importer,
        exporter: &'b mut dyn Exporter,
        tracer: Option<&'t mut dyn Tracer>,
    ) -> Self {
        Self {
            arena,
            importer,
            exporter,
            tracer,
            context: EvalContext::default(),
        }
    }

    /// Run the whole command stream in order.
    pub fn execute(mut self, commands: &[Command]) -> Result<(), RuntimeError> {
        for command in commands {
            self.execute_command(command)?;
        }
        Ok(())
    }

    fn execute_command(&mut self, command: &Command) -> Result<(), RuntimeError> {
        match command {
            Command::EvaluateShape { expression } => {
                let value = self.evaluate_shape(*expression)?;
                self.context.insert_shape(*expression, value);
                Ok(())
            }
            Command::EvaluateArray { expression } => {
                let value = self.evaluate_array(*expression)?;
                debug_assert_eq!(
                    value.len() as u64,
                    self.context.shape(self.arena.array(*expression).shape),
                    "array length disagrees with its evaluated shape",
                );
                self.context.insert_array(*expression, value);
                Ok(())
            }
            Command::CollectArray { expression } => {
                self.context.collect_array(*expression);
                Ok(())
            }
            Command::TraceArray { expression, uuid } => {
                let array = Arc::clone(self.context.array(*expression));
                let tracer = self
                    .tracer
                    .as_mut()
                    .expect("trace command scheduled without a tracer");
                tracer.trace_array(*uuid, &array)
            }
            Command::ExportTable { name, columns } => {
                let table = Table::new(columns.iter().map(|(name, expression)| {
                    (name.clone(), Arc::clone(self.context.array(*expression)))
                }));
                self.exporter.export_table(name, table)
            }
        }
    }

    fn evaluate_shape(&mut self, id: ShapeId) -> Result<u64, RuntimeError> {
        match self.arena.shape(id) {
            ShapeExpr::Import { location } => {
                Ok(self.importer.import_table(location)?.num_rows() as u64)
            }
            ShapeExpr::Where { mask } => {
                let mask = self.context.array(*mask).as_bool()?;
                Ok(array::sum(mask))
            }
            ShapeExpr::Join { a, b } => self
                .context
                .shape(*a)
                .checked_mul(self.context.shape(*b))
                .ok_or(RuntimeError::Array(ArrayError::Overflow)),
        }
    }

    fn evaluate_array(&mut self, id: ArrayId) -> Result<Arc<Array>, RuntimeError> {
        let expr = self.arena.array(id);
        let rows = self.context.shape(expr.shape);

        let result = match &expr.op {
            ArrayOp::BoolLiteral(value) => array::broadcast(&Value::Bool(*value), rows),
            ArrayOp::IntegerLiteral(value) => array::broadcast(&Value::Int64(*value), rows),
            ArrayOp::FloatLiteral(value) => array::broadcast(&Value::Double(*value), rows),
            ArrayOp::TextLiteral(value) => array::broadcast(&Value::Text(value.clone()), rows),
            ArrayOp::BytesLiteral(value) => array::broadcast(&Value::Bytes(value.clone()), rows),

            ArrayOp::Import { location, name } => {
                let table = self.importer.import_table(location)?;
                let column =
                    table
                        .column(name)
                        .cloned()
                        .ok_or_else(|| RuntimeError::UnknownColumn {
                            location: location.clone(),
                            name: name.clone(),
                        })?;
                if column.dtype() != expr.dtype {
                    return Err(RuntimeError::Storage {
                        message: format!(
                            "input table '{location}' column '{name}' changed dtype: \
                             expected {}, found {}",
                            expr.dtype,
                            column.dtype(),
                        ),
                    });
                }
                return Ok(column);
            }

            ArrayOp::Where { source, mask } => {
                let mask = self.context.array(*mask).as_bool()?.to_vec();
                array::filter(self.context.array(*source), &mask)?
            }

            ArrayOp::Pick { source, indexes } => {
                let indexes = self.context.array(*indexes).as_index()?.to_vec();
                array::take(self.context.array(*source), &indexes)?
            }

            ArrayOp::Range => array::range(rows),

            ArrayOp::JoinLeft => {
                let (a, b) = self.join_factors(expr.shape);
                let mut indexes = Vec::with_capacity((a * b) as usize);
                for left in 0..a {
                    for _ in 0..b {
                        indexes.push(left);
                    }
                }
                Array::Index(indexes)
            }

            ArrayOp::JoinRight => {
                let (a, b) = self.join_factors(expr.shape);
                let mut indexes = Vec::with_capacity((a * b) as usize);
                for _ in 0..a {
                    for right in 0..b {
                        indexes.push(right);
                    }
                }
                Array::Index(indexes)
            }

            ArrayOp::Add { a, b } => array::add(self.context.array(*a), self.context.array(*b))?,
            ArrayOp::Subtract { a, b } => {
                array::subtract(self.context.array(*a), self.context.array(*b))?
            }
            ArrayOp::Multiply { a, b } => {
                array::multiply(self.context.array(*a), self.context.array(*b))?
            }
            ArrayOp::Divide { a, b } => {
                array::divide(self.context.array(*a), self.context.array(*b))?
            }
            ArrayOp::EqualTo { a, b } => {
                array::equal(self.context.array(*a), self.context.array(*b))?
            }
        };

        Ok(Arc::new(result))
    }

    /// The evaluated factor row counts of a `Join` shape.
    fn join_factors(&self, shape: ShapeId) -> (u64, u64) {
        let ShapeExpr::Join { a, b } = self.arena.shape(shape) else {
            panic!("join index array over a non-join shape");
        };
        (self.context.shape(*a), self.context.shape(*b))
    }
}
