//! The evaluator's caches.

use std::collections::HashMap;
use std::sync::Arc;

use dtl_core::Array;
use dtl_ir::{ArrayId, ShapeId};

/// Cached results of `EvaluateShape`/`EvaluateArray` commands. A missing
/// entry means the scheduler emitted commands out of order (or collected an
/// array before its last consumer) - a bug, not a runtime condition.
#[derive(Default)]
pub(crate) struct EvalContext {
    shapes: HashMap<ShapeId, u64>,
    arrays: HashMap<ArrayId, Arc<Array>>,
}

impl EvalContext {
    pub fn shape(&self, id: ShapeId) -> u64 {
        *self
            .shapes
            .get(&id)
            .expect("shape read before it was evaluated")
    }

    pub fn array(&self, id: ArrayId) -> &Arc<Array> {
        self.arrays
            .get(&id)
            .expect("array read before it was evaluated or after it was collected")
    }

    pub fn insert_shape(&mut self, id: ShapeId, value: u64) {
        self.shapes.insert(id, value);
    }

    pub fn insert_array(&mut self, id: ArrayId, array: Arc<Array>) {
        self.arrays.insert(id, array);
    }

    pub fn collect_array(&mut self, id: ArrayId) {
        let removed = self.arrays.remove(&id);
        assert!(removed.is_some(), "collecting an array that is not cached");
    }
}
