//! Contracts between the pipeline and the outside world, plus the
//! in-memory implementations used throughout the tests.
//!
//! All three are synchronous: the evaluator is single-threaded and treats
//! importer/exporter/tracer calls as ordinary blocking calls.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use uuid::Uuid;

use dtl_core::{Array, ArrayError, Schema, Table};

use crate::manifest::Manifest;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("unknown input table '{location}'")]
    UnknownTable { location: String },

    #[error("input table '{location}' has no column '{name}'")]
    UnknownColumn { location: String, name: String },

    #[error("input table '{location}' column '{name}' contains nulls")]
    NullColumn { location: String, name: String },

    #[error("table '{name}' exported twice")]
    DuplicateExport { name: String },

    #[error(transparent)]
    Array(#[from] ArrayError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Failures surfaced by an external storage backend.
    #[error("{message}")]
    Storage { message: String },
}

/// Source of input tables, keyed by location string.
pub trait Importer {
    fn import_schema(&mut self, location: &str) -> Result<Schema, RuntimeError>;
    fn import_table(&mut self, location: &str) -> Result<Arc<Table>, RuntimeError>;
}

/// Sink for exported result tables.
pub trait Exporter {
    fn export_table(&mut self, name: &str, table: Table) -> Result<(), RuntimeError>;
}

/// Sink for traced arrays and, once per run, the manifest.
pub trait Tracer {
    fn trace_array(&mut self, id: Uuid, array: &Array) -> Result<(), RuntimeError>;
    fn trace_manifest(&mut self, manifest: &Manifest) -> Result<(), RuntimeError>;
}

/// Importer over a fixed set of in-memory tables.
#[derive(Default)]
pub struct MemoryImporter {
    tables: HashMap<String, Arc<Table>>,
}

impl MemoryImporter {
    pub fn new(tables: impl IntoIterator<Item = (String, Table)>) -> Self {
        Self {
            tables: tables
                .into_iter()
                .map(|(name, table)| (name, Arc::new(table)))
                .collect(),
        }
    }
}

impl Importer for MemoryImporter {
    fn import_schema(&mut self, location: &str) -> Result<Schema, RuntimeError> {
        Ok(self.import_table(location)?.schema())
    }

    fn import_table(&mut self, location: &str) -> Result<Arc<Table>, RuntimeError> {
        self.tables
            .get(location)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownTable {
                location: location.to_owned(),
            })
    }
}

/// Exporter that collects results for inspection.
#[derive(Default)]
pub struct MemoryExporter {
    tables: IndexMap<String, Table>,
}

impl MemoryExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn results(&self) -> impl Iterator<Item = (&str, &Table)> {
        self.tables.iter().map(|(name, table)| (name.as_str(), table))
    }
}

impl Exporter for MemoryExporter {
    fn export_table(&mut self, name: &str, table: Table) -> Result<(), RuntimeError> {
        if self.tables.contains_key(name) {
            return Err(RuntimeError::DuplicateExport {
                name: name.to_owned(),
            });
        }
        self.tables.insert(name.to_owned(), table);
        Ok(())
    }
}

/// Tracer that records everything it is handed.
#[derive(Default)]
pub struct MemoryTracer {
    arrays: HashMap<Uuid, Array>,
    manifest: Option<Manifest>,
}

impl MemoryTracer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn array(&self, id: Uuid) -> Option<&Array> {
        self.arrays.get(&id)
    }

    pub fn num_arrays(&self) -> usize {
        self.arrays.len()
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }
}

impl Tracer for MemoryTracer {
    fn trace_array(&mut self, id: Uuid, array: &Array) -> Result<(), RuntimeError> {
        self.arrays.insert(id, array.clone());
        Ok(())
    }

    fn trace_manifest(&mut self, manifest: &Manifest) -> Result<(), RuntimeError> {
        self.manifest = Some(manifest.clone());
        Ok(())
    }
}
