//! Serialisable trace metadata.
//!
//! The manifest links every snapshot (the observable state of a table after
//! a statement) to the arrays persisted by the tracer, and records the
//! composed mappings between them. Arrays are referenced by UUID; the
//! tracer persists each one next to the manifest.

use serde::Serialize;
use uuid::Uuid;

/// 1-based line/column position, as reported to lineage viewers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Location {
    pub lineno: u32,
    pub column: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub array: Uuid,
}

/// The columns visible over one source span.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Snapshot {
    pub start: Location,
    pub end: Location,
    pub columns: Vec<Column>,
}

/// A lineage relation between two persisted arrays. Serialised untagged:
/// the set of present index fields distinguishes the four forms.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Mapping {
    Identity {
        src_array: Uuid,
        tgt_array: Uuid,
    },
    ManyToOne {
        src_array: Uuid,
        tgt_array: Uuid,
        tgt_index_array: Uuid,
    },
    OneToMany {
        src_array: Uuid,
        tgt_array: Uuid,
        src_index_array: Uuid,
    },
    ManyToMany {
        src_array: Uuid,
        tgt_array: Uuid,
        src_index_array: Uuid,
        tgt_index_array: Uuid,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Manifest {
    pub source: String,
    pub snapshots: Vec<Snapshot>,
    pub mappings: Vec<Mapping>,
}
