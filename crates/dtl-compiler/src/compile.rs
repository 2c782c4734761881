//! The compile pipeline: source text to program, commands, and manifest.

use indexmap::IndexMap;
use uuid::Uuid;

use dtl_core::LineIndex;
use dtl_ir::manifest;
use dtl_ir::{ArrayId, Command, ExprId, Importer, Mapping, Program};

use crate::error::{CompileError, ParseError};
use crate::{lower, mappings, parser, schedule};

/// Everything the evaluator needs to run a script.
#[derive(Debug)]
pub struct CompiledScript {
    pub program: Program,
    pub commands: Vec<Command>,
    /// Present when compiled with tracing; handed to the tracer after the
    /// command stream completes.
    pub manifest: Option<manifest::Manifest>,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Compile(#[from] CompileError),
}

impl Error {
    /// Byte span of the offending source region.
    pub fn span(&self) -> dtl_core::Span {
        match self {
            Error::Parse(err) => err.span,
            Error::Compile(err) => err.span,
        }
    }
}

/// Compile a script. The importer is consulted for input schemas only.
///
/// With `trace` set, lineage mappings are derived and composed, every
/// snapshot and mapping-index array is assigned a UUID and scheduled for
/// tracing, and the manifest is produced. Without it the command stream
/// only computes the exports.
pub fn compile(
    source: &str,
    importer: &mut dyn Importer,
    trace: bool,
) -> Result<CompiledScript, Error> {
    let script = parser::parse(source)?;
    let mut program = lower::lower_script(&script, importer)?;

    let exports: Vec<(String, Vec<(String, ArrayId)>)> = program
        .export_tables()
        .map(|table| {
            let columns = table
                .columns
                .iter()
                .map(|column| (column.name.clone(), column.expression))
                .collect();
            (table.export_as.clone(), columns)
        })
        .collect();

    if !trace {
        let mut roots: Vec<ExprId> = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for (_, columns) in &exports {
            for &(_, expression) in columns {
                if seen.insert(expression) {
                    roots.push(expression.into());
                }
            }
        }
        let commands = schedule::compile_ir_to_commands(&program.arena, &roots, &[], &exports);
        return Ok(CompiledScript {
            program,
            commands,
            manifest: None,
        });
    }

    // Roots of the mapping graph: every array a trace or export table
    // references, in program order.
    let mut root_arrays: Vec<ArrayId> = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for table in &program.tables {
        for column in table.columns() {
            if seen.insert(column.expression) {
                root_arrays.push(column.expression);
            }
        }
    }

    let composed = mappings::generate_mappings(&mut program.arena, &root_arrays);

    // One identifier per persisted array: snapshot arrays first, then the
    // index arrays the composed mappings introduced.
    let mut uuids: IndexMap<ArrayId, Uuid> = IndexMap::new();
    for &array in &root_arrays {
        uuids.entry(array).or_insert_with(Uuid::new_v4);
    }
    for mapping in &composed {
        for array in mapping.index_arrays() {
            uuids.entry(array).or_insert_with(Uuid::new_v4);
        }
    }

    let manifest = build_manifest(source, &program, &composed, &uuids);

    let roots: Vec<ExprId> = uuids.keys().map(|&array| array.into()).collect();
    let traces: Vec<(ArrayId, Uuid)> = uuids.iter().map(|(&array, &uuid)| (array, uuid)).collect();
    let commands = schedule::compile_ir_to_commands(&program.arena, &roots, &traces, &exports);

    Ok(CompiledScript {
        program,
        commands,
        manifest: Some(manifest),
    })
}

fn build_manifest(
    source: &str,
    program: &Program,
    composed: &[Mapping],
    uuids: &IndexMap<ArrayId, Uuid>,
) -> manifest::Manifest {
    let line_index = LineIndex::new(source);
    let position = |offset: u32| {
        let location = line_index.location(offset as usize);
        manifest::Location {
            lineno: location.lineno,
            column: location.column,
        }
    };

    let snapshots = program
        .trace_tables()
        .map(|table| manifest::Snapshot {
            start: position(table.span.start),
            end: position(table.span.end),
            columns: table
                .columns
                .iter()
                .map(|column| manifest::Column {
                    name: column.name.clone(),
                    array: uuids[&column.expression],
                })
                .collect(),
        })
        .collect();

    let mappings = composed
        .iter()
        .map(|mapping| match mapping {
            Mapping::Identity { src, tgt } => manifest::Mapping::Identity {
                src_array: uuids[src],
                tgt_array: uuids[tgt],
            },
            Mapping::ManyToOne {
                src,
                tgt,
                tgt_index,
            } => manifest::Mapping::ManyToOne {
                src_array: uuids[src],
                tgt_array: uuids[tgt],
                tgt_index_array: uuids[tgt_index],
            },
            Mapping::OneToMany {
                src,
                tgt,
                src_index,
            } => manifest::Mapping::OneToMany {
                src_array: uuids[src],
                tgt_array: uuids[tgt],
                src_index_array: uuids[src_index],
            },
            Mapping::ManyToMany {
                src,
                tgt,
                src_index,
                tgt_index,
            } => manifest::Mapping::ManyToMany {
                src_array: uuids[src],
                tgt_array: uuids[tgt],
                src_index_array: uuids[src_index],
                tgt_index_array: uuids[tgt_index],
            },
        })
        .collect();

    manifest::Manifest {
        source: source.to_owned(),
        snapshots,
        mappings,
    }
}
