//! The end-to-end pipeline: compile, evaluate, write the manifest.

use dtl_ir::{Exporter, Importer, RuntimeError, Tracer};

use crate::eval::Evaluator;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// Parse or compile failure, with a span into the source.
    #[error(transparent)]
    Compile(#[from] dtl_compiler::Error),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Compile and evaluate a script.
///
/// Tracing is enabled by passing a tracer; it receives every persisted
/// array during evaluation and the manifest once the whole stream has
/// succeeded. No partial results: any error aborts before further exports.
pub fn run(
    source: &str,
    importer: &mut dyn Importer,
    exporter: &mut dyn Exporter,
    mut tracer: Option<&mut dyn Tracer>,
) -> Result<(), RunError> {
    let script = dtl_compiler::compile(source, importer, tracer.is_some())?;

    let evaluator = Evaluator::new(
        &script.program.arena,
        importer,
        exporter,
        reborrow_tracer(&mut tracer),
    );
    evaluator.execute(&script.commands)?;

    if let (Some(tracer), Some(manifest)) = (tracer, script.manifest) {
        tracer.trace_manifest(&manifest)?;
    }

    Ok(())
}

/// Reborrow the tracer with a lifetime tied to this call instead of the
/// caller's original reference, so the `Option` can still be consumed
/// afterward.
fn reborrow_tracer<'a>(tracer: &'a mut Option<&mut dyn Tracer>) -> Option<&'a mut dyn Tracer> {
    match tracer {
        Some(tracer) => Some(&mut **tracer),
        None => None,
    }
}
