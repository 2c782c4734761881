//! `dtl`: run a DTL script against Parquet tables.

mod io;

#[cfg(test)]
mod io_tests;
#[cfg(test)]
mod main_tests;

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use dtl_core::LineIndex;
use dtl_eval::RunError;
use dtl_ir::Tracer;

use io::{FsExporter, FsImporter, FsTracer};

#[derive(Parser, Debug)]
#[command(name = "dtl", version, about = "Run a DTL script")]
struct Args {
    /// Script file to run; standard input when omitted.
    script: Option<PathBuf>,

    /// Directory containing input Parquet files.
    #[arg(long, value_name = "PATH")]
    input_dir: PathBuf,

    /// Directory result Parquet files are written to.
    #[arg(long, value_name = "PATH")]
    output_dir: PathBuf,

    /// Directory the trace manifest and arrays are written to. Tracing is
    /// disabled when absent.
    #[arg(long, value_name = "PATH")]
    trace_dir: Option<PathBuf>,
}

/// Exit statuses: 1 for script errors (parse/compile), 2 for runtime and
/// i/o failures.
const EXIT_SCRIPT_ERROR: u8 = 1;
const EXIT_RUNTIME_ERROR: u8 = 2;

fn main() -> ExitCode {
    let args = Args::parse();
    match run_cli(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn run_cli(args: &Args) -> Result<(), u8> {
    let source = match read_script(args.script.as_deref()) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("cannot read script: {err}");
            return Err(EXIT_RUNTIME_ERROR);
        }
    };

    let mut importer = FsImporter::new(args.input_dir.clone());
    let mut exporter = FsExporter::new(args.output_dir.clone());
    let mut tracer = match &args.trace_dir {
        Some(dir) => match FsTracer::new(dir.clone()) {
            Ok(tracer) => Some(tracer),
            Err(err) => {
                eprintln!("cannot prepare trace directory: {err}");
                return Err(EXIT_RUNTIME_ERROR);
            }
        },
        None => None,
    };

    let result = dtl_eval::run(
        &source,
        &mut importer,
        &mut exporter,
        tracer.as_mut().map(|tracer| tracer as &mut dyn Tracer),
    );

    match result {
        Ok(()) => {}
        Err(RunError::Compile(err)) => {
            let location = LineIndex::new(&source).location(err.span().start as usize);
            eprintln!(
                "error at line {}, column {}: {err}",
                location.lineno, location.column,
            );
            return Err(EXIT_SCRIPT_ERROR);
        }
        Err(RunError::Runtime(err)) => {
            eprintln!("runtime error: {err}");
            return Err(EXIT_RUNTIME_ERROR);
        }
    }

    // All commands succeeded; only now touch the output directory.
    if let Err(err) = exporter.flush() {
        eprintln!("cannot write outputs: {err}");
        return Err(EXIT_RUNTIME_ERROR);
    }

    Ok(())
}

fn read_script(path: Option<&std::path::Path>) -> std::io::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut source = String::new();
            std::io::stdin().read_to_string(&mut source)?;
            Ok(source)
        }
    }
}
