use std::sync::Arc;

use indoc::indoc;
use tempfile::TempDir;

use dtl_core::{Array, Table};
use dtl_ir::{Exporter, Importer};

use crate::io::{FsExporter, FsImporter};
use crate::{Args, EXIT_RUNTIME_ERROR, EXIT_SCRIPT_ERROR, run_cli};

struct Fixture {
    _dir: TempDir,
    input_dir: std::path::PathBuf,
    output_dir: std::path::PathBuf,
    trace_dir: std::path::PathBuf,
    script: std::path::PathBuf,
}

fn fixture(script: &str, inputs: &[(&str, &[(&str, Array)])]) -> Fixture {
    let dir = TempDir::new().unwrap();
    let input_dir = dir.path().join("in");
    let output_dir = dir.path().join("out");
    let trace_dir = dir.path().join("trace");

    let mut writer = FsExporter::new(input_dir.clone());
    for (name, columns) in inputs {
        let table = Table::new(
            columns
                .iter()
                .map(|(name, array)| ((*name).to_owned(), Arc::new(array.clone()))),
        );
        writer.export_table(name, table).unwrap();
    }
    writer.flush().unwrap();

    let script_path = dir.path().join("script.dtl");
    std::fs::write(&script_path, script).unwrap();

    Fixture {
        _dir: dir,
        input_dir,
        output_dir,
        trace_dir,
        script: script_path,
    }
}

fn args(fixture: &Fixture, trace: bool) -> Args {
    Args {
        script: Some(fixture.script.clone()),
        input_dir: fixture.input_dir.clone(),
        output_dir: fixture.output_dir.clone(),
        trace_dir: trace.then(|| fixture.trace_dir.clone()),
    }
}

#[test]
fn runs_a_script_end_to_end() {
    let fixture = fixture(
        indoc! {"
            WITH input AS IMPORT 'input';
            WITH output AS SELECT a, b, add(a, b) AS c FROM input;
            EXPORT output TO 'output';
        "},
        &[(
            "input",
            &[
                ("a", Array::Int64(vec![1, 2, 3, 4])),
                ("b", Array::Int64(vec![3, 4, 5, 6])),
            ],
        )],
    );

    run_cli(&args(&fixture, true)).unwrap();

    let mut importer = FsImporter::new(fixture.output_dir.clone());
    let output = importer.import_table("output").unwrap();
    assert_eq!(
        **output.column("c").unwrap(),
        Array::Int64(vec![4, 6, 8, 10])
    );

    // Tracing produced a manifest and persisted arrays.
    let manifest: serde_json::Value = serde_json::from_slice(
        &std::fs::read(fixture.trace_dir.join("manifest.json")).unwrap(),
    )
    .unwrap();
    assert!(!manifest["snapshots"].as_array().unwrap().is_empty());
    let arrays = std::fs::read_dir(fixture.trace_dir.join("arrays")).unwrap();
    assert!(arrays.count() > 0);
}

#[test]
fn tracing_is_off_without_trace_dir() {
    let fixture = fixture(
        indoc! {"
            WITH input AS IMPORT 'input';
            EXPORT input TO 'copy';
        "},
        &[("input", &[("a", Array::Int64(vec![1]))])],
    );

    run_cli(&args(&fixture, false)).unwrap();
    assert!(!fixture.trace_dir.exists());

    let mut importer = FsImporter::new(fixture.output_dir.clone());
    assert!(importer.import_table("copy").is_ok());
}

#[test]
fn compile_errors_exit_with_script_status_and_write_nothing() {
    let fixture = fixture(
        indoc! {"
            WITH input AS IMPORT 'input';
            EXPORT SELECT missing FROM input TO 'out';
        "},
        &[("input", &[("a", Array::Int64(vec![1]))])],
    );

    let code = run_cli(&args(&fixture, false)).unwrap_err();
    assert_eq!(code, EXIT_SCRIPT_ERROR);
    assert!(!fixture.output_dir.exists());
}

#[test]
fn parse_errors_exit_with_script_status() {
    let fixture = fixture("WITH input AS;", &[]);
    let code = run_cli(&args(&fixture, false)).unwrap_err();
    assert_eq!(code, EXIT_SCRIPT_ERROR);
}

#[test]
fn runtime_errors_exit_with_runtime_status_and_write_nothing() {
    let fixture = fixture(
        indoc! {"
            WITH input AS IMPORT 'input';
            EXPORT SELECT a / b AS q FROM input TO 'out';
        "},
        &[(
            "input",
            &[
                ("a", Array::Int64(vec![1])),
                ("b", Array::Int64(vec![0])),
            ],
        )],
    );

    let code = run_cli(&args(&fixture, false)).unwrap_err();
    assert_eq!(code, EXIT_RUNTIME_ERROR);
    assert!(!fixture.output_dir.exists());
}

#[test]
fn missing_script_file_is_a_runtime_failure() {
    let fixture = fixture("EXPORT x TO 'out';", &[]);
    let mut bad = args(&fixture, false);
    bad.script = Some(fixture.input_dir.join("does-not-exist.dtl"));
    let code = run_cli(&bad).unwrap_err();
    assert_eq!(code, EXIT_RUNTIME_ERROR);
}
