use std::fs::File;
use std::sync::Arc;

use arrow::array::Int64Array;
use arrow::datatypes::{DataType, Field, Schema as ArrowSchema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use tempfile::TempDir;
use uuid::Uuid;

use dtl_core::{Array, DType, Table};
use dtl_ir::manifest::Manifest;
use dtl_ir::{Exporter, Importer, RuntimeError, Tracer};

use crate::io::{FsExporter, FsImporter, FsTracer};

fn all_dtypes_table() -> Table {
    Table::new([
        ("flag".to_owned(), Arc::new(Array::Bool(vec![true, false]))),
        ("small".to_owned(), Arc::new(Array::Int32(vec![1, -2]))),
        ("big".to_owned(), Arc::new(Array::Int64(vec![3, -4]))),
        ("real".to_owned(), Arc::new(Array::Double(vec![0.5, -1.5]))),
        (
            "text".to_owned(),
            Arc::new(Array::Text(vec!["x".into(), "y".into()])),
        ),
        (
            "raw".to_owned(),
            Arc::new(Array::Bytes(vec![vec![1, 2], vec![]])),
        ),
        ("pos".to_owned(), Arc::new(Array::Index(vec![0, 9]))),
        (
            "at".to_owned(),
            Arc::new(Array::Timestamp(vec![1_600_000_000_000_000, 0])),
        ),
        ("day".to_owned(), Arc::new(Array::Date(vec![19_000, 0]))),
    ])
}

#[test]
fn export_then_import_round_trips_every_dtype() {
    let dir = TempDir::new().unwrap();
    let table = all_dtypes_table();

    let mut exporter = FsExporter::new(dir.path().to_path_buf());
    exporter.export_table("everything", table.clone()).unwrap();
    exporter.flush().unwrap();

    let mut importer = FsImporter::new(dir.path().to_path_buf());
    let loaded = importer.import_table("everything").unwrap();
    assert_eq!(*loaded, table);

    let schema = importer.import_schema("everything").unwrap();
    assert_eq!(schema.field("big").unwrap().dtype, DType::Int64);
    assert_eq!(schema.field("at").unwrap().dtype, DType::Timestamp);
}

#[test]
fn importer_caches_by_location() {
    let dir = TempDir::new().unwrap();
    let mut exporter = FsExporter::new(dir.path().to_path_buf());
    exporter
        .export_table(
            "t",
            Table::new([("a".to_owned(), Arc::new(Array::Int64(vec![1])))]),
        )
        .unwrap();
    exporter.flush().unwrap();

    let mut importer = FsImporter::new(dir.path().to_path_buf());
    let first = importer.import_table("t").unwrap();
    let second = importer.import_table("t").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn missing_table_is_unknown() {
    let dir = TempDir::new().unwrap();
    let mut importer = FsImporter::new(dir.path().to_path_buf());
    let err = importer.import_table("nope").unwrap_err();
    assert!(matches!(err, RuntimeError::UnknownTable { .. }));
}

#[test]
fn null_columns_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("holes.parquet");

    let schema = Arc::new(ArrowSchema::new(vec![Field::new(
        "a",
        DataType::Int64,
        true,
    )]));
    let batch = RecordBatch::try_new(
        Arc::clone(&schema),
        vec![Arc::new(Int64Array::from(vec![Some(1), None]))],
    )
    .unwrap();
    let mut writer = ArrowWriter::try_new(File::create(&path).unwrap(), schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let mut importer = FsImporter::new(dir.path().to_path_buf());
    let err = importer.import_table("holes").unwrap_err();
    assert!(matches!(err, RuntimeError::NullColumn { .. }));
}

#[test]
fn exporter_buffers_until_flush() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out");

    let mut exporter = FsExporter::new(out.clone());
    exporter
        .export_table(
            "result",
            Table::new([("a".to_owned(), Arc::new(Array::Int64(vec![1])))]),
        )
        .unwrap();

    // Nothing on disk before the flush.
    assert!(!out.exists());

    exporter.flush().unwrap();
    assert!(out.join("result.parquet").exists());
}

#[test]
fn exporter_rejects_duplicate_names() {
    let dir = TempDir::new().unwrap();
    let mut exporter = FsExporter::new(dir.path().to_path_buf());
    let table = Table::new([("a".to_owned(), Arc::new(Array::Int64(vec![1])))]);
    exporter.export_table("twice", table.clone()).unwrap();
    let err = exporter.export_table("twice", table).unwrap_err();
    assert!(matches!(err, RuntimeError::DuplicateExport { .. }));
}

#[test]
fn tracer_writes_arrays_and_manifest() {
    let dir = TempDir::new().unwrap();
    let mut tracer = FsTracer::new(dir.path().to_path_buf()).unwrap();

    let id = Uuid::new_v4();
    tracer
        .trace_array(id, &Array::Index(vec![0, 2, 4]))
        .unwrap();
    tracer
        .trace_manifest(&Manifest {
            source: "EXPORT t TO 'out';".to_owned(),
            snapshots: vec![],
            mappings: vec![],
        })
        .unwrap();

    // The array comes back as a single-column "values" table.
    let mut importer = FsImporter::new(dir.path().join("arrays"));
    let table = importer.import_table(&id.to_string()).unwrap();
    assert_eq!(
        **table.column("values").unwrap(),
        Array::Index(vec![0, 2, 4])
    );

    let manifest: serde_json::Value =
        serde_json::from_slice(&std::fs::read(dir.path().join("manifest.json")).unwrap()).unwrap();
    assert_eq!(manifest["source"], "EXPORT t TO 'out';");
    assert!(manifest["snapshots"].is_array());
    assert!(manifest["mappings"].is_array());
}
