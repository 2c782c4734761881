//! Filesystem importer, exporter, and tracer over Parquet.
//!
//! Tables live at `<dir>/<name>.parquet`. The exporter buffers everything
//! in memory and writes only when `flush` is called after a successful run,
//! so a failing script leaves the output directory untouched. The tracer
//! persists each traced array as a single-column ("values") Parquet file
//! under `arrays/`, next to `manifest.json`.

use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use arrow::array::{
    Array as _, ArrayRef, BinaryArray, BooleanArray, Date32Array, Float64Array, Int32Array,
    Int64Array, StringArray, TimestampMicrosecondArray, UInt64Array,
};
use arrow::datatypes::{DataType, Field, Schema as ArrowSchema, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use uuid::Uuid;

use dtl_core::{Array, DType, Table};
use dtl_ir::manifest::Manifest;
use dtl_ir::{Exporter, Importer, RuntimeError, Tracer};

fn storage(message: impl std::fmt::Display) -> RuntimeError {
    RuntimeError::Storage {
        message: message.to_string(),
    }
}

/// Reads `<root>/<location>.parquet`, at most once per location.
pub struct FsImporter {
    root: PathBuf,
    cache: HashMap<String, Arc<Table>>,
}

impl FsImporter {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            cache: HashMap::new(),
        }
    }

    fn load(&mut self, location: &str) -> Result<Arc<Table>, RuntimeError> {
        if let Some(table) = self.cache.get(location) {
            return Ok(Arc::clone(table));
        }

        let path = self.root.join(format!("{location}.parquet"));
        if !path.exists() {
            return Err(RuntimeError::UnknownTable {
                location: location.to_owned(),
            });
        }

        let file = File::open(path)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(storage)?;
        let schema = Arc::clone(builder.schema());
        let reader = builder.build().map_err(storage)?;

        let mut batches = Vec::new();
        for batch in reader {
            batches.push(batch.map_err(storage)?);
        }
        let batch = arrow::compute::concat_batches(&schema, &batches).map_err(storage)?;

        let mut columns = Vec::with_capacity(batch.num_columns());
        for (field, column) in schema.fields().iter().zip(batch.columns()) {
            let array = array_from_arrow(location, field.name(), column)?;
            columns.push((field.name().clone(), Arc::new(array)));
        }

        let table = Arc::new(Table::new(columns));
        self.cache.insert(location.to_owned(), Arc::clone(&table));
        Ok(table)
    }
}

impl Importer for FsImporter {
    fn import_schema(&mut self, location: &str) -> Result<dtl_core::Schema, RuntimeError> {
        Ok(self.load(location)?.schema())
    }

    fn import_table(&mut self, location: &str) -> Result<Arc<Table>, RuntimeError> {
        self.load(location)
    }
}

/// Buffers exported tables; `flush` writes them all out.
pub struct FsExporter {
    root: PathBuf,
    tables: Vec<(String, Table)>,
}

impl FsExporter {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            tables: Vec::new(),
        }
    }

    /// Write every buffered table. Call once, after the pipeline succeeds.
    pub fn flush(&self) -> Result<(), RuntimeError> {
        std::fs::create_dir_all(&self.root)?;
        for (name, table) in &self.tables {
            let path = self.root.join(format!("{name}.parquet"));
            write_table(&path, table)?;
        }
        Ok(())
    }
}

impl Exporter for FsExporter {
    fn export_table(&mut self, name: &str, table: Table) -> Result<(), RuntimeError> {
        if self.tables.iter().any(|(existing, _)| existing == name) {
            return Err(RuntimeError::DuplicateExport {
                name: name.to_owned(),
            });
        }
        self.tables.push((name.to_owned(), table));
        Ok(())
    }
}

/// Writes traced arrays under `<root>/arrays/` and the manifest to
/// `<root>/manifest.json`.
pub struct FsTracer {
    root: PathBuf,
}

impl FsTracer {
    pub fn new(root: PathBuf) -> Result<Self, RuntimeError> {
        std::fs::create_dir_all(root.join("arrays"))?;
        Ok(Self { root })
    }
}

impl Tracer for FsTracer {
    fn trace_array(&mut self, id: Uuid, array: &Array) -> Result<(), RuntimeError> {
        let path = self.root.join("arrays").join(format!("{id}.parquet"));
        let table = Table::new([("values".to_owned(), Arc::new(array.clone()))]);
        write_table(&path, &table)
    }

    fn trace_manifest(&mut self, manifest: &Manifest) -> Result<(), RuntimeError> {
        let json = serde_json::to_vec_pretty(manifest).map_err(storage)?;
        std::fs::write(self.root.join("manifest.json"), json)?;
        Ok(())
    }
}

fn write_table(path: &std::path::Path, table: &Table) -> Result<(), RuntimeError> {
    let mut fields = Vec::with_capacity(table.num_columns());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.num_columns());
    for (name, array) in table.columns() {
        fields.push(Field::new(name, dtype_to_arrow(array.dtype()), false));
        arrays.push(arrow_from_array(array));
    }
    let schema = Arc::new(ArrowSchema::new(fields));
    let batch = RecordBatch::try_new(Arc::clone(&schema), arrays).map_err(storage)?;

    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None).map_err(storage)?;
    writer.write(&batch).map_err(storage)?;
    writer.close().map_err(storage)?;
    Ok(())
}

fn dtype_to_arrow(dtype: DType) -> DataType {
    match dtype {
        DType::Bool => DataType::Boolean,
        DType::Int32 => DataType::Int32,
        DType::Int64 => DataType::Int64,
        DType::Double => DataType::Float64,
        DType::Text => DataType::Utf8,
        DType::Bytes => DataType::Binary,
        DType::Index => DataType::UInt64,
        DType::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, None),
        DType::Date => DataType::Date32,
    }
}

fn arrow_from_array(array: &Array) -> ArrayRef {
    match array {
        Array::Bool(values) => Arc::new(BooleanArray::from(values.clone())),
        Array::Int32(values) => Arc::new(Int32Array::from(values.clone())),
        Array::Int64(values) => Arc::new(Int64Array::from(values.clone())),
        Array::Double(values) => Arc::new(Float64Array::from(values.clone())),
        Array::Text(values) => Arc::new(StringArray::from_iter_values(values)),
        Array::Bytes(values) => Arc::new(BinaryArray::from_iter_values(values)),
        Array::Index(values) => Arc::new(UInt64Array::from(values.clone())),
        Array::Timestamp(values) => Arc::new(TimestampMicrosecondArray::from(values.clone())),
        Array::Date(values) => Arc::new(Date32Array::from(values.clone())),
    }
}

fn array_from_arrow(
    location: &str,
    name: &str,
    column: &ArrayRef,
) -> Result<Array, RuntimeError> {
    if column.null_count() > 0 {
        return Err(RuntimeError::NullColumn {
            location: location.to_owned(),
            name: name.to_owned(),
        });
    }

    macro_rules! downcast {
        ($arrow:ty) => {
            column
                .as_any()
                .downcast_ref::<$arrow>()
                .expect("dtype matched but downcast failed")
        };
    }

    let array = match column.data_type() {
        DataType::Boolean => {
            let values = downcast!(BooleanArray);
            Array::Bool((0..values.len()).map(|i| values.value(i)).collect())
        }
        DataType::Int32 => Array::Int32(downcast!(Int32Array).values().to_vec()),
        DataType::Int64 => Array::Int64(downcast!(Int64Array).values().to_vec()),
        DataType::Float64 => Array::Double(downcast!(Float64Array).values().to_vec()),
        DataType::Utf8 => {
            let values = downcast!(StringArray);
            Array::Text((0..values.len()).map(|i| values.value(i).to_owned()).collect())
        }
        DataType::Binary => {
            let values = downcast!(BinaryArray);
            Array::Bytes((0..values.len()).map(|i| values.value(i).to_vec()).collect())
        }
        DataType::UInt64 => Array::Index(downcast!(UInt64Array).values().to_vec()),
        DataType::Timestamp(TimeUnit::Microsecond, None) => {
            Array::Timestamp(downcast!(TimestampMicrosecondArray).values().to_vec())
        }
        DataType::Date32 => Array::Date(downcast!(Date32Array).values().to_vec()),
        other => {
            return Err(storage(format!(
                "input table '{location}' column '{name}' has unsupported type {other}",
            )));
        }
    };
    Ok(array)
}
