//! Delimited text sources
//!
//! Every column is read as nullable `Utf8`; typing happens in the table
//! projection. Empty cells are read as null.

use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use arrow::compute::concat_batches;
use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;

use crate::error::{Result, WarehouseError};
use crate::utils::logging::{log_operation_complete, log_operation_start};

/// Rows sampled when reading the header
const HEADER_SAMPLE_ROWS: usize = 16;

fn string_schema(file: &mut File, delimiter: u8) -> std::result::Result<SchemaRef, String> {
    let (inferred, _) = Format::default()
        .with_header(true)
        .with_delimiter(delimiter)
        .infer_schema(&mut *file, Some(HEADER_SAMPLE_ROWS))
        .map_err(|e| format!("cannot read header: {e}"))?;
    file.seek(SeekFrom::Start(0))
        .map_err(|e| format!("cannot rewind: {e}"))?;

    let fields = inferred
        .fields()
        .iter()
        .map(|f| Field::new(f.name(), DataType::Utf8, true))
        .collect::<Vec<_>>();
    Ok(Arc::new(Schema::new(fields)))
}

/// Read a delimited file with a header row into a single record batch
pub fn read_delimited(path: &Path, delimiter: u8, batch_size: usize) -> Result<RecordBatch> {
    let start = std::time::Instant::now();
    log_operation_start("Reading delimited file", path);

    let mut file = File::open(path).map_err(|e| WarehouseError::source_read(path, e.to_string()))?;
    let schema =
        string_schema(&mut file, delimiter).map_err(|e| WarehouseError::source_read(path, e))?;

    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .with_delimiter(delimiter)
        .with_batch_size(batch_size)
        .build(file)
        .map_err(|e| WarehouseError::source_read(path, e.to_string()))?;

    let batches = reader
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| WarehouseError::source_read(path, e.to_string()))?;
    let batch = concat_batches(&schema, &batches)?;

    log_operation_complete("read", path, batch.num_rows(), Some(start.elapsed()));
    Ok(batch)
}
