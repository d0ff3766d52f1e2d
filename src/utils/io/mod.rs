//! Source readers and the table sink

pub mod csv;
pub mod parquet;

use std::path::Path;

use arrow::record_batch::RecordBatch;

use crate::error::{Result, WarehouseError};

pub use csv::read_delimited;
pub use parquet::{
    find_parquet_files, load_parquet_source, read_parquet, read_table, split_partitions,
    validate_directory, write_table, write_tables, NULL_PARTITION, SUCCESS_MARKER,
};

/// Read the immigration source, dispatching on its layout
///
/// A directory or `.parquet` file is read as Parquet and a `.csv` file as
/// comma-delimited text. SAS binary exports must be converted first.
pub fn read_immigration_source(path: &Path, batch_size: usize) -> Result<RecordBatch> {
    if path.is_dir() {
        return load_parquet_source(path);
    }
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("parquet") => load_parquet_source(path),
        Some("csv") => read_delimited(path, b',', batch_size),
        Some("sas7bdat") => Err(WarehouseError::source_read(
            path,
            "SAS binary files are not supported; convert to Parquet or CSV",
        )),
        _ => Err(WarehouseError::source_read(
            path,
            "Unrecognised immigration source format",
        )),
    }
}
