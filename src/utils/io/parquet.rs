//! Parquet file operations
//!
//! Reading of Parquet sources and persistence of built tables. Tables are
//! written as one directory per table; partitioned tables get one
//! `column=value` directory level per partition column. Every write replaces
//! what a previous run left at that path.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, Int32Array, UInt32Array};
use arrow::compute::{concat_batches, take_record_batch};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;
use itertools::Itertools;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use rayon::prelude::*;

use crate::error::{Result, WarehouseError};
use crate::schema::resolve_column;
use crate::table::{Table, row_index};
use crate::utils::logging::{log_operation_complete, log_operation_start, log_warning};

/// Directory name used for a null partition value
pub const NULL_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";

/// Marker written once a table directory is complete
pub const SUCCESS_MARKER: &str = "_SUCCESS";

/// Validates that a directory exists and is a directory
pub fn validate_directory(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        return Err(WarehouseError::source_read(dir, "Directory does not exist"));
    }
    Ok(())
}

/// Find all Parquet files below `dir`, recursing into partition directories
///
/// Paths are returned sorted so reads are deterministic.
pub fn find_parquet_files(dir: &Path) -> Result<Vec<PathBuf>> {
    validate_directory(dir)?;

    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "parquet") {
                files.push(path);
            }
        }
    }
    files.sort();

    if files.is_empty() {
        log_warning("No Parquet files found in directory", Some(dir));
    }
    Ok(files)
}

/// Read a parquet file into Arrow record batches
pub fn read_parquet(path: &Path) -> Result<Vec<RecordBatch>> {
    let file = File::open(path).map_err(|e| WarehouseError::source_read(path, e.to_string()))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .and_then(|builder| builder.build())
        .map_err(|e| WarehouseError::source_read(path, e.to_string()))?;

    reader
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| WarehouseError::source_read(path, e.to_string()))
}

/// Load a Parquet file, or every Parquet file below a directory, into one batch
///
/// Files are read in parallel and must share one schema.
pub fn load_parquet_source(path: &Path) -> Result<RecordBatch> {
    let start = std::time::Instant::now();
    log_operation_start("Reading parquet source", path);

    let files = if path.is_dir() {
        find_parquet_files(path)?
    } else {
        vec![path.to_path_buf()]
    };
    let batches = files
        .par_iter()
        .map(|file| read_parquet(file))
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .flatten()
        .collect_vec();

    let Some(first) = batches.first() else {
        return Err(WarehouseError::source_read(path, "No record batches found"));
    };
    let batch = concat_batches(&first.schema(), &batches)
        .map_err(|e| WarehouseError::source_read(path, e.to_string()))?;

    log_operation_complete("read", path, batch.num_rows(), Some(start.elapsed()));
    Ok(batch)
}

fn write_file(path: &Path, batch: &RecordBatch) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

fn partition_value(column: &ArrayRef, row: usize) -> Result<String> {
    if column.is_null(row) {
        Ok(NULL_PARTITION.to_string())
    } else {
        Ok(array_value_to_string(column, row)?)
    }
}

/// Split `batch` into one batch per distinct partition value combination
///
/// Partition columns are removed from the returned batches; the map key holds
/// their rendered values in `partition_by` order.
pub fn split_partitions(
    batch: &RecordBatch,
    partition_by: &[String],
) -> Result<BTreeMap<Vec<String>, RecordBatch>> {
    let schema = batch.schema();
    let partition_idx = partition_by
        .iter()
        .map(|name| resolve_column(&schema, name))
        .collect::<Result<Vec<_>>>()?;

    let mut rows: BTreeMap<Vec<String>, Vec<u32>> = BTreeMap::new();
    for row in 0..batch.num_rows() {
        let key = partition_idx
            .iter()
            .map(|&idx| partition_value(batch.column(idx), row))
            .collect::<Result<Vec<_>>>()?;
        rows.entry(key).or_default().push(row_index(row)?);
    }

    let keep = (0..schema.fields().len())
        .filter(|idx| !partition_idx.contains(idx))
        .collect_vec();

    rows.into_iter()
        .map(|(key, indices)| {
            let part = take_record_batch(batch, &UInt32Array::from(indices))?;
            Ok((key, part.project(&keep)?))
        })
        .collect()
}

/// Write the files of `table` into the empty directory `dir`
fn write_table_files(table: &Table, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;

    if table.partition_by.is_empty() {
        write_file(&dir.join("part-00000.parquet"), &table.batch)?;
    } else {
        let partitions = split_partitions(&table.batch, &table.partition_by)?;
        partitions.par_iter().try_for_each(|(values, batch)| {
            let mut path = dir.to_path_buf();
            for (column, value) in table.partition_by.iter().zip(values) {
                path.push(format!("{column}={value}"));
            }
            write_file(&path.join("part-00000.parquet"), batch)
        })?;
    }

    File::create(dir.join(SUCCESS_MARKER))?;
    Ok(())
}

fn remove_if_exists(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    Ok(())
}

/// Sibling directory a table is written to before it replaces `root/name`
fn staging_dir(root: &Path, name: &str) -> PathBuf {
    root.join(format!(".{name}.staging"))
}

/// Persist `tables` under `root`, replacing any previous output
///
/// Every table is first written to a staging directory. Previous output is
/// only replaced once all tables are staged, so a failed write leaves it
/// untouched. Returns each table directory with its row count.
pub fn write_tables(tables: &[Table], root: &Path) -> Result<Vec<(PathBuf, usize)>> {
    let start = std::time::Instant::now();
    fs::create_dir_all(root)?;

    let mut staged = Vec::with_capacity(tables.len());
    for table in tables {
        let staging = staging_dir(root, &table.name);
        log_operation_start("Writing table", &root.join(&table.name));
        let written = remove_if_exists(&staging).and_then(|()| write_table_files(table, &staging));
        staged.push(staging);
        if let Err(e) = written {
            for dir in &staged {
                if let Err(cleanup) = remove_if_exists(dir) {
                    log::warn!("Cannot remove staging directory {}: {cleanup}", dir.display());
                }
            }
            return Err(e);
        }
    }

    tables
        .iter()
        .zip(staged)
        .map(|(table, staging)| {
            let dir = root.join(&table.name);
            remove_if_exists(&dir)?;
            fs::rename(&staging, &dir)?;
            log_operation_complete("wrote", &dir, table.num_rows(), Some(start.elapsed()));
            Ok((dir, table.num_rows()))
        })
        .collect()
}

/// Persist one table under `root`, replacing any previous output
///
/// Returns the table directory.
pub fn write_table(table: &Table, root: &Path) -> Result<PathBuf> {
    let mut written = write_tables(std::slice::from_ref(table), root)?;
    written
        .pop()
        .map(|(dir, _)| dir)
        .ok_or_else(|| WarehouseError::schema(format!("Table '{}' was not written", table.name)))
}

/// Partition `column=value` pairs encoded in the path of `file` below `dir`
fn partition_values(dir: &Path, file: &Path) -> Vec<(String, String)> {
    file.strip_prefix(dir)
        .map(|relative| {
            relative
                .components()
                .filter_map(|c| match c {
                    Component::Normal(part) => part.to_str(),
                    _ => None,
                })
                .filter_map(|part| part.split_once('='))
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

/// Read a table directory written by [`write_table`]
///
/// Partition values are appended to each batch as nullable `Int32` columns,
/// one batch per data file.
pub fn read_table(dir: &Path) -> Result<Vec<RecordBatch>> {
    find_parquet_files(dir)?
        .iter()
        .map(|file| {
            let partitions = partition_values(dir, file);
            read_parquet(file)?
                .into_iter()
                .map(|batch| with_partition_columns(&batch, &partitions))
                .collect::<Result<Vec<_>>>()
        })
        .flatten_ok()
        .collect()
}

fn with_partition_columns(batch: &RecordBatch, partitions: &[(String, String)]) -> Result<RecordBatch> {
    if partitions.is_empty() {
        return Ok(batch.clone());
    }

    let schema = batch.schema();
    let mut fields = schema.fields().iter().map(|f| f.as_ref().clone()).collect_vec();
    let mut columns = batch.columns().to_vec();
    for (name, value) in partitions {
        let value = value.parse::<i32>().ok();
        fields.push(Field::new(name, DataType::Int32, true));
        columns.push(Arc::new(Int32Array::from(vec![value; batch.num_rows()])) as ArrayRef);
    }
    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}
