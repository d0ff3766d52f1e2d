//! Key-based deduplication.

use arrow::array::UInt32Array;
use arrow::compute::take_record_batch;
use arrow::record_batch::RecordBatch;
use arrow::row::{RowConverter, Rows, SortField};
use rustc_hash::FxHashMap;

use crate::error::{Result, WarehouseError};
use crate::schema::column;
use crate::table::row_index;

fn rows_of(columns: &[arrow::array::ArrayRef]) -> Result<Rows> {
    let converter = RowConverter::new(
        columns
            .iter()
            .map(|c| SortField::new(c.data_type().clone()))
            .collect(),
    )?;
    Ok(converter.convert_columns(columns)?)
}

/// Keep exactly one row per distinct value of `keys`
///
/// Among rows sharing a key the survivor is the one whose complete row is
/// smallest in Arrow row order (nulls first), so the result does not depend
/// on input order. Survivors keep their relative input order.
pub fn dedup_by_key<S: AsRef<str>>(batch: &RecordBatch, keys: &[S]) -> Result<RecordBatch> {
    if keys.is_empty() {
        return Err(WarehouseError::schema("Deduplication needs at least one key"));
    }
    if batch.num_rows() == 0 {
        return Ok(batch.clone());
    }

    let key_columns = keys
        .iter()
        .map(|k| column(batch, k.as_ref()).cloned())
        .collect::<Result<Vec<_>>>()?;
    let key_rows = rows_of(&key_columns)?;
    let full_rows = rows_of(batch.columns())?;

    let mut survivors: FxHashMap<_, usize> = FxHashMap::default();
    for (idx, key) in key_rows.iter().enumerate() {
        survivors
            .entry(key)
            .and_modify(|best| {
                if full_rows.row(idx) < full_rows.row(*best) {
                    *best = idx;
                }
            })
            .or_insert(idx);
    }

    let mut indices = survivors.into_values().collect::<Vec<_>>();
    indices.sort_unstable();
    let indices = indices.into_iter().map(row_index).collect::<Result<Vec<_>>>()?;

    let deduplicated = take_record_batch(batch, &UInt32Array::from(indices))?;
    let removed = batch.num_rows() - deduplicated.num_rows();
    if removed > 0 {
        log::debug!("Removed {removed} duplicate rows");
    }
    Ok(deduplicated)
}
