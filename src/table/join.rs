//! Equi-join of two record batches on a shared key column.

use std::sync::Arc;

use arrow::array::{Array, UInt32Array};
use arrow::compute::take;
use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use arrow::row::{RowConverter, SortField};
use rustc_hash::FxHashMap;

use crate::error::{Result, WarehouseError};
use crate::schema::resolve_column;
use crate::table::row_index;

/// Inner join `left` and `right` on the column `key` present in both
///
/// The output holds the key once, then the remaining left columns, then the
/// remaining right columns. Null keys never match. Output rows follow left
/// order, and for each left row the matching right rows in right order.
pub fn inner_join(left: &RecordBatch, right: &RecordBatch, key: &str) -> Result<RecordBatch> {
    let left_schema = left.schema();
    let right_schema = right.schema();
    let left_key = resolve_column(&left_schema, key)?;
    let right_key = resolve_column(&right_schema, key)?;

    let left_type = left_schema.field(left_key).data_type();
    let right_type = right_schema.field(right_key).data_type();
    if left_type != right_type {
        return Err(WarehouseError::schema(format!(
            "Join key '{key}' has type {left_type} on the left and {right_type} on the right"
        )));
    }

    let converter = RowConverter::new(vec![SortField::new(left_type.clone())])?;
    let left_rows = converter.convert_columns(&[left.column(left_key).clone()])?;
    let right_rows = converter.convert_columns(&[right.column(right_key).clone()])?;

    let right_nulls = right.column(right_key);
    let mut lookup: FxHashMap<_, Vec<u32>> = FxHashMap::default();
    for (idx, row) in right_rows.iter().enumerate() {
        if right_nulls.is_valid(idx) {
            lookup.entry(row).or_default().push(row_index(idx)?);
        }
    }

    let left_nulls = left.column(left_key);
    let mut left_indices = Vec::new();
    let mut right_indices = Vec::new();
    for (idx, row) in left_rows.iter().enumerate() {
        if !left_nulls.is_valid(idx) {
            continue;
        }
        if let Some(matches) = lookup.get(&row) {
            let left_idx = row_index(idx)?;
            for &matched in matches {
                left_indices.push(left_idx);
                right_indices.push(matched);
            }
        }
    }
    let left_indices = UInt32Array::from(left_indices);
    let right_indices = UInt32Array::from(right_indices);

    let mut fields = vec![left_schema.field(left_key).clone()];
    let mut columns = vec![take(left.column(left_key).as_ref(), &left_indices, None)?];
    for (idx, field) in left_schema.fields().iter().enumerate() {
        if idx != left_key {
            fields.push(field.as_ref().clone());
            columns.push(take(left.column(idx).as_ref(), &left_indices, None)?);
        }
    }
    for (idx, field) in right_schema.fields().iter().enumerate() {
        if idx != right_key {
            fields.push(field.as_ref().clone());
            columns.push(take(right.column(idx).as_ref(), &right_indices, None)?);
        }
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}
