//! Core filtering functionality for record batches
//!
//! This module defines the [`BatchFilter`] trait and the mask application used
//! by every row filter in the pipelines.

use arrow::array::BooleanArray;
use arrow::compute::filter_record_batch as arrow_filter_batch;
use arrow::record_batch::RecordBatch;

use crate::error::{Result, WarehouseError};

/// Filter a record batch based on a boolean mask
///
/// Rows whose mask value is false or null are removed.
pub fn filter_record_batch(batch: &RecordBatch, mask: &BooleanArray) -> Result<RecordBatch> {
    if batch.num_rows() != mask.len() {
        return Err(WarehouseError::schema(format!(
            "Mask length ({}) doesn't match batch row count ({})",
            mask.len(),
            batch.num_rows()
        )));
    }

    Ok(arrow_filter_batch(batch, mask)?)
}

/// Trait for objects that can filter record batches
pub trait BatchFilter: std::fmt::Debug + Send + Sync {
    /// Boolean mask of the rows to keep
    fn mask(&self, batch: &RecordBatch) -> Result<BooleanArray>;

    /// Filter a record batch
    fn filter(&self, batch: &RecordBatch) -> Result<RecordBatch> {
        let mask = self.mask(batch)?;
        filter_record_batch(batch, &mask)
    }
}
