//! Row filtering for record batches
//!
//! Pipelines use two kinds of filters: source predicates (country or visa
//! category equality) and the null-drop gate that admits only rows with all
//! key columns present.

pub mod core;
pub mod expr;

use arrow::record_batch::RecordBatch;

use crate::error::Result;

pub use self::core::{BatchFilter, filter_record_batch};
pub use expr::{Expr, ExpressionFilter, LiteralValue};

/// Remove every row holding a null in any of `columns`
///
/// Rows are dropped silently; the number removed is logged at debug level.
pub fn drop_nulls<S: AsRef<str>>(batch: &RecordBatch, columns: &[S]) -> Result<RecordBatch> {
    if columns.is_empty() {
        return Ok(batch.clone());
    }

    let filtered = ExpressionFilter::new(Expr::all_not_null(columns)).filter(batch)?;
    let dropped = batch.num_rows() - filtered.num_rows();
    if dropped > 0 {
        log::debug!("Dropped {dropped} rows with missing key values");
    }
    Ok(filtered)
}
