//! Typed table construction.
//!
//! Every warehouse table is produced by the same sequence of whole-batch
//! transformations described by a [`TableSpec`]:
//!
//! 1. drop rows with a null in any admission key,
//! 2. optionally aggregate (and pivot) per group,
//! 3. cast and rename through the typed projection,
//! 4. drop rows whose dedup keys or required columns became null,
//! 5. optionally sort (descending, cosmetic),
//! 6. keep one row per dedup key.

pub mod aggregate;
pub mod dedup;
pub mod join;

use std::time::Instant;

use arrow::compute::{SortColumn, SortOptions, lexsort_to_indices, take_record_batch};
use arrow::record_batch::RecordBatch;
use itertools::Itertools;

use crate::error::{Result, WarehouseError};
use crate::filter::drop_nulls;
use crate::schema::{ColumnSpec, column, project};

pub use aggregate::{Aggregate, AggregateFn, Aggregation, Pivot, UnknownCategoryPolicy};
pub use dedup::dedup_by_key;
pub use join::inner_join;

/// A built table ready for persistence
#[derive(Debug, Clone)]
pub struct Table {
    /// Output directory name under the warehouse root
    pub name: String,
    pub batch: RecordBatch,
    /// Columns laid out as `column=value` directories
    pub partition_by: Vec<String>,
}

impl Table {
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }
}

/// Recipe for one table
#[derive(Debug, Clone)]
pub struct TableSpec {
    pub name: String,
    /// Input columns that must be non-null for a row to be admitted
    pub null_drop_keys: Vec<String>,
    pub aggregation: Option<Aggregation>,
    pub projection: Vec<ColumnSpec>,
    /// Output columns, besides the dedup keys, that must be non-null after casting
    pub required: Vec<String>,
    pub sort_keys: Vec<String>,
    pub dedup_keys: Vec<String>,
    pub partition_by: Vec<String>,
}

/// Checked conversion of a row position to an Arrow `take` index
pub fn row_index(idx: usize) -> Result<u32> {
    u32::try_from(idx)
        .map_err(|_| WarehouseError::schema(format!("Row index {idx} exceeds u32 range")))
}

fn owned<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    names.iter().map(|n| n.as_ref().to_string()).collect()
}

impl TableSpec {
    pub fn new<S: AsRef<str>>(name: &str, projection: Vec<ColumnSpec>, dedup_keys: &[S]) -> Self {
        Self {
            name: name.to_string(),
            null_drop_keys: Vec::new(),
            aggregation: None,
            projection,
            required: Vec::new(),
            sort_keys: Vec::new(),
            dedup_keys: owned(dedup_keys),
            partition_by: Vec::new(),
        }
    }

    #[must_use]
    pub fn drop_nulls_in<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.null_drop_keys = owned(columns);
        self
    }

    #[must_use]
    pub fn aggregate(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = Some(aggregation);
        self
    }

    #[must_use]
    pub fn require<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.required = owned(columns);
        self
    }

    #[must_use]
    pub fn sort_desc<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.sort_keys = owned(columns);
        self
    }

    #[must_use]
    pub fn partition_by<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.partition_by = owned(columns);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.dedup_keys.is_empty() {
            return Err(WarehouseError::schema(format!(
                "Table '{}' has no dedup keys",
                self.name
            )));
        }
        let outputs = self.projection.iter().map(|c| c.name.as_str()).collect_vec();
        let missing = self
            .dedup_keys
            .iter()
            .chain(&self.required)
            .chain(&self.sort_keys)
            .chain(&self.partition_by)
            .filter(|c| !outputs.contains(&c.as_str()))
            .collect_vec();
        if !missing.is_empty() {
            return Err(WarehouseError::schema(format!(
                "Table '{}' refers to columns missing from its projection: {}",
                self.name,
                missing.iter().join(", ")
            )));
        }
        Ok(())
    }

    /// Run the spec over `batch`
    pub fn build(&self, batch: &RecordBatch) -> Result<Table> {
        self.validate()?;
        let start = Instant::now();
        let input_rows = batch.num_rows();

        let admitted = drop_nulls(batch, &self.null_drop_keys)?;
        let grouped = match &self.aggregation {
            Some(aggregation) => aggregation.apply(&admitted)?,
            None => admitted,
        };
        let projected = project(&grouped, &self.projection)?;

        let required = self
            .dedup_keys
            .iter()
            .chain(&self.required)
            .unique()
            .collect_vec();
        let complete = drop_nulls(&projected, &required)?;
        let sorted = sort_descending(&complete, &self.sort_keys)?;
        let batch = dedup_by_key(&sorted, &self.dedup_keys)?;

        log::info!(
            "Built {} with {} rows from {} input rows in {:?}",
            self.name,
            batch.num_rows(),
            input_rows,
            start.elapsed()
        );

        Ok(Table {
            name: self.name.clone(),
            batch,
            partition_by: self.partition_by.clone(),
        })
    }
}

/// Sort `batch` descending by `keys`, nulls last
pub fn sort_descending<S: AsRef<str>>(batch: &RecordBatch, keys: &[S]) -> Result<RecordBatch> {
    if keys.is_empty() || batch.num_rows() == 0 {
        return Ok(batch.clone());
    }
    let options = SortOptions {
        descending: true,
        nulls_first: false,
    };
    let columns = keys
        .iter()
        .map(|k| {
            Ok(SortColumn {
                values: column(batch, k.as_ref())?.clone(),
                options: Some(options),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let indices = lexsort_to_indices(&columns, None)?;
    Ok(take_record_batch(batch, &indices)?)
}
