//! Group-by aggregation and pivot over record batches.
//!
//! Groups are formed on Arrow's row format so any combination of key column
//! types works. Groups appear in the order their first row is seen.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, UInt32Array};
use arrow::compute::take;
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::row::{RowConverter, SortField};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Result, WarehouseError};
use crate::schema::adapt::conversions::{string_column, to_float64};
use crate::schema::{TargetType, column, convert_array, resolve_column};
use crate::table::row_index;

/// Aggregate function applied to one column per group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    /// Arithmetic mean of the non-null values, as `Float64`
    Mean,
    /// First non-null value in group order, keeping the input type
    First,
}

/// One aggregated output column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub column: String,
    pub function: AggregateFn,
    pub alias: String,
    /// Type each input value is cast to before aggregating
    pub input_type: Option<TargetType>,
}

impl Aggregate {
    pub fn mean(column: &str, alias: &str) -> Self {
        Self {
            column: column.to_string(),
            function: AggregateFn::Mean,
            alias: alias.to_string(),
            input_type: None,
        }
    }

    pub fn first(column: &str, alias: &str) -> Self {
        Self {
            column: column.to_string(),
            function: AggregateFn::First,
            alias: alias.to_string(),
            input_type: None,
        }
    }

    /// Cast the input to `target` first, so a `Decimal(10, 0)` input averages
    /// readings rounded half away from zero
    #[must_use]
    pub fn cast_input(mut self, target: TargetType) -> Self {
        self.input_type = Some(target);
        self
    }
}

/// What to do with a pivot value outside the expected categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownCategoryPolicy {
    /// Skip the row's value, logging each unknown category once
    #[default]
    Ignore,
    /// Abort the build with a schema error
    Fail,
}

/// Spread the first `value` of each group across one column per category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pivot {
    pub column: String,
    pub value: String,
    /// Expected category values; each becomes an output column of that name
    pub categories: Vec<String>,
    pub policy: UnknownCategoryPolicy,
}

impl Pivot {
    pub fn new(column: &str, value: &str, categories: &[&str]) -> Self {
        Self {
            column: column.to_string(),
            value: value.to_string(),
            categories: categories.iter().map(ToString::to_string).collect(),
            policy: UnknownCategoryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: UnknownCategoryPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Grouping rule of a table build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    pub group_keys: Vec<String>,
    pub aggregates: Vec<Aggregate>,
    pub pivot: Option<Pivot>,
}

impl Aggregation {
    pub fn group_by<S: AsRef<str>>(keys: &[S]) -> Self {
        Self {
            group_keys: keys.iter().map(|k| k.as_ref().to_string()).collect(),
            aggregates: Vec::new(),
            pivot: None,
        }
    }

    #[must_use]
    pub fn aggregate(mut self, aggregate: Aggregate) -> Self {
        self.aggregates.push(aggregate);
        self
    }

    #[must_use]
    pub fn pivot(mut self, pivot: Pivot) -> Self {
        self.pivot = Some(pivot);
        self
    }

    /// Apply the grouping to `batch`, producing one row per group
    pub fn apply(&self, batch: &RecordBatch) -> Result<RecordBatch> {
        let groups = Groups::new(batch, &self.group_keys)?;
        let schema = batch.schema();

        let mut fields = Vec::new();
        let mut columns = Vec::new();

        let first_rows = UInt32Array::from(groups.first_rows.clone());
        for key in &self.group_keys {
            let idx = resolve_column(&schema, key)?;
            fields.push(schema.field(idx).clone().with_nullable(true));
            columns.push(take(batch.column(idx).as_ref(), &first_rows, None)?);
        }

        for aggregate in &self.aggregates {
            let mut input = column(batch, &aggregate.column)?.clone();
            if let Some(target) = aggregate.input_type {
                input = convert_array(&input, target)?;
            }
            let output = match aggregate.function {
                AggregateFn::Mean => groups.mean(&input)?,
                AggregateFn::First => groups.first(&input, |_| true)?,
            };
            fields.push(Field::new(&aggregate.alias, output.data_type().clone(), true));
            columns.push(output);
        }

        if let Some(pivot) = &self.pivot {
            for (name, output) in groups.pivot(batch, pivot)? {
                fields.push(Field::new(name, output.data_type().clone(), true));
                columns.push(output);
            }
        }

        Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
    }
}

/// Assignment of every input row to a group
struct Groups {
    group_of: Vec<usize>,
    first_rows: Vec<u32>,
}

impl Groups {
    fn new<S: AsRef<str>>(batch: &RecordBatch, keys: &[S]) -> Result<Self> {
        let keys = keys
            .iter()
            .map(|k| column(batch, k.as_ref()).cloned())
            .collect::<Result<Vec<_>>>()?;
        let converter = RowConverter::new(
            keys.iter()
                .map(|k| SortField::new(k.data_type().clone()))
                .collect(),
        )?;
        let rows = converter.convert_columns(&keys)?;

        let mut index = FxHashMap::default();
        let mut group_of = Vec::with_capacity(batch.num_rows());
        let mut first_rows = Vec::new();
        for (row_idx, row) in rows.iter().enumerate() {
            let next = first_rows.len();
            let group = *index.entry(row).or_insert(next);
            if group == next {
                first_rows.push(row_index(row_idx)?);
            }
            group_of.push(group);
        }

        Ok(Self {
            group_of,
            first_rows,
        })
    }

    fn len(&self) -> usize {
        self.first_rows.len()
    }

    fn mean(&self, input: &ArrayRef) -> Result<ArrayRef> {
        let values = to_float64(input)?;
        let mut sums = vec![0.0_f64; self.len()];
        let mut counts = vec![0_usize; self.len()];
        for (row, group) in self.group_of.iter().enumerate() {
            if values.is_valid(row) {
                sums[*group] += values.value(row);
                counts[*group] += 1;
            }
        }
        let means: Float64Array = sums
            .into_iter()
            .zip(counts)
            .map(|(sum, count)| (count > 0).then(|| sum / count as f64))
            .collect();
        Ok(Arc::new(means))
    }

    /// First non-null value of `input` per group among rows accepted by `include`
    fn first(&self, input: &ArrayRef, include: impl Fn(usize) -> bool) -> Result<ArrayRef> {
        let mut picks: Vec<Option<u32>> = vec![None; self.len()];
        for (row, group) in self.group_of.iter().enumerate() {
            if picks[*group].is_none() && input.is_valid(row) && include(row) {
                picks[*group] = Some(row_index(row)?);
            }
        }
        Ok(take(input.as_ref(), &UInt32Array::from(picks), None)?)
    }

    fn pivot<'p>(&self, batch: &RecordBatch, pivot: &'p Pivot) -> Result<Vec<(&'p str, ArrayRef)>> {
        let categories = column(batch, &pivot.column)?;
        let categories = string_column(categories)?.ok_or_else(|| {
            WarehouseError::schema(format!("Pivot column '{}' is not a string column", pivot.column))
        })?;
        let values = column(batch, &pivot.value)?;

        let expected: FxHashMap<&str, usize> = pivot
            .categories
            .iter()
            .enumerate()
            .map(|(idx, c)| (c.as_str(), idx))
            .collect();

        let mut category_of = Vec::with_capacity(categories.len());
        let mut unknown = FxHashSet::default();
        for value in &categories {
            let category = value.and_then(|v| expected.get(v).copied());
            if let (None, Some(value)) = (category, value) {
                if pivot.policy == UnknownCategoryPolicy::Fail {
                    return Err(WarehouseError::schema(format!(
                        "Unexpected value '{value}' in pivot column '{}'",
                        pivot.column
                    )));
                }
                if unknown.insert(value) {
                    log::warn!(
                        "Ignoring unexpected value '{value}' in pivot column '{}'",
                        pivot.column
                    );
                }
            }
            category_of.push(category);
        }

        pivot
            .categories
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let output = self.first(values, |row| category_of[row] == Some(idx))?;
                Ok((name.as_str(), output))
            })
            .collect()
    }
}
