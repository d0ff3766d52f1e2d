//! Typed projection of raw record batches.
//!
//! A projection is a list of [`ColumnSpec`]s. Each one evaluates an expression
//! over the input batch, casts the result to its [`TargetType`] and names the
//! output column.

use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use rayon::prelude::*;

use crate::error::{Result, WarehouseError};

pub mod adapt;

pub use adapt::{DatePart, TargetType, convert_array};

/// Find a column by name, falling back to a case-insensitive match
pub fn resolve_column(schema: &Schema, name: &str) -> Result<usize> {
    if let Ok(idx) = schema.index_of(name) {
        return Ok(idx);
    }
    schema
        .fields()
        .iter()
        .position(|f| f.name().eq_ignore_ascii_case(name))
        .ok_or_else(|| WarehouseError::schema(format!("Column '{name}' not found")))
}

/// Column of `batch` looked up with [`resolve_column`]
pub fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    let idx = resolve_column(&batch.schema(), name)?;
    Ok(batch.column(idx))
}

/// Expression producing one projected column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnExpr {
    /// Source column as is
    Column(String),
    /// Source column with every space removed
    Stripped(String),
    /// Calendar part of a date column
    DatePart(String, DatePart),
}

impl ColumnExpr {
    /// Name of the input column the expression reads
    #[must_use]
    pub fn source(&self) -> &str {
        match self {
            Self::Column(name) | Self::Stripped(name) | Self::DatePart(name, _) => name,
        }
    }

    /// Evaluate against `batch`
    pub fn evaluate(&self, batch: &RecordBatch) -> Result<ArrayRef> {
        let input = column(batch, self.source())?;
        match self {
            Self::Column(_) => Ok(input.clone()),
            Self::Stripped(name) => {
                let strings = adapt::conversions::string_column(input)?.ok_or_else(|| {
                    WarehouseError::schema(format!("Column '{name}' is not a string column"))
                })?;
                Ok(Arc::new(adapt::strip_spaces(&strings)) as ArrayRef)
            }
            Self::DatePart(_, part) => {
                let dates = convert_array(input, TargetType::Date)?;
                adapt::date_part(&dates, *part)
            }
        }
    }
}

/// One output column of a typed projection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub expr: ColumnExpr,
    pub name: String,
    pub target: TargetType,
}

impl ColumnSpec {
    /// Cast `source` and name it `name`
    pub fn new(source: &str, name: &str, target: TargetType) -> Self {
        Self {
            expr: ColumnExpr::Column(source.to_string()),
            name: name.to_string(),
            target,
        }
    }

    /// Cast `name` keeping its name
    pub fn keep(name: &str, target: TargetType) -> Self {
        Self::new(name, name, target)
    }

    /// Remove spaces from `source` before casting
    pub fn stripped(source: &str, name: &str, target: TargetType) -> Self {
        Self {
            expr: ColumnExpr::Stripped(source.to_string()),
            name: name.to_string(),
            target,
        }
    }

    /// Extract `part` of the date in `source`
    pub fn date_part(source: &str, name: &str, part: DatePart) -> Self {
        Self {
            expr: ColumnExpr::DatePart(source.to_string(), part),
            name: name.to_string(),
            target: TargetType::Int,
        }
    }

    /// Output field; every projected column is nullable
    #[must_use]
    pub fn field(&self) -> Field {
        Field::new(&self.name, self.target.data_type(), true)
    }
}

/// Apply a typed projection to `batch`
///
/// Values that fail their cast become null.
pub fn project(batch: &RecordBatch, specs: &[ColumnSpec]) -> Result<RecordBatch> {
    let columns = specs
        .par_iter()
        .map(|spec| convert_array(&spec.expr.evaluate(batch)?, spec.target))
        .collect::<Result<Vec<_>>>()?;
    let schema = Arc::new(Schema::new(
        specs.iter().map(ColumnSpec::field).collect::<Vec<_>>(),
    ));
    Ok(RecordBatch::try_new(schema, columns)?)
}

/// Build a batch of string columns from `(name, values)` pairs
pub fn string_batch(columns: Vec<(&str, StringArray)>) -> Result<RecordBatch> {
    let fields = columns
        .iter()
        .map(|(name, _)| Field::new(*name, arrow::datatypes::DataType::Utf8, true))
        .collect::<Vec<_>>();
    let arrays = columns
        .into_iter()
        .map(|(_, values)| Arc::new(values) as ArrayRef)
        .collect();
    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}

/// Append `array` to `batch` as a nullable column named `name`
pub fn with_column(batch: &RecordBatch, name: &str, array: ArrayRef) -> Result<RecordBatch> {
    let schema = batch.schema();
    let mut fields = schema
        .fields()
        .iter()
        .map(|f| f.as_ref().clone())
        .collect::<Vec<_>>();
    fields.push(Field::new(name, array.data_type().clone(), true));
    let mut columns = batch.columns().to_vec();
    columns.push(array);
    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}
