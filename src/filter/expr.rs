//! Expression-based row predicates
//!
//! Comparisons follow SQL semantics: a null operand never matches, so both
//! `Eq` and `NotEq` drop rows where the column is null.

use arrow::array::{ArrayRef, BooleanArray, Float64Array, StringArray};
use arrow::compute::kernels::cmp::eq;
use arrow::compute::{and_kleene, is_not_null, not};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;

use crate::error::Result;
use crate::filter::core::BatchFilter;
use crate::schema::adapt::conversions::to_float64;
use crate::schema::column;

/// Represents a row predicate over named columns
#[derive(Debug, Clone)]
pub enum Expr {
    /// Column equals a literal value
    Eq(String, LiteralValue),

    /// Column not equals a literal value
    NotEq(String, LiteralValue),

    /// Column is not null
    IsNotNull(String),

    /// Logical AND of expressions
    And(Vec<Expr>),
}

/// Represents a literal value that can be used in filter expressions
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Floating point value
    Float(f64),

    /// String value
    String(String),
}

impl Expr {
    /// `column = value` for a string literal
    pub fn eq_str(column: &str, value: &str) -> Self {
        Self::Eq(column.to_string(), LiteralValue::String(value.to_string()))
    }

    /// `column <> value` for a string literal
    pub fn not_eq_str(column: &str, value: &str) -> Self {
        Self::NotEq(column.to_string(), LiteralValue::String(value.to_string()))
    }

    /// Every listed column is non-null
    pub fn all_not_null<S: AsRef<str>>(columns: &[S]) -> Self {
        Self::And(
            columns
                .iter()
                .map(|c| Self::IsNotNull(c.as_ref().to_string()))
                .collect(),
        )
    }

    /// Evaluate the predicate against a record batch
    pub fn evaluate(&self, batch: &RecordBatch) -> Result<BooleanArray> {
        match self {
            Self::IsNotNull(col_name) => Ok(is_not_null(column(batch, col_name)?.as_ref())?),
            Self::Eq(col_name, literal) => evaluate_eq(column(batch, col_name)?, literal),
            Self::NotEq(col_name, literal) => {
                let matches = evaluate_eq(column(batch, col_name)?, literal)?;
                Ok(not(&matches)?)
            }
            Self::And(exprs) => {
                let mut result = BooleanArray::from(vec![true; batch.num_rows()]);
                for expr in exprs {
                    let mask = expr.evaluate(batch)?;
                    result = and_kleene(&result, &mask)?;
                }
                Ok(result)
            }
        }
    }
}

fn evaluate_eq(column: &ArrayRef, literal: &LiteralValue) -> Result<BooleanArray> {
    match literal {
        LiteralValue::String(s) => {
            let strings = arrow::compute::cast(column, &DataType::Utf8)?;
            Ok(eq(&strings, &StringArray::new_scalar(s.as_str()))?)
        }
        LiteralValue::Float(v) => {
            let values = to_float64(column)?;
            Ok(eq(&values, &Float64Array::new_scalar(*v))?)
        }
    }
}

/// A filter that evaluates an expression against a record batch
#[derive(Debug, Clone)]
pub struct ExpressionFilter {
    expr: Expr,
}

impl ExpressionFilter {
    /// Create a new expression filter
    #[must_use]
    pub fn new(expr: Expr) -> Self {
        Self { expr }
    }
}

impl BatchFilter for ExpressionFilter {
    fn mask(&self, batch: &RecordBatch) -> Result<BooleanArray> {
        self.expr.evaluate(batch)
    }
}
