//! I94 arrivals of pleasure visitors and their arrival dates.

use arrow::record_batch::RecordBatch;

use crate::config::WarehouseConfig;
use crate::error::Result;
use crate::filter::{BatchFilter, Expr, ExpressionFilter, LiteralValue};
use crate::schema::adapt::sas_dates_to_date32;
use crate::schema::{ColumnSpec, DatePart, TargetType, column, with_column};
use crate::table::{Table, TableSpec};
use crate::utils::io::read_immigration_source;

pub const DATE_TABLE: &str = "dim_date_table.parquet";
pub const ARRIVALS_TABLE: &str = "fact_i94_us_visitor_arrivals_table.parquet";

/// `i94visa` category of pleasure visits
pub const PLEASURE_VISA: f64 = 2.0;

const ADMISSION_KEYS: [&str; 5] = ["cicid", "i94res", "i94port", "arrdate", "i94mode"];

/// Keep pleasure visits and add the `arrival_date` derived from `arrdate`
pub fn prepare(raw: &RecordBatch) -> Result<RecordBatch> {
    let filter = ExpressionFilter::new(Expr::Eq(
        "i94visa".to_string(),
        LiteralValue::Float(PLEASURE_VISA),
    ));
    let visits = filter.filter(raw)?;
    log::debug!(
        "Kept {} of {} arrivals with visa category {PLEASURE_VISA}",
        visits.num_rows(),
        raw.num_rows()
    );

    let arrival_dates = sas_dates_to_date32(column(&visits, "arrdate")?)?;
    with_column(&visits, "arrival_date", arrival_dates)
}

#[must_use]
pub fn date_spec() -> TableSpec {
    let projection = vec![
        ColumnSpec::keep("arrival_date", TargetType::Date),
        ColumnSpec::date_part("arrival_date", "day", DatePart::Day),
        ColumnSpec::date_part("arrival_date", "week", DatePart::Week),
        ColumnSpec::date_part("arrival_date", "month", DatePart::Month),
        ColumnSpec::date_part("arrival_date", "year", DatePart::Year),
        ColumnSpec::date_part("arrival_date", "quarter", DatePart::Quarter),
    ];
    TableSpec::new(DATE_TABLE, projection, &["arrival_date"])
        .drop_nulls_in(&ADMISSION_KEYS)
        .require(&["year", "month"])
        .sort_desc(&["arrival_date"])
        .partition_by(&["year", "month"])
}

#[must_use]
pub fn arrivals_spec() -> TableSpec {
    let projection = vec![
        ColumnSpec::keep("cicid", TargetType::Long),
        ColumnSpec::new("i94yr", "arrival_year", TargetType::Int),
        ColumnSpec::new("i94mon", "arrival_month", TargetType::Int),
        ColumnSpec::keep("arrival_date", TargetType::Date),
        ColumnSpec::new("i94port", "arrival_port_code", TargetType::Utf8),
        ColumnSpec::new("i94cit", "visitor_birth_country", TargetType::Int),
        ColumnSpec::new("i94res", "visitor_residence_country", TargetType::Int),
        ColumnSpec::new("i94bir", "visitor_age", TargetType::Int),
        ColumnSpec::new("gender", "visitor_gender", TargetType::Utf8),
        ColumnSpec::new("i94mode", "travel_mode_code", TargetType::Int),
        ColumnSpec::new("airline", "travel_airline", TargetType::Utf8),
        ColumnSpec::new("visatype", "travel_visa_type", TargetType::Utf8),
    ];
    TableSpec::new(ARRIVALS_TABLE, projection, &["cicid"])
        .drop_nulls_in(&ADMISSION_KEYS)
        .require(&[
            "arrival_year",
            "arrival_month",
            "arrival_date",
            "arrival_port_code",
            "visitor_residence_country",
            "travel_mode_code",
        ])
        .sort_desc(&["arrival_year", "arrival_month", "cicid"])
        .partition_by(&["arrival_year", "arrival_month"])
}

/// Build the date dimension and the arrivals fact table
pub fn build_tables(raw: &RecordBatch) -> Result<Vec<Table>> {
    let visits = prepare(raw)?;
    Ok(vec![date_spec().build(&visits)?, arrivals_spec().build(&visits)?])
}

/// Read the immigration records and build their tables
pub fn build(config: &WarehouseConfig) -> Result<Vec<Table>> {
    let raw = read_immigration_source(&config.immigration_path(), config.batch_size)?;
    build_tables(&raw)
}
