//! Monthly average temperatures for US cities and for other countries.

use arrow::record_batch::RecordBatch;

use crate::config::WarehouseConfig;
use crate::error::Result;
use crate::filter::{BatchFilter, Expr, ExpressionFilter};
use crate::schema::{ColumnSpec, DatePart, TargetType, column, convert_array, with_column};
use crate::schema::adapt::date_part;
use crate::table::{Aggregate, Aggregation, Table, TableSpec};
use crate::utils::io::read_delimited;

pub const US_CITIES_TABLE: &str = "dim_temperatures_us_cities_table.parquet";
pub const COUNTRIES_TABLE: &str = "dim_temperatures_countries_table.parquet";

/// Country value separating the two tables
pub const UNITED_STATES: &str = "United States";

const ADMISSION_KEYS: [&str; 4] = ["dt", "AverageTemperature", "City", "Country"];

/// Readings are rounded to whole degrees before averaging
const READING_TYPE: TargetType = TargetType::Decimal(10, 0);

/// Add `year` and `month` columns derived from the `dt` date string
fn with_year_month(batch: &RecordBatch) -> Result<RecordBatch> {
    let dates = convert_array(column(batch, "dt")?, TargetType::Date)?;
    let batch = with_column(batch, "year", date_part(&dates, DatePart::Year)?)?;
    with_column(&batch, "month", date_part(&dates, DatePart::Month)?)
}

fn monthly_mean_spec(name: &str, key_source: &str, key: &str) -> TableSpec {
    let projection = vec![
        ColumnSpec::keep("year", TargetType::Int),
        ColumnSpec::keep("month", TargetType::Int),
        ColumnSpec::new(key_source, key, TargetType::Utf8),
        ColumnSpec::keep("average_temperature", TargetType::Decimal(4, 2)),
    ];
    let aggregation = Aggregation::group_by(&["year", "month", key_source])
        .aggregate(
            Aggregate::mean("AverageTemperature", "average_temperature").cast_input(READING_TYPE),
        );

    TableSpec::new(name, projection, &["year", "month", key])
        .drop_nulls_in(&ADMISSION_KEYS)
        .aggregate(aggregation)
        .require(&["average_temperature"])
        .sort_desc(&["year", "month", key])
        .partition_by(&["year", "month"])
}

/// Table of monthly means per US city
#[must_use]
pub fn us_cities_spec() -> TableSpec {
    monthly_mean_spec(US_CITIES_TABLE, "City", "city")
}

/// Table of monthly means per country outside the US
#[must_use]
pub fn countries_spec() -> TableSpec {
    monthly_mean_spec(COUNTRIES_TABLE, "Country", "country")
}

/// Build both temperature tables from the raw city records
pub fn build_tables(raw: &RecordBatch) -> Result<Vec<Table>> {
    let dated = with_year_month(raw)?;

    let us = ExpressionFilter::new(Expr::eq_str("Country", UNITED_STATES)).filter(&dated)?;
    let rest = ExpressionFilter::new(Expr::not_eq_str("Country", UNITED_STATES)).filter(&dated)?;

    Ok(vec![us_cities_spec().build(&us)?, countries_spec().build(&rest)?])
}

/// Read the temperature CSV and build its tables
pub fn build(config: &WarehouseConfig) -> Result<Vec<Table>> {
    let raw = read_delimited(&config.temperature_path(), b',', config.batch_size)?;
    build_tables(&raw)
}
