//! City demographics, one wide row per (state, city).

use arrow::record_batch::RecordBatch;

use crate::config::WarehouseConfig;
use crate::error::Result;
use crate::schema::{ColumnSpec, TargetType};
use crate::table::{Aggregation, Pivot, Table, TableSpec, UnknownCategoryPolicy};
use crate::utils::io::read_delimited;

pub const DEMOGRAPHICS_TABLE: &str = "dim_cities_demographic_table.parquet";

/// Columns shared by every race row of one city
pub const GROUP_COLUMNS: [&str; 10] = [
    "State",
    "City",
    "Median Age",
    "Male Population",
    "Female Population",
    "Total Population",
    "Number of Veterans",
    "Foreign-born",
    "Average Household Size",
    "State Code",
];

/// `Race` values and the column each one is stored in
pub const RACE_COLUMNS: [(&str, &str); 5] = [
    ("American Indian and Alaska Native", "american_indian_alaska_native"),
    ("Asian", "asian"),
    ("Black or African-American", "black_or_african_american"),
    ("Hispanic or Latino", "hispanic_or_latino"),
    ("White", "white"),
];

/// Demographics table recipe; admission requires every column in `source_columns`
#[must_use]
pub fn demographics_spec<S: AsRef<str>>(source_columns: &[S]) -> TableSpec {
    let races = RACE_COLUMNS.iter().map(|(race, _)| *race).collect::<Vec<_>>();
    let aggregation = Aggregation::group_by(&GROUP_COLUMNS)
        .pivot(Pivot::new("Race", "Count", &races).with_policy(UnknownCategoryPolicy::Ignore));

    let mut projection = vec![
        ColumnSpec::new("State", "state", TargetType::Utf8),
        ColumnSpec::new("State Code", "state_code", TargetType::Utf8),
        ColumnSpec::new("City", "city", TargetType::Utf8),
        ColumnSpec::new("Median Age", "median_age", TargetType::Decimal(4, 1)),
        ColumnSpec::new("Male Population", "male_population", TargetType::Int),
        ColumnSpec::new("Female Population", "female_population", TargetType::Int),
        ColumnSpec::new("Total Population", "total_population", TargetType::Int),
        ColumnSpec::new("Number of Veterans", "number_of_veterans", TargetType::Int),
        ColumnSpec::new("Foreign-born", "number_of_foreign_born", TargetType::Int),
        ColumnSpec::new(
            "Average Household Size",
            "average_household_size",
            TargetType::Decimal(4, 2),
        ),
    ];
    projection.extend(
        RACE_COLUMNS
            .iter()
            .map(|(race, name)| ColumnSpec::new(race, name, TargetType::Int)),
    );

    TableSpec::new(DEMOGRAPHICS_TABLE, projection, &["state", "city"])
        .drop_nulls_in(source_columns)
        .aggregate(aggregation)
}

/// Build the demographics table from the raw race-level rows
pub fn build_tables(raw: &RecordBatch) -> Result<Vec<Table>> {
    let schema = raw.schema();
    let columns = schema.fields().iter().map(|f| f.name().as_str()).collect::<Vec<_>>();
    Ok(vec![demographics_spec(&columns).build(raw)?])
}

/// Read the demographics CSV and build its table
pub fn build(config: &WarehouseConfig) -> Result<Vec<Table>> {
    let raw = read_delimited(&config.demographics_path(), b';', config.batch_size)?;
    build_tables(&raw)
}
