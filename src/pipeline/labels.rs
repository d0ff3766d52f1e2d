//! Country, port and travel mode dimensions from the label descriptions.

use arrow::array::StringArray;
use arrow::record_batch::RecordBatch;

use crate::config::WarehouseConfig;
use crate::error::{Result, WarehouseError};
use crate::labels::{
    COUNTRY_SECTION, LabelSections, PORT_SECTION, STATE_SECTION, TRAVEL_MODE_SECTION,
    entries_to_batch, parse,
};
use crate::schema::{ColumnSpec, TargetType, string_batch};
use crate::table::{Table, TableSpec, inner_join};

pub const COUNTRY_TABLE: &str = "dim_i94_country_table.parquet";
pub const PORT_TABLE: &str = "dim_i94_port_table.parquet";
pub const TRAVEL_MODE_TABLE: &str = "dim_i94_travel_mode_table.parquet";
/// Name of the state lookup, which is joined into ports and never persisted
pub const STATE_TABLE: &str = "dim_i94_state";

fn section_batch(sections: &LabelSections, name: &str) -> Result<RecordBatch> {
    entries_to_batch(sections.section(name)?)
}

#[must_use]
pub fn country_spec() -> TableSpec {
    let projection = vec![
        ColumnSpec::stripped("code", "country_code", TargetType::Int),
        ColumnSpec::new("label", "country", TargetType::Utf8),
    ];
    TableSpec::new(COUNTRY_TABLE, projection, &["country_code"])
}

#[must_use]
pub fn travel_mode_spec() -> TableSpec {
    let projection = vec![
        ColumnSpec::stripped("code", "travel_mode_code", TargetType::Int),
        ColumnSpec::new("label", "travel_mode", TargetType::Utf8),
    ];
    TableSpec::new(TRAVEL_MODE_TABLE, projection, &["travel_mode_code"])
}

#[must_use]
pub fn state_spec() -> TableSpec {
    let projection = vec![
        ColumnSpec::stripped("code", "state_code", TargetType::Utf8),
        ColumnSpec::new("label", "state", TargetType::Utf8),
    ];
    TableSpec::new(STATE_TABLE, projection, &["state_code"])
}

#[must_use]
pub fn port_spec() -> TableSpec {
    let projection = vec![
        ColumnSpec::keep("port_code", TargetType::Utf8),
        ColumnSpec::keep("city", TargetType::Utf8),
        ColumnSpec::keep("state_code", TargetType::Utf8),
        ColumnSpec::keep("state", TargetType::Utf8),
    ];
    TableSpec::new(PORT_TABLE, projection, &["port_code"])
}

/// City part of a port label such as `"ALCAN, AK"`
fn port_city(label: &str) -> Option<String> {
    let city = label.split(',').next().unwrap_or_default().trim();
    (!city.is_empty()).then(|| city.to_string())
}

/// Two letter state code of a port label such as `"ALCAN, AK"`
fn port_state_code(label: &str) -> Option<String> {
    let code = label
        .split(',')
        .nth(1)?
        .chars()
        .filter(|c| *c != ' ')
        .take(2)
        .collect::<String>();
    (!code.is_empty()).then_some(code)
}

/// Split port labels into `port_code`, `city` and `state_code` columns
pub fn split_port_labels(sections: &LabelSections) -> Result<RecordBatch> {
    let entries = sections.section(PORT_SECTION)?;
    let codes = entries.iter().map(|e| Some(e.code.as_str())).collect::<StringArray>();
    let cities = entries.iter().map(|e| port_city(&e.label)).collect::<StringArray>();
    let states = entries
        .iter()
        .map(|e| port_state_code(&e.label))
        .collect::<StringArray>();

    string_batch(vec![("port_code", codes), ("city", cities), ("state_code", states)])
}

/// Build every label dimension from parsed sections
///
/// The state lookup is only used to resolve port states and is not returned.
pub fn build_tables(sections: &LabelSections) -> Result<Vec<Table>> {
    let countries = country_spec().build(&section_batch(sections, COUNTRY_SECTION)?)?;
    let modes = travel_mode_spec().build(&section_batch(sections, TRAVEL_MODE_SECTION)?)?;
    let states = state_spec().build(&section_batch(sections, STATE_SECTION)?)?;

    let ports = inner_join(&split_port_labels(sections)?, &states.batch, "state_code")?;
    let ports = port_spec().build(&ports)?;

    Ok(vec![countries, ports, modes])
}

/// Parse the label descriptions file and build its tables
pub fn build(config: &WarehouseConfig) -> Result<Vec<Table>> {
    let path = config.labels_path();
    let bytes =
        std::fs::read(&path).map_err(|e| WarehouseError::source_read(&path, e.to_string()))?;
    // The published file is Latin-1 in places
    let text = String::from_utf8_lossy(&bytes);
    let sections = parse(&text);
    log::info!(
        "Parsed {} label sections from {}",
        sections.len(),
        path.display()
    );
    build_tables(&sections)
}
