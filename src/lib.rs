//! Builds a small analytical warehouse of US tourism data.
//!
//! Four raw sources (city temperatures, city demographics, I94 arrival
//! records and the I94 label descriptions) are cleaned, typed, deduplicated
//! and written as Parquet fact and dimension tables.

pub mod config;
pub mod error;
pub mod filter;
pub mod labels;
pub mod pipeline;
pub mod schema;
pub mod table;
pub mod utils;

// Core types
pub use config::WarehouseConfig;
pub use error::{Result, WarehouseError};
pub use pipeline::{Pipeline, PipelineReport, Session, run_all};
pub use table::{Table, TableSpec};

// Label parsing
pub use labels::{LabelEntry, LabelSections, parse as parse_labels};

// Date normalization
pub use schema::adapt::{to_calendar_date, to_iso_date_string};

// Table IO
pub use utils::io::{read_table, write_table, write_tables};

// Arrow types
pub use arrow::record_batch::RecordBatch;
