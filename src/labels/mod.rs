//! Parsing of the I94 SAS label descriptions file.
//!
//! The file is a SAS `proc format` script. Each `value <name>` block lists
//! `code = 'label'` pairs for one coded column of the immigration data.

pub mod lexer;
pub mod parser;

use std::sync::Arc;

use arrow::datatypes::{DataType, Field, FieldRef};
use arrow::record_batch::RecordBatch;

use crate::error::{Result, WarehouseError};

pub use lexer::{Lexer, Token};
pub use parser::{LabelEntry, LabelSections, SECTION_MARKER, parse};

/// Section holding country codes used by `i94cit` and `i94res`
pub const COUNTRY_SECTION: &str = "i94cntyl";
/// Section holding port of entry codes
pub const PORT_SECTION: &str = "i94prtl";
/// Section holding arrival mode codes
pub const TRAVEL_MODE_SECTION: &str = "i94model";
/// Section holding US state codes
pub const STATE_SECTION: &str = "i94addrl";

/// Arrow fields of a [`LabelEntry`] batch
#[must_use]
pub fn entry_fields() -> Vec<FieldRef> {
    vec![
        Arc::new(Field::new("code", DataType::Utf8, false)),
        Arc::new(Field::new("label", DataType::Utf8, false)),
    ]
}

/// Convert section entries to a `code`/`label` record batch
pub fn entries_to_batch(entries: &[LabelEntry]) -> Result<RecordBatch> {
    serde_arrow::to_record_batch(&entry_fields(), &entries)
        .map_err(|e| WarehouseError::schema(format!("Cannot convert label entries: {e}")))
}
