//! Module for casting raw columns into typed warehouse columns.

pub mod conversions;
pub mod date_utils;
pub mod types;

// Re-export the main types and functions for easier access
pub use conversions::{convert_array, create_null_array, parse_integer, strip_spaces, trim_strings};
pub use date_utils::{
    DatePart, date_part, sas_dates_to_date32, to_calendar_date, to_iso_date_string,
};
pub use types::TargetType;
