//! Module for handling SAS dates and calendar parts.
//!
//! SAS stores dates as a number of days since 1960-01-01. Arrow's `Date32`
//! counts days since 1970-01-01.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Date32Array, Int32Array};
use chrono::{Datelike, NaiveDate, TimeDelta};

use crate::error::{Result, WarehouseError};
use crate::schema::adapt::conversions::to_float64;

/// Day zero of SAS date values
pub const SAS_EPOCH: NaiveDate = match NaiveDate::from_ymd_opt(1960, 1, 1) {
    Some(date) => date,
    None => panic!("invalid SAS epoch"),
};

/// Day zero of Arrow `Date32` values
pub const UNIX_EPOCH: NaiveDate = match NaiveDate::from_ymd_opt(1970, 1, 1) {
    Some(date) => date,
    None => panic!("invalid Unix epoch"),
};

/// Calendar date `epoch_offset` days after 1960-01-01
#[must_use]
pub fn to_calendar_date(epoch_offset: i64) -> Option<NaiveDate> {
    SAS_EPOCH.checked_add_signed(TimeDelta::try_days(epoch_offset)?)
}

/// ISO formatted (`%Y-%m-%d`) calendar date of a SAS offset
#[must_use]
pub fn to_iso_date_string(epoch_offset: i64) -> Option<String> {
    to_calendar_date(epoch_offset).map(|date| date.format("%Y-%m-%d").to_string())
}

/// Days since 1970-01-01 as stored in `Date32`
#[must_use]
pub fn to_date32(date: NaiveDate) -> Option<i32> {
    i32::try_from(date.signed_duration_since(UNIX_EPOCH).num_days()).ok()
}

/// Calendar date of a `Date32` value
#[must_use]
pub fn from_date32(days: i32) -> Option<NaiveDate> {
    UNIX_EPOCH.checked_add_signed(TimeDelta::try_days(i64::from(days))?)
}

/// Convert an array of SAS day offsets to an Arrow `Date32` array
///
/// Accepts numeric or string offsets. Fractional offsets are truncated;
/// nulls, non-finite and out of range values become null.
pub fn sas_dates_to_date32(array: &ArrayRef) -> Result<ArrayRef> {
    let offsets = to_float64(array)?;
    let dates: Date32Array = offsets
        .iter()
        .map(|offset| {
            let offset = offset.filter(|v| v.is_finite())?.trunc();
            if offset.abs() > f64::from(i32::MAX) {
                return None;
            }
            to_calendar_date(offset as i64).and_then(to_date32)
        })
        .collect();
    Ok(Arc::new(dates))
}

/// Calendar component extracted by a projection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
    /// Day of month
    Day,
    /// ISO-8601 week of year
    Week,
    Month,
    Year,
    /// Quarter of year, 1 to 4
    Quarter,
}

impl DatePart {
    #[must_use]
    pub fn of(self, date: NaiveDate) -> i32 {
        match self {
            Self::Day => date.day() as i32,
            Self::Week => date.iso_week().week() as i32,
            Self::Month => date.month() as i32,
            Self::Year => date.year(),
            Self::Quarter => date.month0() as i32 / 3 + 1,
        }
    }
}

/// Extract `part` from every value of a `Date32` array
pub fn date_part(array: &ArrayRef, part: DatePart) -> Result<ArrayRef> {
    let dates = array
        .as_any()
        .downcast_ref::<Date32Array>()
        .ok_or_else(|| {
            WarehouseError::schema(format!(
                "Date part requires a date column, found {}",
                array.data_type()
            ))
        })?;
    let parts: Int32Array = dates
        .iter()
        .map(|days| days.and_then(from_date32).map(|date| part.of(date)))
        .collect();
    Ok(Arc::new(parts))
}
