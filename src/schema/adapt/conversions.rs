//! Casting arrays to projection target types.
//!
//! Every conversion is lenient: a value that cannot be represented in the
//! target type becomes null and the rest of the array is kept.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, Decimal128Array, Float64Array, Int32Array, Int64Array, NullArray,
    StringArray,
};
use arrow::compute::kernels::cast::{self, CastOptions};
use arrow::datatypes::DataType;

use crate::error::{Result, WarehouseError};
use crate::schema::adapt::types::TargetType;

fn cast_options() -> CastOptions<'static> {
    CastOptions {
        safe: true,
        ..CastOptions::default()
    }
}

/// Cast any string-like array to a plain `Utf8` array
fn as_utf8(array: &ArrayRef) -> Result<Option<ArrayRef>> {
    match array.data_type() {
        DataType::Utf8 => Ok(Some(array.clone())),
        DataType::LargeUtf8 | DataType::Utf8View => {
            Ok(Some(cast::cast_with_options(array, &DataType::Utf8, &cast_options())?))
        }
        _ => Ok(None),
    }
}

fn downcast_utf8(array: &ArrayRef) -> Result<&StringArray> {
    array.as_any().downcast_ref::<StringArray>().ok_or_else(|| {
        WarehouseError::schema(format!("Expected Utf8 array, found {}", array.data_type()))
    })
}

/// Trim surrounding whitespace from every string, mapping blank strings to null
#[must_use]
pub fn trim_strings(array: &StringArray) -> StringArray {
    array
        .iter()
        .map(|value| value.map(str::trim).filter(|s| !s.is_empty()))
        .collect()
}

/// Remove every space character from every string
#[must_use]
pub fn strip_spaces(array: &StringArray) -> StringArray {
    array
        .iter()
        .map(|value| value.map(|s| s.replace(' ', "")))
        .collect()
}

/// Parse an integer written either as `42` or as a float such as `42.0`
#[must_use]
pub fn parse_integer(text: &str) -> Option<i64> {
    let text = text.trim();
    text.parse::<i64>().ok().or_else(|| {
        let value = text.parse::<f64>().ok().filter(|v| v.is_finite())?.trunc();
        // i64::MAX is not representable, compare against 2^63
        (value >= -9_223_372_036_854_775_808.0 && value < 9_223_372_036_854_775_808.0)
            .then_some(value as i64)
    })
}

fn strings_to_int32(array: &StringArray) -> ArrayRef {
    let values: Int32Array = array
        .iter()
        .map(|v| v.and_then(parse_integer).and_then(|n| i32::try_from(n).ok()))
        .collect();
    Arc::new(values)
}

fn strings_to_int64(array: &StringArray) -> ArrayRef {
    let values: Int64Array = array.iter().map(|v| v.and_then(parse_integer)).collect();
    Arc::new(values)
}

fn to_decimal(array: &ArrayRef, precision: u8, scale: i8) -> Result<ArrayRef> {
    let floats = cast::cast_with_options(array, &DataType::Float64, &cast_options())?;
    let decimals = cast::cast_with_options(
        &floats,
        &DataType::Decimal128(precision, scale),
        &cast_options(),
    )?;
    match decimals.as_any().downcast_ref::<Decimal128Array>() {
        Some(d) => Ok(Arc::new(
            d.null_if_overflow_precision(precision)
                .with_precision_and_scale(precision, scale)?,
        )),
        None => Ok(decimals),
    }
}

/// Convert an Arrow array to the given target type
///
/// String inputs are trimmed before any non-string conversion, so `" 582 "`
/// becomes `582`. Integer targets also accept float text (`"2.0"`),
/// truncating toward zero like a SQL cast.
pub fn convert_array(array: &ArrayRef, target: TargetType) -> Result<ArrayRef> {
    let target_type = target.data_type();
    if array.data_type() == &target_type {
        return Ok(array.clone());
    }

    if array.data_type() == &DataType::Null {
        return create_null_array(&target_type, array.len());
    }

    let strings = match as_utf8(array)? {
        Some(utf8) if target != TargetType::Utf8 => Some(trim_strings(downcast_utf8(&utf8)?)),
        Some(utf8) => return Ok(utf8),
        None => None,
    };

    match (strings, target) {
        (Some(strings), TargetType::Int) => Ok(strings_to_int32(&strings)),
        (Some(strings), TargetType::Long) => Ok(strings_to_int64(&strings)),
        (Some(strings), TargetType::Decimal(p, s)) => {
            to_decimal(&(Arc::new(strings) as ArrayRef), p, s)
        }
        (Some(strings), _) => Ok(cast::cast_with_options(
            &(Arc::new(strings) as ArrayRef),
            &target_type,
            &cast_options(),
        )?),
        (None, TargetType::Decimal(p, s)) => to_decimal(array, p, s),
        (None, _) => Ok(cast::cast_with_options(array, &target_type, &cast_options())?),
    }
}

/// Create a null array of the specified type and length
pub fn create_null_array(data_type: &DataType, length: usize) -> Result<ArrayRef> {
    let null_array: ArrayRef = Arc::new(NullArray::new(length));
    Ok(cast::cast(&null_array, data_type)?)
}

/// Numeric view of an array as `Float64`, parsing trimmed strings
pub fn to_float64(array: &ArrayRef) -> Result<Float64Array> {
    let floats = match string_column(array)? {
        Some(strings) => {
            let trimmed: ArrayRef = Arc::new(trim_strings(&strings));
            cast::cast_with_options(&trimmed, &DataType::Float64, &cast_options())?
        }
        None => cast::cast_with_options(array, &DataType::Float64, &cast_options())?,
    };
    floats
        .as_any()
        .downcast_ref::<Float64Array>()
        .cloned()
        .ok_or_else(|| WarehouseError::schema("Cast to Float64 returned another type"))
}

/// `Utf8` view of any string-like array, `None` for other types
pub fn string_column(array: &ArrayRef) -> Result<Option<StringArray>> {
    match as_utf8(array)? {
        Some(utf8) => Ok(Some(downcast_utf8(&utf8)?.clone())),
        None => Ok(None),
    }
}
