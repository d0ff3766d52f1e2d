//! Target types for typed projection.

use arrow::datatypes::DataType;

/// Column types a projection can cast to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetType {
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    Long,
    /// Fixed point decimal with precision and scale
    Decimal(u8, i8),
    /// UTF-8 string
    Utf8,
    /// Calendar date (days since 1970-01-01)
    Date,
}

impl TargetType {
    /// Arrow data type stored for this target
    #[must_use]
    pub fn data_type(self) -> DataType {
        match self {
            Self::Int => DataType::Int32,
            Self::Long => DataType::Int64,
            Self::Decimal(precision, scale) => DataType::Decimal128(precision, scale),
            Self::Utf8 => DataType::Utf8,
            Self::Date => DataType::Date32,
        }
    }
}
