//! Typed column bounds.
//!
//! Minimum and maximum values of a column are supplied and stored as text.
//! The optimizer needs them in two forms: a literal of the column's type ([ScalarValue])
//! and a numeric projection used in range arithmetic (see [convert_to_double]).

use std::fmt::{Display, Formatter};

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::datatypes::DataType;
use crate::error::StatisticsError;

const DATE_FORMAT: &str = "%Y-%m-%d";
// `%.f` prints nothing for whole seconds.
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const DATETIME_FORMATS: [&str; 2] = [DATETIME_FORMAT, "%Y-%m-%d %H:%M:%S"];

/// Supported scalar values.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    String(String),
}

impl ScalarValue {
    /// Returns the type of this scalar value.
    pub fn data_type(&self) -> DataType {
        match self {
            ScalarValue::Bool(_) => DataType::Bool,
            ScalarValue::Int32(_) => DataType::Int32,
            ScalarValue::Int64(_) => DataType::Int64,
            ScalarValue::Float64(_) => DataType::Float64,
            ScalarValue::Date(_) => DataType::Date,
            ScalarValue::DateTime(_) => DataType::DateTime,
            ScalarValue::String(_) => DataType::String,
        }
    }

    /// Returns the numeric projection of this value.
    ///
    /// Dates and timestamps are mapped to `yyyyMMddHHmmss` numbers,
    /// strings to an order preserving number built from their first 7 bytes.
    pub fn to_double(&self) -> f64 {
        match self {
            ScalarValue::Bool(value) => {
                if *value {
                    1.0
                } else {
                    0.0
                }
            }
            ScalarValue::Int32(value) => *value as f64,
            ScalarValue::Int64(value) => *value as f64,
            ScalarValue::Float64(value) => *value,
            ScalarValue::Date(value) => datetime_to_number(&value.and_hms_opt(0, 0, 0).unwrap_or_default()),
            ScalarValue::DateTime(value) => datetime_to_number(value),
            ScalarValue::String(value) => string_to_number(value),
        }
    }
}

impl Display for ScalarValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarValue::Bool(value) => write!(f, "{}", value),
            ScalarValue::Int32(value) => write!(f, "{}", value),
            ScalarValue::Int64(value) => write!(f, "{}", value),
            ScalarValue::Float64(value) => write!(f, "{}", value),
            ScalarValue::Date(value) => write!(f, "{}", value.format(DATE_FORMAT)),
            ScalarValue::DateTime(value) => write!(f, "{}", value.format(DATETIME_FORMAT)),
            ScalarValue::String(value) => write!(f, "{}", value),
        }
    }
}

/// Parses the given text as a literal of the given type.
pub fn readable_value(data_type: &DataType, text: &str) -> Result<ScalarValue, StatisticsError> {
    let invalid = || StatisticsError::analysis(format!("Invalid {:?} value: {}", data_type, text));
    let trimmed = text.trim();

    let value = match data_type {
        DataType::Bool => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "1" => ScalarValue::Bool(true),
            "false" | "0" => ScalarValue::Bool(false),
            _ => return Err(invalid()),
        },
        DataType::Int32 => ScalarValue::Int32(trimmed.parse().map_err(|_| invalid())?),
        DataType::Int64 => ScalarValue::Int64(trimmed.parse().map_err(|_| invalid())?),
        DataType::Float64 => {
            let value: f64 = trimmed.parse().map_err(|_| invalid())?;
            if !value.is_finite() {
                return Err(invalid());
            }
            ScalarValue::Float64(value)
        }
        DataType::Date => ScalarValue::Date(NaiveDate::parse_from_str(trimmed, DATE_FORMAT).map_err(|_| invalid())?),
        DataType::DateTime => ScalarValue::DateTime(parse_datetime(trimmed).ok_or_else(invalid)?),
        DataType::String => ScalarValue::String(text.to_string()),
    };
    Ok(value)
}

/// Parses the given text as a literal of the given type and returns its numeric projection.
/// See [ScalarValue::to_double].
pub fn convert_to_double(data_type: &DataType, text: &str) -> Result<f64, StatisticsError> {
    readable_value(data_type, text).map(|v| v.to_double())
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| NaiveDate::parse_from_str(text, DATE_FORMAT).ok().and_then(|d| d.and_hms_opt(0, 0, 0)))
}

fn datetime_to_number(value: &NaiveDateTime) -> f64 {
    let date = value.year() as i64 * 10000 + value.month() as i64 * 100 + value.day() as i64;
    let time = value.hour() as i64 * 10000 + value.minute() as i64 * 100 + value.second() as i64;
    (date * 1_000_000 + time) as f64
}

fn string_to_number(value: &str) -> f64 {
    let bytes = value.as_bytes();
    let mut v: u64 = 0;
    for i in 0..8 {
        // only the first 7 bytes contribute.
        let b = if i < 7 { bytes.get(i).copied().unwrap_or(0) } else { 0 };
        v = (v << 8) | b as u64;
    }
    v as f64
}
