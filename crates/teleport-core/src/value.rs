//! Native row values
//!
//! Rows read from a database decode into [`Value`]. Its `Display` impl is the
//! canonical stringification used for CSV cells and SQL literals, so the same
//! value always renders identically.

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;

/// Date format for canonical text
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Datetime format for canonical text
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// A single cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Boolean
    Boolean(bool),
    /// Signed integer
    Integer(i64),
    /// Floating point number
    Float(f64),
    /// Character data, also used for exact decimals
    String(String),
    /// Calendar date
    Date(NaiveDate),
    /// Timestamp without time zone
    DateTime(NaiveDateTime),
    /// Binary data
    Bytes(Vec<u8>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Value::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
            Value::Bytes(bytes) => f.write_str(&hex::encode(bytes)),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_text() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let dt = date.and_hms_opt(14, 5, 0).unwrap();
        let dt_ms = date.and_hms_milli_opt(14, 5, 0, 250).unwrap();

        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Boolean(false).to_string(), "false");
        assert_eq!(Value::Integer(-12).to_string(), "-12");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::from("héllo").to_string(), "héllo");
        assert_eq!(Value::Date(date).to_string(), "2024-03-09");
        assert_eq!(Value::DateTime(dt).to_string(), "2024-03-09 14:05:00");
        assert_eq!(Value::DateTime(dt_ms).to_string(), "2024-03-09 14:05:00.250");
        assert_eq!(Value::Bytes(vec![0xde, 0xad]).to_string(), "dead");
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(3_i64)), Value::Integer(3));
    }
}
