//! Host values exchanged with the database.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveTime, Utc};

use crate::error::{Error, Result};

/// A single column or parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL value.
    Null,
    /// BIT / BOOLEAN.
    Bool(bool),
    /// SMALLINT / INTEGER.
    Int32(i32),
    /// BIGINT.
    Int64(i64),
    /// DOUBLE, REAL, FLOAT, and DECIMAL/NUMERIC/DECFLOAT parsed from text.
    Float64(f64),
    /// Character data of any width.
    String(String),
    /// Binary data (BINARY, VARBINARY, BLOB, XML).
    Bytes(Vec<u8>),
    /// TIMESTAMP, and DATE at midnight, in the statement's time zone.
    Timestamp(DateTime<FixedOffset>),
    /// TIME of day.
    Time(NaiveTime),
}

impl Value {
    /// Check if the value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to convert to i64; integers widen, strings are parsed.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(v) => Some(*v as i64),
            Value::Int64(v) => Some(*v),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Try to convert to f64.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Value::Int32(v) => Some(*v as f64),
            Value::Int64(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            Value::Time(t) => Some(*t),
            _ => None,
        }
    }

    /// Name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int32(_) => "i32",
            Value::Int64(_) => "i64",
            Value::Float64(_) => "f64",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Timestamp(_) => "timestamp",
            Value::Time(_) => "time",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{}", s),
            Value::Bytes(b) => write!(f, "<BINARY: {} bytes>", b.len()),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.f %:z")),
            Value::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v.fixed_offset())
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Time(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// The closed set of values a parameter can be bound from.
///
/// Every [`Value`] is narrowed to one of these before any native call is made,
/// so encoding is an exhaustive match rather than an open-ended dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Null,
    String(String),
    Int64(i64),
    Float64(f64),
    Bool(bool),
    Timestamp(DateTime<FixedOffset>),
    Bytes(Vec<u8>),
}

impl BindValue {
    /// Narrow `value` for binding at 1-based `position`.
    ///
    /// `Int32` widens to `Int64`. `Time` has no bindable counterpart and is
    /// rejected.
    pub fn from_value(value: Value, position: usize) -> Result<Self> {
        Ok(match value {
            Value::Null => BindValue::Null,
            Value::Bool(v) => BindValue::Bool(v),
            Value::Int32(v) => BindValue::Int64(v as i64),
            Value::Int64(v) => BindValue::Int64(v),
            Value::Float64(v) => BindValue::Float64(v),
            Value::String(v) => BindValue::String(v),
            Value::Bytes(v) => BindValue::Bytes(v),
            Value::Timestamp(v) => BindValue::Timestamp(v),
            other @ Value::Time(_) => {
                return Err(Error::UnsupportedParameter {
                    position,
                    type_name: other.kind(),
                })
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_null() {
        let val = Value::Null;
        assert!(val.is_null());
        assert_eq!(val.as_str(), None);
        assert_eq!(format!("{}", val), "NULL");
    }

    #[test]
    fn test_value_numbers() {
        assert_eq!(Value::Int32(42).to_i64(), Some(42));
        assert_eq!(Value::Int32(42).to_f64(), Some(42.0));
        assert_eq!(Value::String(" 7 ".into()).to_i64(), Some(7));
        assert_eq!(Value::Float64(1.5).to_i64(), None);
    }

    #[test]
    fn test_value_from_option() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::String("x".into()));
    }

    #[test]
    fn test_bind_value_narrowing() {
        assert_eq!(
            BindValue::from_value(Value::Int32(5), 1).unwrap(),
            BindValue::Int64(5)
        );
        assert_eq!(
            BindValue::from_value(Value::Bytes(vec![]), 1).unwrap(),
            BindValue::Bytes(vec![])
        );
    }

    #[test]
    fn test_bind_value_rejects_time() {
        let t = NaiveTime::from_hms_opt(1, 2, 3).unwrap();
        match BindValue::from_value(Value::Time(t), 4) {
            Err(Error::UnsupportedParameter {
                position,
                type_name,
            }) => {
                assert_eq!(position, 4);
                assert_eq!(type_name, "time");
            }
            other => panic!("expected UnsupportedParameter, got {:?}", other),
        }
    }
}
