use crate::datatypes::{DataType, NativeType};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;
use num_traits::ToPrimitive;
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::fmt;

/// A single dynamically-typed cell value.
///
/// This is the boxed view every dense array exposes through `value()` and
/// `set_value()`; absent entries are represented as `None` at the call site,
/// never as a variant here.
#[derive(Clone, Debug)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
    Zoned(DateTime<Tz>),
}

impl Value {
    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Bool(_) => DataType::Boolean,
            Self::Int(_) => DataType::Int,
            Self::Long(_) => DataType::Long,
            Self::Double(_) => DataType::Double,
            Self::Text(_) => DataType::Utf8,
            Self::Date(_) => DataType::Date,
            Self::DateTime(_) => DataType::DateTime,
            Self::Time(_) => DataType::Time,
            Self::Zoned(_) => DataType::Zoned,
        }
    }

    /// Numeric view of this value, if it has one.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => v.to_f64(),
            Self::Long(v) => v.to_f64(),
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_json_value(self) -> Option<JsonValue> {
        match self {
            Self::Bool(v) => v.into_json_value(),
            Self::Int(v) => v.into_json_value(),
            Self::Long(v) => v.into_json_value(),
            Self::Double(v) => v.into_json_value(),
            Self::Text(v) => Some(JsonValue::String(v)),
            Self::Date(v) => Some(JsonValue::String(v.to_string())),
            Self::DateTime(v) => Some(JsonValue::String(v.to_string())),
            Self::Time(v) => Some(JsonValue::String(v.to_string())),
            Self::Zoned(v) => Some(JsonValue::String(v.to_rfc3339())),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::DateTime(a), Self::DateTime(b)) => a == b,
            (Self::Time(a), Self::Time(b)) => a == b,
            // Zone identity matters, not just the instant.
            (Self::Zoned(a), Self::Zoned(b)) => {
                a.timestamp_millis() == b.timestamp_millis() && a.timezone() == b.timezone()
            }
            _ => false,
        }
    }
}

impl PartialOrd for Value {
    /// Orders values of the same variant; values of different variants are
    /// incomparable and yield `None`.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.partial_cmp(b),
            (Self::Int(a), Self::Int(b)) => a.partial_cmp(b),
            (Self::Long(a), Self::Long(b)) => a.partial_cmp(b),
            (Self::Double(a), Self::Double(b)) => a.partial_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.partial_cmp(b),
            (Self::Date(a), Self::Date(b)) => a.partial_cmp(b),
            (Self::DateTime(a), Self::DateTime(b)) => a.partial_cmp(b),
            (Self::Time(a), Self::Time(b)) => a.partial_cmp(b),
            (Self::Zoned(a), Self::Zoned(b)) => {
                a.timestamp_millis().partial_cmp(&b.timestamp_millis())
            }
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
            Self::Date(v) => write!(f, "{v}"),
            Self::DateTime(v) => write!(f, "{v}"),
            Self::Time(v) => write!(f, "{v}"),
            Self::Zoned(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Self::Time(v)
    }
}

impl From<DateTime<Tz>> for Value {
    fn from(v: DateTime<Tz>) -> Self {
        Self::Zoned(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_variant_ordering() {
        assert_eq!(
            Value::Int(1).partial_cmp(&Value::Int(2)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::Text("b".into()).partial_cmp(&Value::Text("a".into())),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::Int(1).partial_cmp(&Value::Long(1)), None);
    }

    #[test]
    fn json_conversion() {
        assert_eq!(
            Value::Long(3).into_json_value(),
            Some(JsonValue::Number(3.into()))
        );
        // NaN has no JSON representation.
        assert_eq!(Value::Double(f64::NAN).into_json_value(), None);
    }

    #[test]
    fn zoned_equality_needs_matching_zone() {
        use chrono::TimeZone;
        let utc = chrono_tz::UTC.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let seoul = utc.with_timezone(&chrono_tz::Asia::Seoul);
        assert_eq!(utc.timestamp_millis(), seoul.timestamp_millis());
        assert_ne!(Value::Zoned(utc), Value::Zoned(seoul));
    }
}
