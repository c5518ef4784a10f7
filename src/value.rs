use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat};

use crate::data_type::DataType;
use crate::error::CastError;

/// Represents a single non-null data value.
///
/// SQL `NULL` is not a variant: a nullable value is an `Option<Value>` and
/// `None` is null. None of the coercions below are null-safe; callers decide
/// what null means for their operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    /// A 64-bit signed integer value.
    Integer(i64),
    /// A 64-bit floating-point value.
    Number(f64),
    /// A UTF-8 string value, wrapped in an [Arc] for cheap cloning when rows
    /// are copied into query results.
    String(Arc<str>),
    Timestamp(DateTime<FixedOffset>),
}

impl Value {
    /// Returns the logical [DataType] corresponding to this value.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Boolean(_) => DataType::Boolean,
            Self::Integer(_) => DataType::Integer,
            Self::Number(_) => DataType::Number,
            Self::String(_) => DataType::String,
            Self::Timestamp(_) => DataType::Timestamp,
        }
    }

    // --- Coercions ---

    pub fn to_boolean(&self) -> Result<bool, CastError> {
        match self {
            Self::Boolean(b) => Ok(*b),
            _ => Err(self.unsupported(DataType::Boolean)),
        }
    }

    /// Numbers truncate toward zero; strings must hold a decimal integer.
    pub fn to_integer(&self) -> Result<i64, CastError> {
        match self {
            Self::Integer(i) => Ok(*i),
            Self::Number(f) => Ok(*f as i64),
            Self::String(s) => s.parse().map_err(|_| CastError::Parse {
                text: s.to_string(),
                to: DataType::Integer,
            }),
            Self::Boolean(_) | Self::Timestamp(_) => Err(self.unsupported(DataType::Integer)),
        }
    }

    pub fn to_number(&self) -> Result<f64, CastError> {
        match self {
            Self::Integer(i) => Ok(*i as f64),
            Self::Number(f) => Ok(*f),
            Self::String(s) => s.parse().map_err(|_| CastError::Parse {
                text: s.to_string(),
                to: DataType::Number,
            }),
            Self::Boolean(_) | Self::Timestamp(_) => Err(self.unsupported(DataType::Number)),
        }
    }

    /// The unquoted text of a value, as used by concatenation and by
    /// `VARCHAR` columns. Booleans have no string form.
    pub fn to_text(&self) -> Result<Arc<str>, CastError> {
        match self {
            Self::String(s) => Ok(Arc::clone(s)),
            Self::Integer(i) => Ok(i.to_string().into()),
            Self::Number(f) => Ok(f.to_string().into()),
            Self::Timestamp(ts) => Ok(format_timestamp(ts).into()),
            Self::Boolean(_) => Err(self.unsupported(DataType::String)),
        }
    }

    pub fn to_timestamp(&self) -> Result<DateTime<FixedOffset>, CastError> {
        match self {
            Self::Timestamp(ts) => Ok(*ts),
            Self::String(s) => parse_timestamp(s).ok_or_else(|| CastError::Parse {
                text: s.to_string(),
                to: DataType::Timestamp,
            }),
            Self::Boolean(_) | Self::Integer(_) | Self::Number(_) => {
                Err(self.unsupported(DataType::Timestamp))
            }
        }
    }

    /// Converts the value to the given column type.
    ///
    /// # Example
    /// ```
    /// # use toysql::{DataType, Value};
    /// let v = Value::String("42".into()).coerce(DataType::Integer).unwrap();
    /// assert_eq!(v, Value::Integer(42));
    /// assert!(Value::Boolean(true).coerce(DataType::Integer).is_err());
    /// ```
    pub fn coerce(&self, data_type: DataType) -> Result<Value, CastError> {
        Ok(match data_type {
            DataType::Boolean => Value::Boolean(self.to_boolean()?),
            DataType::Integer => Value::Integer(self.to_integer()?),
            DataType::Number => Value::Number(self.to_number()?),
            DataType::String => Value::String(self.to_text()?),
            DataType::Timestamp => Value::Timestamp(self.to_timestamp()?),
        })
    }

    fn unsupported(&self, to: DataType) -> CastError {
        CastError::Unsupported {
            from: self.data_type(),
            to,
        }
    }
}

/// Canonical text form: strings are double-quoted, timestamps are RFC 3339.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{:?}", s.as_ref()),
            Self::Timestamp(ts) => f.write_str(&format_timestamp(ts)),
        }
    }
}

/// Renders a nullable value for diagnostics.
pub fn describe(value: Option<&Value>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "NULL".to_string(),
    }
}

fn format_timestamp(ts: &DateTime<FixedOffset>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Layouts without an explicit offset; these are read as UTC.
const NAIVE_LAYOUTS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Parses the timestamp layouts accepted for `TIMESTAMP` values: RFC 3339,
/// RFC 2822 (which covers RFC 1123), the Ruby date layout, and plain
/// `YYYY-MM-DD[ HH:MM:SS[.f]]` with an optional ` UTC`/` GMT` suffix.
pub fn parse_timestamp(text: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts);
    }
    if let Ok(ts) = DateTime::parse_from_rfc2822(text) {
        return Some(ts);
    }
    if let Ok(ts) = DateTime::parse_from_str(text, "%a %b %d %H:%M:%S %z %Y") {
        return Some(ts);
    }

    let naive = text
        .strip_suffix(" UTC")
        .or_else(|| text.strip_suffix(" GMT"))
        .unwrap_or(text);
    for layout in NAIVE_LAYOUTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, layout) {
            return Some(dt.and_utc().fixed_offset());
        }
    }
    NaiveDate::parse_from_str(naive, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().fixed_offset())
}
