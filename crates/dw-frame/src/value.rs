//! Cell values and logical column types
//!
//! Polars carries many physical types; the API speaks a smaller logical set.
//! [`DataType::of`] folds every polars type into it.

use crate::temporal::utc_datetime;
use chrono::{DateTime, SecondsFormat, Utc};
use polars::prelude::{self as pl, lit, AnyValue, Expr, TimeUnit, NULL};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// Column holding only nulls (type not yet known)
    Null,
    /// `true` / `false`
    Boolean,
    /// Any integer width
    Integer,
    /// Any float width
    Float,
    /// UTF-8 text
    String,
    /// Timestamp or date
    Datetime,
    /// Nested and other types with no scalar rendering
    Other,
}

impl DataType {
    /// Stable lowercase name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Datetime => "datetime",
            Self::Other => "other",
        }
    }

    /// Integer or float
    #[inline]
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }

    /// Text or still untyped
    #[inline]
    #[must_use]
    pub fn is_text(self) -> bool {
        matches!(self, Self::String | Self::Null)
    }

    /// Logical type of a polars type
    #[must_use]
    pub fn of(dtype: &pl::DataType) -> Self {
        match dtype {
            pl::DataType::Null => Self::Null,
            pl::DataType::Boolean => Self::Boolean,
            pl::DataType::String => Self::String,
            pl::DataType::Datetime(..) | pl::DataType::Date => Self::Datetime,
            d if d.is_integer() => Self::Integer,
            d if d.is_float() => Self::Float,
            _ => Self::Other,
        }
    }

    /// Polars type a column of this logical type is stored as
    #[must_use]
    pub fn to_polars(self) -> pl::DataType {
        match self {
            Self::Null => pl::DataType::Null,
            Self::Boolean => pl::DataType::Boolean,
            Self::Integer => pl::DataType::Int64,
            Self::Float => pl::DataType::Float64,
            Self::String | Self::Other => pl::DataType::String,
            Self::Datetime => utc_datetime(),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single table cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Missing value
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// Text
    Str(String),
    /// UTC timestamp
    Datetime(DateTime<Utc>),
}

fn timestamp(value: i64, unit: TimeUnit) -> Option<DateTime<Utc>> {
    match unit {
        TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(value)),
        TimeUnit::Microseconds => DateTime::from_timestamp_micros(value),
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(value),
    }
}

impl Value {
    /// Type of this value (`Null` for missing)
    #[must_use]
    pub fn dtype(&self) -> DataType {
        match self {
            Self::Null => DataType::Null,
            Self::Bool(_) => DataType::Boolean,
            Self::Int(_) => DataType::Integer,
            Self::Float(_) => DataType::Float,
            Self::Str(_) => DataType::String,
            Self::Datetime(_) => DataType::Datetime,
        }
    }

    /// Check for null
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow text content
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view (integers widen to float)
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Read one polars cell
    ///
    /// Timestamps of any unit become UTC; values without a scalar form keep
    /// their polars rendering as text.
    #[must_use]
    pub fn from_any(value: &AnyValue<'_>) -> Self {
        match value {
            AnyValue::Null => Self::Null,
            AnyValue::Boolean(b) => Self::Bool(*b),
            AnyValue::String(s) => Self::Str((*s).to_string()),
            AnyValue::StringOwned(s) => Self::Str(s.to_string()),
            AnyValue::Int64(i) => Self::Int(*i),
            AnyValue::Float64(f) => Self::Float(*f),
            AnyValue::Float32(f) => Self::Float(f64::from(*f)),
            AnyValue::Datetime(v, unit, _) => timestamp(*v, *unit).map_or(Self::Null, Self::Datetime),
            AnyValue::Date(days) => {
                DateTime::from_timestamp(i64::from(*days) * 86_400, 0).map_or(Self::Null, Self::Datetime)
            }
            other if other.dtype().is_integer() => other.extract::<i64>().map_or(Self::Null, Self::Int),
            other => Self::Str(other.to_string()),
        }
    }

    /// Polars literal; timestamps are typed as UTC microseconds
    #[must_use]
    pub fn to_lit(&self) -> Expr {
        match self {
            Self::Null => lit(NULL),
            Self::Bool(b) => lit(*b),
            Self::Int(i) => lit(*i),
            Self::Float(f) => lit(*f),
            Self::Str(s) => lit(s.clone()),
            Self::Datetime(dt) => lit(dt.timestamp_micros()).cast(utc_datetime()),
        }
    }

    /// Plain JSON rendering used by API responses
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::Str(s) => serde_json::Value::String(s.clone()),
            Self::Datetime(dt) => serde_json::Value::String(render_datetime(dt)),
        }
    }

    /// Read a plain JSON scalar
    ///
    /// Integral numbers become [`Value::Int`], other numbers [`Value::Float`].
    /// Arrays and objects are kept as their JSON text.
    #[must_use]
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float))
                .unwrap_or(Self::Null),
            serde_json::Value::String(s) => Self::Str(s.clone()),
            other => Self::Str(other.to_string()),
        }
    }
}

/// Canonical text form of a timestamp (`2024-01-02T03:04:05Z`)
#[must_use]
pub fn render_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x:?}"),
            Self::Str(s) => f.write_str(s),
            Self::Datetime(dt) => f.write_str(&render_datetime(dt)),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::Datetime(dt)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
