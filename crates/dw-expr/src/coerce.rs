//! Best-effort coercion of filter values
//!
//! Relational filter values arrive as JSON. Strings are tried, in order, as an
//! offset-carrying ISO-8601 timestamp, then as a number (integer unless the
//! text has a decimal point), and otherwise kept as text. Coercion never
//! fails. The target column's type narrows the choice: text columns compare
//! against the raw string (numbers included, in their JSON text form),
//! datetime columns also accept naive dates.

use dw_frame::temporal::{parse_aware, parse_datetime};
use dw_frame::{DataType, Value};

/// Coerce a JSON filter value for comparison against a column of `column_type`
#[must_use]
pub fn coerce_relational(raw: &serde_json::Value, column_type: DataType) -> Value {
    match raw {
        serde_json::Value::String(s) => coerce_text(s, column_type),
        serde_json::Value::Null => Value::Null,
        other if column_type == DataType::String => Value::Str(stringify(other)),
        other => Value::from_json(other),
    }
}

fn coerce_text(text: &str, column_type: DataType) -> Value {
    match column_type {
        DataType::String => return Value::Str(text.to_string()),
        DataType::Datetime => {
            if let Some(dt) = parse_datetime(text, None) {
                return Value::Datetime(dt);
            }
        }
        DataType::Boolean => match text.trim().to_ascii_lowercase().as_str() {
            "true" => return Value::Bool(true),
            "false" => return Value::Bool(false),
            _ => {}
        },
        _ => {}
    }
    if let Some(dt) = parse_aware(text) {
        return Value::Datetime(dt);
    }
    coerce_numeric(text).unwrap_or_else(|| Value::Str(text.to_string()))
}

/// Integer when the text has no decimal point, float otherwise
#[must_use]
pub fn coerce_numeric(text: &str) -> Option<Value> {
    let t = text.trim();
    if t.contains('.') {
        t.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Value::Float)
    } else {
        t.parse::<i64>().ok().map(Value::Int)
    }
}

/// Text form of a JSON value for substring operators
#[must_use]
pub fn stringify(raw: &serde_json::Value) -> String {
    match raw {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
