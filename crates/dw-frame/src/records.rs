//! JSON record import and export
//!
//! Records are a JSON array of flat objects. Columns appear in first-seen key
//! order; keys missing from a record are null. [`StoredTable`] is the
//! column-oriented shape tables take inside persisted workspace files.

use crate::error::{FrameError, FrameResult};
use crate::frame::FrameExt;
use crate::temporal::parse_datetime;
use crate::value::{DataType, Value};
use indexmap::IndexMap;
use polars::prelude::{Column, DataFrame, NamedFrom, Series};
use serde::{Deserialize, Serialize};

/// Type of a column built from loose values
///
/// Integers mixed with floats widen to float; any other mix falls back to
/// text.
#[must_use]
pub fn infer_dtype(values: &[Value]) -> DataType {
    let mut dtype = DataType::Null;
    for t in values.iter().map(Value::dtype).filter(|t| *t != DataType::Null) {
        dtype = match (dtype, t) {
            (DataType::Null, t) => t,
            (a, b) if a == b => a,
            (DataType::Integer, DataType::Float) | (DataType::Float, DataType::Integer) => DataType::Float,
            _ => DataType::String,
        };
    }
    dtype
}

/// Build a polars series of a logical type
///
/// Cells that do not fit the type are null, except for text columns, which
/// take the text form of any cell.
///
/// # Errors
/// Propagates polars cast failures for timestamp columns.
pub fn series_from_values(name: &str, dtype: DataType, values: &[Value]) -> FrameResult<Series> {
    let series = match dtype {
        DataType::Null => Series::new_null(name.into(), values.len()),
        DataType::Boolean => {
            let cells: Vec<Option<bool>> = values
                .iter()
                .map(|v| match v {
                    Value::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect();
            Series::new(name.into(), cells)
        }
        DataType::Integer => {
            let cells: Vec<Option<i64>> = values
                .iter()
                .map(|v| match v {
                    Value::Int(i) => Some(*i),
                    _ => None,
                })
                .collect();
            Series::new(name.into(), cells)
        }
        DataType::Float => {
            let cells: Vec<Option<f64>> = values.iter().map(Value::as_f64).collect();
            Series::new(name.into(), cells)
        }
        DataType::String | DataType::Other => {
            let cells: Vec<Option<String>> = values
                .iter()
                .map(|v| (!v.is_null()).then(|| v.to_string()))
                .collect();
            Series::new(name.into(), cells)
        }
        DataType::Datetime => {
            let cells: Vec<Option<i64>> = values
                .iter()
                .map(|v| match v {
                    Value::Datetime(dt) => Some(dt.timestamp_micros()),
                    Value::Str(s) => parse_datetime(s, None).map(|dt| dt.timestamp_micros()),
                    _ => None,
                })
                .collect();
            Series::new(name.into(), cells).cast(&dtype.to_polars())?
        }
    };
    Ok(series)
}

/// Build a frame from named columns of loose values, inferring each type
///
/// # Errors
/// Fails on duplicate names or unequal column lengths.
pub fn frame_from_columns(columns: Vec<(String, Vec<Value>)>) -> FrameResult<DataFrame> {
    let columns = columns
        .into_iter()
        .map(|(name, values)| {
            let dtype = infer_dtype(&values);
            series_from_values(&name, dtype, &values).map(Column::from)
        })
        .collect::<FrameResult<Vec<_>>>()?;
    Ok(DataFrame::new(columns)?)
}

/// Build a table from a JSON array of objects
///
/// # Errors
/// Returns [`FrameError::InvalidRecords`] when the input is not an array of objects.
pub fn from_json_records(json: &serde_json::Value) -> FrameResult<DataFrame> {
    let rows = json
        .as_array()
        .ok_or_else(|| FrameError::InvalidRecords("expected a JSON array".to_string()))?;

    let mut columns: IndexMap<String, Vec<Value>> = IndexMap::new();
    for (i, row) in rows.iter().enumerate() {
        let object = row
            .as_object()
            .ok_or_else(|| FrameError::InvalidRecords(format!("record {i} is not an object")))?;
        for (key, value) in object {
            let cells = columns
                .entry(key.clone())
                .or_insert_with(|| vec![Value::Null; i]);
            cells.push(Value::from_json(value));
        }
        for cells in columns.values_mut() {
            if cells.len() == i {
                cells.push(Value::Null);
            }
        }
    }
    frame_from_columns(columns.into_iter().collect())
}

/// Parse JSON text into a table
///
/// # Errors
/// Fails on malformed JSON or a non-record shape.
pub fn from_json_str(text: &str) -> FrameResult<DataFrame> {
    let json: serde_json::Value =
        serde_json::from_str(text).map_err(|e| FrameError::InvalidRecords(e.to_string()))?;
    from_json_records(&json)
}

/// Render rows as JSON objects keyed by column name
#[must_use]
pub fn to_json_records(frame: &DataFrame) -> Vec<IndexMap<String, serde_json::Value>> {
    (0..frame.height())
        .filter_map(|row| frame.record(row))
        .map(|record| record.into_iter().map(|(k, v)| (k, v.to_json())).collect())
        .collect()
}

/// One persisted column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredColumn {
    /// Column name
    pub name: String,
    /// Logical type restored on load
    pub dtype: DataType,
    /// Cells as plain JSON
    pub values: Vec<serde_json::Value>,
}

/// Column-oriented JSON form of a table
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoredTable {
    /// Columns in order
    pub columns: Vec<StoredColumn>,
}

impl StoredTable {
    /// Capture a frame
    ///
    /// # Errors
    /// Propagates polars failures while reading cells.
    pub fn from_frame(frame: &DataFrame) -> FrameResult<Self> {
        let columns = frame
            .table_schema()
            .iter()
            .map(|(name, dtype)| {
                let values = frame.values(name)?.iter().map(Value::to_json).collect();
                Ok(StoredColumn {
                    name: name.to_string(),
                    dtype,
                    values,
                })
            })
            .collect::<FrameResult<_>>()?;
        Ok(Self { columns })
    }

    /// Rebuild the frame with the recorded types
    ///
    /// # Errors
    /// Fails on duplicate names or unequal column lengths.
    pub fn into_frame(self) -> FrameResult<DataFrame> {
        let columns = self
            .columns
            .into_iter()
            .map(|c| {
                let values: Vec<Value> = c.values.iter().map(Value::from_json).collect();
                series_from_values(&c.name, c.dtype, &values).map(Column::from)
            })
            .collect::<FrameResult<Vec<_>>>()?;
        Ok(DataFrame::new(columns)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn sparse_records_fill_nulls() {
        let df = from_json_records(&json!([
            {"a": 1, "b": "x"},
            {"b": "y"},
            {"a": 2.5, "c": true}
        ]))
        .unwrap();
        let schema = df.table_schema();
        assert_eq!(schema.names(), vec!["a", "b", "c"]);
        assert_eq!(df.height(), 3);
        assert_eq!(schema.get("a"), Some(DataType::Float));
        assert_eq!(df.values("a").unwrap()[1], Value::Null);
        assert_eq!(df.values("c").unwrap()[0], Value::Null);
    }

    #[test]
    fn mixed_cells_fall_back_to_text() {
        let df = from_json_str(r#"[{"v": 1}, {"v": "two"}]"#).unwrap();
        assert_eq!(df.table_schema().get("v"), Some(DataType::String));
        assert_eq!(df.values("v").unwrap(), vec![Value::from("1"), Value::from("two")]);
    }

    #[test]
    fn rejects_non_array() {
        assert!(matches!(
            from_json_str(r#"{"a": 1}"#),
            Err(FrameError::InvalidRecords(_))
        ));
        assert!(from_json_str("[1, 2]").is_err());
    }

    #[test]
    fn export_renders_plain_json() {
        let df = from_json_str(r#"[{"n": 1, "s": "a"}]"#).unwrap();
        let rows = to_json_records(&df);
        assert_eq!(rows[0]["n"], json!(1));
        assert_eq!(rows[0]["s"], json!("a"));
    }

    #[test]
    fn stored_table_restores_types() {
        let stamp = Value::Datetime(chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap());
        let df = frame_from_columns(vec![
            ("when".to_string(), vec![stamp.clone(), Value::Null]),
            ("empty".to_string(), vec![Value::Null, Value::Null]),
        ])
        .unwrap();
        let stored = StoredTable::from_frame(&df).unwrap();
        let text = serde_json::to_string(&stored).unwrap();
        let back: StoredTable = serde_json::from_str(&text).unwrap();
        let restored = back.into_frame().unwrap();
        assert_eq!(restored.table_schema(), df.table_schema());
        assert_eq!(restored.values("when").unwrap(), vec![stamp, Value::Null]);
    }
}
