//! Ordered column names and logical types

use crate::error::{FrameError, FrameResult};
use crate::value::DataType;
use polars::prelude::{self as pl, DataFrame};
use serde::{Deserialize, Serialize};

/// Logical view of a polars schema
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<(String, DataType)>,
}

impl Schema {
    /// Empty schema
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema from ordered fields
    #[must_use]
    pub fn from_fields(fields: Vec<(String, DataType)>) -> Self {
        Self { fields }
    }

    /// View of a resolved plan schema
    #[must_use]
    pub fn from_polars(schema: &pl::Schema) -> Self {
        Self {
            fields: schema
                .iter()
                .map(|(name, dtype)| (name.to_string(), DataType::of(dtype)))
                .collect(),
        }
    }

    /// View of an eager table's columns
    #[must_use]
    pub fn of_frame(frame: &DataFrame) -> Self {
        Self {
            fields: frame
                .get_columns()
                .iter()
                .map(|c| (c.name().to_string(), DataType::of(c.dtype())))
                .collect(),
        }
    }

    /// Type of a column
    #[must_use]
    pub fn get(&self, name: &str) -> Option<DataType> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, t)| *t)
    }

    /// Type of a column that must exist
    ///
    /// # Errors
    /// Returns [`FrameError::ColumnNotFound`] listing the available columns.
    pub fn require(&self, name: &str) -> FrameResult<DataType> {
        self.get(name)
            .ok_or_else(|| FrameError::column_not_found(name, self.names()))
    }

    /// Column is present
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Column names in order
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.fields.iter().map(|(n, _)| n.clone()).collect()
    }

    /// Fields in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, DataType)> {
        self.fields.iter().map(|(n, t)| (n.as_str(), *t))
    }

    /// Number of columns
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// No columns
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
