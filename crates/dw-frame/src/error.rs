//! Error types for table operations

use crate::value::DataType;
use polars::prelude::PolarsError;

/// Errors raised while building, transforming or collecting tables
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrameError {
    /// Referenced column is not part of the schema
    #[error("column '{column}' not found. Available columns: {available:?}")]
    ColumnNotFound {
        /// Requested column
        column: String,
        /// Columns that do exist
        available: Vec<String>,
    },

    /// Two columns would share a name
    #[error("duplicate column name: '{0}'")]
    DuplicateColumn(String),

    /// A column had the wrong type
    #[error("type mismatch in {context}: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Where the mismatch happened
        context: String,
        /// Expected type
        expected: DataType,
        /// Observed type
        actual: DataType,
    },

    /// Slice bounds are inverted
    #[error("invalid slice: end row {end} is before start row {start}")]
    InvalidSlice {
        /// First row
        start: usize,
        /// Exclusive end row
        end: usize,
    },

    /// Join is missing key columns
    #[error("join '{how}' requires key columns on both sides")]
    MissingJoinKeys {
        /// Join strategy name
        how: String,
    },

    /// Join strategy name not recognised
    #[error("invalid join type '{0}'. Allowed values: inner, left, right, full, semi, anti, cross")]
    UnknownJoinType(String),

    /// Input records were not a JSON array of objects
    #[error("invalid records: {0}")]
    InvalidRecords(String),

    /// The polars engine rejected a plan or failed while collecting it
    #[error("{0}")]
    Polars(String),
}

impl From<PolarsError> for FrameError {
    fn from(error: PolarsError) -> Self {
        Self::Polars(error.to_string())
    }
}

impl FrameError {
    /// Create column-not-found error
    pub fn column_not_found(column: impl Into<String>, available: Vec<String>) -> Self {
        Self::ColumnNotFound {
            column: column.into(),
            available,
        }
    }

    /// Create type mismatch error
    pub fn type_mismatch(context: impl Into<String>, expected: DataType, actual: DataType) -> Self {
        Self::TypeMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }
}

/// Result alias for table operations
pub type FrameResult<T> = Result<T, FrameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_not_found_lists_available() {
        let err = FrameError::column_not_found("y", vec!["x".to_string()]);
        assert_eq!(
            err.to_string(),
            "column 'y' not found. Available columns: [\"x\"]"
        );
    }

    #[test]
    fn polars_errors_keep_their_message() {
        let err: FrameError = PolarsError::ComputeError("strict conversion failed".into()).into();
        assert!(matches!(&err, FrameError::Polars(message) if message.contains("strict conversion failed")));
    }
}
