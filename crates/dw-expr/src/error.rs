//! Compilation errors

use dw_frame::{DataType, FrameError};

/// Errors raised while compiling a filter or cast
///
/// Every variant is a client-side validation failure: it is raised before
/// any node data is read or replaced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    /// Condition or cast names a column absent from the schema
    #[error("column '{column}' not found. Available columns: {available:?}")]
    UnknownColumn {
        /// Requested column
        column: String,
        /// Columns in the schema
        available: Vec<String>,
    },

    /// Text operator applied to a non-text column
    #[error("operator '{operator}' requires a string column, but '{column}' is {dtype}")]
    NotText {
        /// Operator name
        operator: String,
        /// Column name
        column: String,
        /// Column type
        dtype: DataType,
    },

    /// `contains` with `regex=true` and an invalid pattern
    #[error("invalid regex '{pattern}' for column '{column}': {message}")]
    InvalidRegex {
        /// Column name
        column: String,
        /// Pattern as supplied
        pattern: String,
        /// Compiler diagnostic
        message: String,
    },

    /// A filter request with nothing to evaluate
    #[error("filter request has no conditions")]
    EmptyFilter,

    /// Target type outside the supported set
    #[error("Casting to '{0}' is not yet supported. Supported: string, integer, float, datetime.")]
    UnsupportedTarget(String),

    /// Datetime format string with an unknown specifier
    #[error("invalid datetime format '{0}'")]
    InvalidFormat(String),

    /// The compiled cast failed on the validation sample
    #[error("Sample validation failed when casting column '{column}' to {target}: {source}")]
    SampleValidation {
        /// Column being cast
        column: String,
        /// Requested target
        target: String,
        /// Underlying evaluation failure
        #[source]
        source: FrameError,
    },
}

impl CompileError {
    pub(crate) fn unknown_column(column: &str, available: Vec<String>) -> Self {
        Self::UnknownColumn {
            column: column.to_string(),
            available,
        }
    }
}
