//! Text analytics errors

use dw_frame::{DataType, FrameError};

/// Errors raised by text analytics
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TextError {
    /// Column is not a text column
    #[error("column '{column}' is not a text column (found {dtype})")]
    NotText {
        /// Requested column
        column: String,
        /// Actual type
        dtype: DataType,
    },

    /// Search term is empty
    #[error("search word must not be empty")]
    EmptySearch,

    /// Search pattern failed to compile
    #[error("invalid search pattern '{pattern}': {message}")]
    InvalidPattern {
        /// Pattern as supplied
        pattern: String,
        /// Compiler diagnostic
        message: String,
    },

    /// Table operation failed
    #[error(transparent)]
    Frame(#[from] FrameError),
}
