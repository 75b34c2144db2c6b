//! Text-aware tables
//!
//! A document table is an ordinary polars frame or plan plus the name of the
//! text column that text analytics (concordance, frequency) operate on. The
//! column must exist and hold text.

use crate::error::{FrameError, FrameResult};
use crate::frame::FrameExt;
use crate::lazy::LazyExt;
use crate::schema::Schema;
use crate::value::{DataType, Value};
use polars::prelude::{DataFrame, LazyFrame};
use std::fmt;

fn check_document_column(schema: &Schema, column: &str) -> FrameResult<()> {
    let dtype = schema.require(column)?;
    if dtype.is_text() {
        Ok(())
    } else {
        Err(FrameError::type_mismatch(
            format!("document column '{column}'"),
            DataType::String,
            dtype,
        ))
    }
}

/// Eager document table
#[derive(Debug, Clone)]
pub struct DocDataFrame {
    frame: DataFrame,
    document_column: String,
}

impl DocDataFrame {
    /// Wrap a frame, designating its text column
    ///
    /// # Errors
    /// Fails when the column is missing or not text.
    pub fn new(frame: DataFrame, document_column: impl Into<String>) -> FrameResult<Self> {
        let document_column = document_column.into();
        check_document_column(&frame.table_schema(), &document_column)?;
        Ok(Self {
            frame,
            document_column,
        })
    }

    /// Underlying frame
    #[inline]
    #[must_use]
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Unwrap into the plain frame
    #[must_use]
    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    /// Name of the text column
    #[inline]
    #[must_use]
    pub fn document_column(&self) -> &str {
        &self.document_column
    }

    /// Cells of the document column
    ///
    /// # Errors
    /// Propagates polars failures.
    pub fn documents(&self) -> FrameResult<Vec<Value>> {
        self.frame.values(&self.document_column)
    }

    /// Same frame, different text column
    ///
    /// # Errors
    /// Fails when the column is missing or not text.
    pub fn with_document_column(&self, column: impl Into<String>) -> FrameResult<Self> {
        Self::new(self.frame.clone(), column)
    }
}

/// Deferred document table
#[derive(Clone)]
pub struct DocLazyFrame {
    frame: LazyFrame,
    document_column: String,
}

impl fmt::Debug for DocLazyFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocLazyFrame")
            .field("document_column", &self.document_column)
            .finish_non_exhaustive()
    }
}

impl DocLazyFrame {
    /// Wrap a plan, designating its text column
    ///
    /// # Errors
    /// Fails when the plan's schema lacks the column or it is not text.
    pub fn new(frame: LazyFrame, document_column: impl Into<String>) -> FrameResult<Self> {
        let document_column = document_column.into();
        check_document_column(&frame.table_schema()?, &document_column)?;
        Ok(Self {
            frame,
            document_column,
        })
    }

    /// Underlying plan
    #[inline]
    #[must_use]
    pub fn lazy(&self) -> &LazyFrame {
        &self.frame
    }

    /// Unwrap into the plain plan
    #[must_use]
    pub fn into_lazy(self) -> LazyFrame {
        self.frame
    }

    /// Name of the text column
    #[inline]
    #[must_use]
    pub fn document_column(&self) -> &str {
        &self.document_column
    }

    /// Run the plan, keeping the text column designation
    ///
    /// # Errors
    /// Propagates plan failures.
    pub fn collect(&self) -> FrameResult<DocDataFrame> {
        DocDataFrame::new(self.frame.clone().collect()?, self.document_column.clone())
    }

    /// Same plan, different text column
    ///
    /// # Errors
    /// Fails when the column is missing or not text.
    pub fn with_document_column(&self, column: impl Into<String>) -> FrameResult<Self> {
        Self::new(self.frame.clone(), column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;
    use polars::prelude::{col, lit, IntoLazy};

    fn table() -> DataFrame {
        df!("text" => &["hello world", "second"], "n" => &[1i64, 2]).unwrap()
    }

    #[test]
    fn document_column_must_be_text() {
        assert!(DocDataFrame::new(table(), "text").is_ok());
        assert!(matches!(
            DocDataFrame::new(table(), "n"),
            Err(FrameError::TypeMismatch { .. })
        ));
        assert!(matches!(
            DocDataFrame::new(table(), "missing"),
            Err(FrameError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn lazy_collect_keeps_designation() {
        let plan = table().lazy().filter(col("n").lt(lit(2)));
        let lazy = DocLazyFrame::new(plan, "text").unwrap();
        let eager = lazy.collect().unwrap();
        assert_eq!(eager.document_column(), "text");
        assert_eq!(eager.documents().unwrap(), vec![Value::from("hello world")]);
    }

    #[test]
    fn lazy_designation_is_checked_against_the_plan() {
        let plan = table().lazy().select([col("n")]);
        assert!(matches!(
            DocLazyFrame::new(plan, "text"),
            Err(FrameError::ColumnNotFound { .. })
        ));
    }
}
