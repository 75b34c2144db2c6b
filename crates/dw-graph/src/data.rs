//! Node tables

use crate::error::GraphError;
use dw_frame::{
    DataFrame, DataType, DocDataFrame, DocLazyFrame, Expr, FrameExt, FrameResult, IntoLazy, JoinSpec,
    LazyExt, LazyFrame, Schema,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Representation of a node's table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Eager table
    #[serde(rename = "dataframe")]
    DataFrame,
    /// Deferred plan
    #[serde(rename = "lazyframe")]
    LazyFrame,
    /// Eager text-aware table
    #[serde(rename = "docdataframe")]
    DocDataFrame,
    /// Deferred text-aware plan
    #[serde(rename = "doclazyframe")]
    DocLazyFrame,
}

impl NodeKind {
    /// Display label
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DataFrame => "dataframe",
            Self::LazyFrame => "lazyframe",
            Self::DocDataFrame => "docdataframe",
            Self::DocLazyFrame => "doclazyframe",
        }
    }

    /// Deferred representation
    #[must_use]
    pub fn is_lazy(self) -> bool {
        matches!(self, Self::LazyFrame | Self::DocLazyFrame)
    }

    /// Text-aware representation
    #[must_use]
    pub fn is_document(self) -> bool {
        matches!(self, Self::DocDataFrame | Self::DocLazyFrame)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "dataframe" => Ok(Self::DataFrame),
            "lazyframe" => Ok(Self::LazyFrame),
            "docdataframe" => Ok(Self::DocDataFrame),
            "doclazyframe" => Ok(Self::DocLazyFrame),
            _ => Err(GraphError::UnknownKind(s.to_string())),
        }
    }
}

/// A node's table, in one of four representations
#[derive(Clone)]
pub enum NodeData {
    /// Eager table
    Frame(DataFrame),
    /// Deferred plan
    Lazy(LazyFrame),
    /// Eager text-aware table
    Doc(DocDataFrame),
    /// Deferred text-aware plan
    DocLazy(DocLazyFrame),
}

impl fmt::Debug for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frame(df) => f.debug_tuple("Frame").field(df).finish(),
            Self::Doc(doc) => f.debug_tuple("Doc").field(doc).finish(),
            Self::Lazy(_) => f.write_str("Lazy(..)"),
            Self::DocLazy(doc) => f.debug_tuple("DocLazy").field(doc).finish(),
        }
    }
}

impl From<DataFrame> for NodeData {
    fn from(frame: DataFrame) -> Self {
        Self::Frame(frame)
    }
}

impl From<LazyFrame> for NodeData {
    fn from(frame: LazyFrame) -> Self {
        Self::Lazy(frame)
    }
}

impl From<DocDataFrame> for NodeData {
    fn from(frame: DocDataFrame) -> Self {
        Self::Doc(frame)
    }
}

impl From<DocLazyFrame> for NodeData {
    fn from(frame: DocLazyFrame) -> Self {
        Self::DocLazy(frame)
    }
}

pub(crate) fn is_text(dtype: Option<DataType>) -> bool {
    dtype.is_some_and(DataType::is_text)
}

impl NodeData {
    /// Representation tag
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Frame(_) => NodeKind::DataFrame,
            Self::Lazy(_) => NodeKind::LazyFrame,
            Self::Doc(_) => NodeKind::DocDataFrame,
            Self::DocLazy(_) => NodeKind::DocLazyFrame,
        }
    }

    /// Deferred representation
    #[must_use]
    pub fn is_lazy(&self) -> bool {
        self.kind().is_lazy()
    }

    /// Designated text column of a text-aware table
    #[must_use]
    pub fn document_column(&self) -> Option<&str> {
        match self {
            Self::Doc(doc) => Some(doc.document_column()),
            Self::DocLazy(doc) => Some(doc.document_column()),
            Self::Frame(_) | Self::Lazy(_) => None,
        }
    }

    /// Column names and types; plans resolve theirs without reading rows
    ///
    /// # Errors
    /// Fails when a plan references missing columns.
    pub fn schema(&self) -> FrameResult<Schema> {
        match self {
            Self::Frame(df) => Ok(df.table_schema()),
            Self::Doc(doc) => Ok(doc.frame().table_schema()),
            Self::Lazy(lf) => lf.table_schema(),
            Self::DocLazy(doc) => doc.lazy().table_schema(),
        }
    }

    /// Materialized table
    ///
    /// # Errors
    /// Propagates plan failures.
    pub fn collect(&self) -> FrameResult<DataFrame> {
        match self {
            Self::Frame(df) => Ok(df.clone()),
            Self::Doc(doc) => Ok(doc.frame().clone()),
            Self::Lazy(lf) => Ok(lf.clone().collect()?),
            Self::DocLazy(doc) => Ok(doc.lazy().clone().collect()?),
        }
    }

    /// First `n` rows, materialized
    ///
    /// # Errors
    /// Propagates plan failures.
    pub fn head(&self, n: usize) -> FrameResult<DataFrame> {
        match self {
            Self::Frame(df) => Ok(df.slice_rows(0, Some(n))),
            Self::Doc(doc) => Ok(doc.frame().slice_rows(0, Some(n))),
            Self::Lazy(_) | Self::DocLazy(_) => Ok(self.to_lazy().slice_rows(0, Some(n)).collect()?),
        }
    }

    /// Deferred view of the table
    #[must_use]
    pub fn to_lazy(&self) -> LazyFrame {
        match self {
            Self::Frame(df) => df.clone().lazy(),
            Self::Doc(doc) => doc.frame().clone().lazy(),
            Self::Lazy(lf) => lf.clone(),
            Self::DocLazy(doc) => doc.lazy().clone(),
        }
    }

    /// Apply a transformation, keeping the representation
    ///
    /// Text-aware tables stay text-aware only while their document column
    /// survives as a text column; otherwise they degrade to the plain form.
    ///
    /// # Errors
    /// Propagates eager evaluation failures and plan schema failures.
    pub fn transform(
        &self,
        eager: impl FnOnce(&DataFrame) -> FrameResult<DataFrame>,
        lazy: impl FnOnce(LazyFrame) -> LazyFrame,
    ) -> FrameResult<Self> {
        Ok(match self {
            Self::Frame(df) => Self::Frame(eager(df)?),
            Self::Lazy(lf) => Self::Lazy(lazy(lf.clone())),
            Self::Doc(doc) => Self::eager_document(eager(doc.frame())?, doc.document_column())?,
            Self::DocLazy(doc) => Self::lazy_document(lazy(doc.lazy().clone()), doc.document_column())?,
        })
    }

    fn eager_document(frame: DataFrame, column: &str) -> FrameResult<Self> {
        if is_text(frame.table_schema().get(column)) {
            Ok(Self::Doc(DocDataFrame::new(frame, column)?))
        } else {
            warn!(column, "document column no longer text, dropping document designation");
            Ok(Self::Frame(frame))
        }
    }

    fn lazy_document(frame: LazyFrame, column: &str) -> FrameResult<Self> {
        if is_text(frame.table_schema()?.get(column)) {
            Ok(Self::DocLazy(DocLazyFrame::new(frame, column)?))
        } else {
            warn!(column, "document column no longer text, dropping document designation");
            Ok(Self::Lazy(frame))
        }
    }

    /// Keep rows matching a predicate
    ///
    /// # Errors
    /// Propagates evaluation failures.
    pub fn filter(&self, predicate: &Expr) -> FrameResult<Self> {
        self.transform(|df| df.filter_rows(predicate), |lf| lf.filter(predicate.clone()))
    }

    /// Row range and optional projection
    ///
    /// # Errors
    /// Fails on unknown columns.
    pub fn slice(&self, offset: usize, length: Option<usize>, columns: Option<&[String]>) -> FrameResult<Self> {
        self.transform(
            |df| {
                let rows = df.slice_rows(offset, length);
                match columns {
                    Some(names) => FrameExt::select_columns(&rows, names),
                    None => Ok(rows),
                }
            },
            |lf| {
                let rows = lf.slice_rows(offset, length);
                match columns {
                    Some(names) => rows.select_columns(names),
                    None => rows,
                }
            },
        )
    }

    /// Join with another node's table
    ///
    /// A deferred left side stays deferred; every other combination is
    /// evaluated eagerly.
    ///
    /// # Errors
    /// Propagates join failures.
    pub fn join(&self, other: &Self, spec: &JoinSpec) -> FrameResult<Self> {
        if self.is_lazy() {
            let plan = self.to_lazy().join_on(other.to_lazy(), spec)?;
            plan.table_schema()?;
            return Ok(match self.document_column() {
                Some(column) => Self::lazy_document(plan, column)?,
                None => Self::Lazy(plan),
            });
        }
        let right = other.collect()?;
        self.transform(|df| df.join_on(&right, spec), |lf| lf)
    }

    /// Add or replace a column
    ///
    /// # Errors
    /// Propagates evaluation failures.
    pub fn with_column(&self, name: &str, expr: &Expr) -> FrameResult<Self> {
        self.transform(
            |df| df.with_expr_column(name, expr),
            |lf| lf.with_column(expr.clone().alias(name)),
        )
    }

    /// Row count; plans are collected
    ///
    /// # Errors
    /// Propagates plan failures.
    pub fn height(&self) -> FrameResult<usize> {
        match self {
            Self::Frame(df) => Ok(df.height()),
            Self::Doc(doc) => Ok(doc.frame().height()),
            Self::Lazy(_) | Self::DocLazy(_) => Ok(self.collect()?.height()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dw_frame::{col, lit, Value};
    use polars::df;
    use polars::prelude::DataType as PolarsType;

    fn doc() -> NodeData {
        let df = df!("text" => &["a b", "c d"], "n" => &[1i64, 2]).unwrap();
        NodeData::Doc(DocDataFrame::new(df, "text").unwrap())
    }

    #[test]
    fn kind_labels_parse_loosely() {
        assert_eq!("doc-dataframe".parse::<NodeKind>().unwrap(), NodeKind::DocDataFrame);
        assert_eq!("LazyFrame".parse::<NodeKind>().unwrap(), NodeKind::LazyFrame);
        assert!("table".parse::<NodeKind>().is_err());
        assert_eq!(serde_json::to_string(&NodeKind::DocLazyFrame).unwrap(), "\"doclazyframe\"");
    }

    #[test]
    fn filter_keeps_document_designation() {
        let filtered = doc().filter(&col("n").gt(lit(1))).unwrap();
        assert_eq!(filtered.kind(), NodeKind::DocDataFrame);
        assert_eq!(filtered.document_column(), Some("text"));
        assert_eq!(filtered.height().unwrap(), 1);
    }

    #[test]
    fn projection_without_document_column_degrades() {
        let sliced = doc().slice(0, None, Some(&["n".to_string()])).unwrap();
        assert_eq!(sliced.kind(), NodeKind::DataFrame);
    }

    #[test]
    fn lazy_transforms_stay_deferred() {
        let lazy = NodeData::Lazy(doc().to_lazy());
        let out = lazy.with_column("m", &col("n").cast(PolarsType::Float64)).unwrap();
        assert!(out.is_lazy());
        assert_eq!(out.schema().unwrap().get("m"), Some(DataType::Float));
        assert_eq!(out.head(1).unwrap().values("m").unwrap(), vec![Value::Float(1.0)]);
    }
}
