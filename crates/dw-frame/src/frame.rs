//! Eager table operations over polars frames

use crate::error::{FrameError, FrameResult};
use crate::lazy::LazyExt;
use crate::schema::Schema;
use crate::value::Value;
use indexmap::IndexMap;
use polars::prelude::{self as pl, col, DataFrame, Expr, IntoLazy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Join strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinType {
    /// Matching rows only
    Inner,
    /// Every left row
    Left,
    /// Every right row
    Right,
    /// Every row from both sides
    Full,
    /// Left rows with a match, left columns only
    Semi,
    /// Left rows without a match, left columns only
    Anti,
    /// Cartesian product
    Cross,
}

impl JoinType {
    /// Every strategy, in documentation order
    pub const ALL: [JoinType; 7] = [
        Self::Inner,
        Self::Left,
        Self::Right,
        Self::Full,
        Self::Semi,
        Self::Anti,
        Self::Cross,
    ];

    /// Lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inner => "inner",
            Self::Left => "left",
            Self::Right => "right",
            Self::Full => "full",
            Self::Semi => "semi",
            Self::Anti => "anti",
            Self::Cross => "cross",
        }
    }

    /// Polars strategy
    #[must_use]
    pub fn to_polars(self) -> pl::JoinType {
        match self {
            Self::Inner => pl::JoinType::Inner,
            Self::Left => pl::JoinType::Left,
            Self::Right => pl::JoinType::Right,
            Self::Full => pl::JoinType::Full,
            Self::Semi => pl::JoinType::Semi,
            Self::Anti => pl::JoinType::Anti,
            Self::Cross => pl::JoinType::Cross,
        }
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JoinType {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|how| how.as_str() == lowered)
            .ok_or_else(|| FrameError::UnknownJoinType(s.to_string()))
    }
}

/// How two tables are joined
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinSpec {
    /// Strategy
    pub how: JoinType,
    /// Key column of the left table (unused for cross joins)
    pub left_on: Option<String>,
    /// Key column of the right table (unused for cross joins)
    pub right_on: Option<String>,
}

impl JoinSpec {
    /// Keyed join
    #[must_use]
    pub fn on(how: JoinType, left_on: impl Into<String>, right_on: impl Into<String>) -> Self {
        Self {
            how,
            left_on: Some(left_on.into()),
            right_on: Some(right_on.into()),
        }
    }

    /// Cartesian product
    #[must_use]
    pub fn cross() -> Self {
        Self {
            how: JoinType::Cross,
            left_on: None,
            right_on: None,
        }
    }
}

fn offset_i64(offset: usize) -> i64 {
    i64::try_from(offset).unwrap_or(i64::MAX)
}

/// Table operations the workspace runs on eager polars frames
///
/// Column references are checked against the frame first so a missing
/// column reports [`FrameError::ColumnNotFound`] with the available names.
pub trait FrameExt {
    /// Logical schema
    fn table_schema(&self) -> Schema;

    /// Cells of one column
    ///
    /// # Errors
    /// Returns [`FrameError::ColumnNotFound`].
    fn values(&self, name: &str) -> FrameResult<Vec<Value>>;

    /// One row as column name to value
    fn record(&self, index: usize) -> Option<IndexMap<String, Value>>;

    /// Keep rows whose predicate is exactly `true`
    ///
    /// # Errors
    /// Propagates polars failures.
    fn filter_rows(&self, predicate: &Expr) -> FrameResult<DataFrame>;

    /// Rows `offset..offset + length`, clamped to the table
    fn slice_rows(&self, offset: usize, length: Option<usize>) -> DataFrame;

    /// Project columns in the given order
    ///
    /// # Errors
    /// Fails on unknown or repeated names.
    fn select_columns(&self, names: &[String]) -> FrameResult<DataFrame>;

    /// Add or replace a column computed from an expression
    ///
    /// # Errors
    /// Propagates polars failures (strict casts among them).
    fn with_expr_column(&self, name: &str, expr: &Expr) -> FrameResult<DataFrame>;

    /// Prepend a `0..height` integer column
    ///
    /// # Errors
    /// Returns [`FrameError::DuplicateColumn`] when the name is taken.
    fn with_index_column(&self, name: &str) -> FrameResult<DataFrame>;

    /// Stable sort on one column, nulls last in both directions
    ///
    /// # Errors
    /// Returns [`FrameError::ColumnNotFound`].
    fn sort_rows(&self, name: &str, descending: bool) -> FrameResult<DataFrame>;

    /// Distinct values of a column in first-seen order
    ///
    /// # Errors
    /// Returns [`FrameError::ColumnNotFound`].
    fn unique_values(&self, name: &str) -> FrameResult<Vec<Value>>;

    /// Join with another table
    ///
    /// Keys are coalesced; right-side names that collide get a `_right`
    /// suffix. `semi` and `anti` return left columns only.
    ///
    /// # Errors
    /// Fails on missing key columns, mismatched key types, or a keyed
    /// strategy without keys.
    fn join_on(&self, other: &DataFrame, spec: &JoinSpec) -> FrameResult<DataFrame>;
}

impl FrameExt for DataFrame {
    fn table_schema(&self) -> Schema {
        Schema::of_frame(self)
    }

    fn values(&self, name: &str) -> FrameResult<Vec<Value>> {
        self.table_schema().require(name)?;
        let series = self.column(name)?.as_materialized_series();
        (0..series.len())
            .map(|i| Ok(Value::from_any(&series.get(i)?)))
            .collect()
    }

    fn record(&self, index: usize) -> Option<IndexMap<String, Value>> {
        (index < self.height()).then(|| {
            self.get_columns()
                .iter()
                .map(|c| {
                    let cell = c
                        .as_materialized_series()
                        .get(index)
                        .map_or(Value::Null, |v| Value::from_any(&v));
                    (c.name().to_string(), cell)
                })
                .collect()
        })
    }

    fn filter_rows(&self, predicate: &Expr) -> FrameResult<DataFrame> {
        Ok(self.clone().lazy().filter(predicate.clone()).collect()?)
    }

    fn slice_rows(&self, offset: usize, length: Option<usize>) -> DataFrame {
        let height = self.height();
        let start = offset.min(height);
        let len = length.map_or(height - start, |len| len.min(height - start));
        self.slice(offset_i64(start), len)
    }

    fn select_columns(&self, names: &[String]) -> FrameResult<DataFrame> {
        let schema = self.table_schema();
        for name in names {
            schema.require(name)?;
        }
        Ok(self.select(names.iter().map(String::as_str))?)
    }

    fn with_expr_column(&self, name: &str, expr: &Expr) -> FrameResult<DataFrame> {
        Ok(self.clone().lazy().with_column(expr.clone().alias(name)).collect()?)
    }

    fn with_index_column(&self, name: &str) -> FrameResult<DataFrame> {
        Ok(self.clone().lazy().with_index_column(name)?.collect()?)
    }

    fn sort_rows(&self, name: &str, descending: bool) -> FrameResult<DataFrame> {
        self.table_schema().require(name)?;
        Ok(self.clone().lazy().sort_rows(name, descending).collect()?)
    }

    fn unique_values(&self, name: &str) -> FrameResult<Vec<Value>> {
        self.table_schema().require(name)?;
        let distinct = self
            .clone()
            .lazy()
            .select([col(name).unique_stable()])
            .collect()?;
        distinct.values(name)
    }

    fn join_on(&self, other: &DataFrame, spec: &JoinSpec) -> FrameResult<DataFrame> {
        Ok(self
            .clone()
            .lazy()
            .join_on(other.clone().lazy(), spec)?
            .collect()?)
    }
}
