//! Deferred table operations over polars plans
//!
//! Plans are only checked when their schema is resolved or they are
//! collected; [`LazyExt::table_schema`] resolves without reading rows.

use crate::error::{FrameError, FrameResult};
use crate::frame::{JoinSpec, JoinType};
use crate::schema::Schema;
use polars::prelude::{col, DataType, IdxSize, JoinArgs, JoinCoalesce, LazyFrame, SortMultipleOptions};

/// Scratch column carrying the left row order through a keyed join
const LEFT_ORDER: &str = "__dw_left_order";

/// Plan-building counterparts of [`crate::FrameExt`]
pub trait LazyExt: Sized {
    /// Resolve the logical schema of the plan
    ///
    /// # Errors
    /// Fails when the plan references missing columns.
    fn table_schema(&self) -> FrameResult<Schema>;

    /// Rows `offset..offset + length`
    #[must_use]
    fn slice_rows(self, offset: usize, length: Option<usize>) -> Self;

    /// Project columns in the given order
    #[must_use]
    fn select_columns(self, names: &[String]) -> Self;

    /// Prepend a `0..height` integer column
    ///
    /// # Errors
    /// Returns [`FrameError::DuplicateColumn`] when the name is taken.
    fn with_index_column(self, name: &str) -> FrameResult<Self>;

    /// Stable sort on one column, nulls last in both directions
    #[must_use]
    fn sort_rows(self, name: &str, descending: bool) -> Self;

    /// Join with another plan
    ///
    /// Keyed joins keep the left side's row order.
    ///
    /// # Errors
    /// Returns [`FrameError::MissingJoinKeys`] for a keyed strategy without keys.
    fn join_on(self, other: Self, spec: &JoinSpec) -> FrameResult<Self>;
}

impl LazyExt for LazyFrame {
    fn table_schema(&self) -> FrameResult<Schema> {
        let resolved = self.clone().collect_schema()?;
        Ok(Schema::from_polars(&resolved))
    }

    fn slice_rows(self, offset: usize, length: Option<usize>) -> Self {
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        let length = length.map_or(IdxSize::MAX, |len| IdxSize::try_from(len).unwrap_or(IdxSize::MAX));
        self.slice(offset, length)
    }

    fn select_columns(self, names: &[String]) -> Self {
        self.select(names.iter().map(|name| col(name.as_str())).collect::<Vec<_>>())
    }

    fn with_index_column(self, name: &str) -> FrameResult<Self> {
        if self.table_schema()?.contains(name) {
            return Err(FrameError::DuplicateColumn(name.to_string()));
        }
        Ok(self
            .with_row_index(name, None)
            .with_column(col(name).cast(DataType::Int64)))
    }

    fn sort_rows(self, name: &str, descending: bool) -> Self {
        let options = SortMultipleOptions::default()
            .with_order_descending(descending)
            .with_nulls_last(true)
            .with_maintain_order(true);
        self.sort_by_exprs([col(name)], options)
    }

    fn join_on(self, other: Self, spec: &JoinSpec) -> FrameResult<Self> {
        if spec.how == JoinType::Cross {
            return Ok(self.cross_join(other, None));
        }
        let (Some(left_on), Some(right_on)) = (spec.left_on.as_deref(), spec.right_on.as_deref()) else {
            return Err(FrameError::MissingJoinKeys {
                how: spec.how.to_string(),
            });
        };
        let args = JoinArgs::new(spec.how.to_polars()).with_coalesce(JoinCoalesce::CoalesceColumns);
        let order = SortMultipleOptions::default()
            .with_nulls_last(true)
            .with_maintain_order(true);
        Ok(self
            .with_row_index(LEFT_ORDER, None)
            .join(other, [col(left_on)], [col(right_on)], args)
            .sort_by_exprs([col(LEFT_ORDER)], order)
            .select([col("*").exclude([LEFT_ORDER])]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameExt;
    use crate::value::{DataType as Logical, Value};
    use polars::df;
    use polars::prelude::IntoLazy;

    #[test]
    fn schema_resolves_without_collecting() {
        let lf = df!("x" => &[1i64, 2]).unwrap().lazy().with_index_column("i").unwrap();
        let schema = lf.table_schema().unwrap();
        assert_eq!(schema.names(), vec!["i", "x"]);
        assert_eq!(schema.get("i"), Some(Logical::Integer));
    }

    #[test]
    fn missing_columns_surface_at_resolution() {
        let lf = df!("x" => &[1i64]).unwrap().lazy().select_columns(&["y".to_string()]);
        assert!(matches!(lf.table_schema(), Err(FrameError::Polars(_))));
    }

    #[test]
    fn open_ended_slice_runs_to_the_end() {
        let lf = df!("x" => &[1i64, 2, 3, 4]).unwrap().lazy();
        let tail = lf.slice_rows(1, None).collect().unwrap();
        assert_eq!(
            tail.values("x").unwrap(),
            vec![Value::Int(2), Value::Int(3), Value::Int(4)]
        );
    }

    #[test]
    fn left_join_keeps_left_order() {
        let left = df!("k" => &[3i64, 1, 2, 1]).unwrap().lazy();
        let right = df!("k" => &[1i64, 2, 3], "v" => &["a", "b", "c"]).unwrap().lazy();
        let joined = left
            .join_on(right, &JoinSpec::on(JoinType::Left, "k", "k"))
            .unwrap()
            .collect()
            .unwrap();
        assert_eq!(joined.table_schema().names(), vec!["k", "v"]);
        assert_eq!(
            joined.values("v").unwrap(),
            vec![Value::from("c"), Value::from("a"), Value::from("b"), Value::from("a")]
        );
    }
}
