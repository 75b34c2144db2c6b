//! Property tests for filter compilation

use dw_expr::{compile_filter, FilterCondition, FilterRequest};
use dw_frame::{DataFrame, FrameExt};
use polars::prelude::{Column, NamedFrom, Series};
use proptest::prelude::*;
use serde_json::json;

fn frame(xs: &[i64]) -> DataFrame {
    DataFrame::new(vec![Column::from(Series::new("x".into(), xs))]).unwrap()
}

fn height(df: &DataFrame, request: &FilterRequest) -> usize {
    let expr = compile_filter(request, &df.table_schema()).unwrap();
    df.filter_rows(&expr).unwrap().height()
}

proptest! {
    #[test]
    fn negation_partitions_non_null_rows(
        xs in prop::collection::vec(-100i64..100, 0..40),
        threshold in -100i64..100,
        op in prop::sample::select(vec!["eq", "ne", "gt", "gte", "lt", "lte"]),
    ) {
        let df = frame(&xs);
        let kept = height(&df, &FilterRequest::all(vec![
            FilterCondition::new("x", op, json!(threshold)),
        ]));
        let dropped = height(&df, &FilterRequest::all(vec![
            FilterCondition::new("x", op, json!(threshold)).with_negate(true),
        ]));
        prop_assert_eq!(kept + dropped, xs.len());
    }

    #[test]
    fn and_is_never_larger_than_or(
        xs in prop::collection::vec(-50i64..50, 0..40),
        low in -50i64..50,
        high in -50i64..50,
    ) {
        let df = frame(&xs);
        let conditions = vec![
            FilterCondition::new("x", "gte", json!(low)),
            FilterCondition::new("x", "lte", json!(high)),
        ];
        let and = height(&df, &FilterRequest::all(conditions.clone()));
        let or = height(&df, &FilterRequest::any(conditions));
        prop_assert!(and <= or);
    }

    #[test]
    fn closed_between_matches_two_conditions(
        xs in prop::collection::vec(-50i64..50, 0..40),
        start in -50i64..50,
        end in -50i64..50,
    ) {
        let df = frame(&xs);
        let between = height(&df, &FilterRequest::all(vec![
            FilterCondition::new("x", "between", json!({"start": start, "end": end})),
        ]));
        let expected = xs.iter().filter(|&&x| x >= start && x <= end).count();
        prop_assert_eq!(between, expected);
    }
}
