//! Testing utilities for DocWorkspace
//!
//! Shared tables for the crates' test suites.

#![allow(missing_docs)]

use dw_frame::{DataFrame, DocDataFrame};
use polars::prelude::{Column, NamedFrom, Series};

pub fn int_column(name: &str, values: &[i64]) -> Column {
    Column::from(Series::new(name.into(), values))
}

pub fn str_column(name: &str, values: &[&str]) -> Column {
    Column::from(Series::new(name.into(), values))
}

pub fn frame(columns: Vec<Column>) -> DataFrame {
    DataFrame::new(columns).unwrap()
}

/// `x` = 1..=10, `label` = "row1".."row10"
pub fn numbers() -> DataFrame {
    let xs: Vec<i64> = (1..=10).collect();
    let labels: Vec<String> = xs.iter().map(|x| format!("row{x}")).collect();
    let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
    frame(vec![int_column("x", &xs), str_column("label", &labels)])
}

/// Three short documents with an `author` and a `year`
pub fn corpus() -> DataFrame {
    frame(vec![
        str_column(
            "text",
            &[
                "The cat sat on the mat",
                "A dog chased the Cat home",
                "No animals here at all",
            ],
        ),
        str_column("author", &["ann", "bob", "cy"]),
        int_column("year", &[2001, 2002, 2003]),
    ])
}

pub fn corpus_document() -> DocDataFrame {
    DocDataFrame::new(corpus(), "text").unwrap()
}
