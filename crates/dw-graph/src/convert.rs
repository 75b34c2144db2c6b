//! Representation conversion and document-column detection

use crate::data::{is_text, NodeData, NodeKind};
use crate::error::GraphError;
use dw_frame::{DataFrame, DataType, DocDataFrame, DocLazyFrame, FrameError, Schema};
use tracing::debug;

/// Column names tried, in order, when a document column must be detected
pub const DOCUMENT_COLUMN_PREFERENCES: [&str; 5] = ["document", "text", "content", "body", "message"];

/// Rows handed to the fallback guesser
const GUESS_SAMPLE_ROWS: usize = 100;

/// Pick the document column for a table
///
/// Resolution order: the explicit column, the table's current document
/// column, [`DOCUMENT_COLUMN_PREFERENCES`] (exact name first, then
/// case-insensitive), then `guess` over a sample of rows. Only text columns
/// qualify.
///
/// # Errors
/// An explicit column that is missing or not text fails with a frame
/// error; nothing detected fails with
/// [`GraphError::DocumentColumnUndetected`].
pub fn resolve_document_column(
    data: &NodeData,
    explicit: Option<&str>,
    guess: impl FnOnce(&Schema, &DataFrame) -> Option<String>,
) -> Result<String, GraphError> {
    let schema = data.schema()?;

    if let Some(column) = explicit {
        let dtype = schema.require(column)?;
        if !is_text(Some(dtype)) {
            let context = format!("document column '{column}'");
            return Err(FrameError::type_mismatch(context, DataType::String, dtype).into());
        }
        return Ok(column.to_string());
    }

    if let Some(current) = data.document_column() {
        if is_text(schema.get(current)) {
            return Ok(current.to_string());
        }
    }

    let text_columns: Vec<&str> = schema
        .iter()
        .filter(|(_, dtype)| is_text(Some(*dtype)))
        .map(|(name, _)| name)
        .collect();
    for preferred in DOCUMENT_COLUMN_PREFERENCES {
        if let Some(name) = text_columns.iter().find(|n| **n == preferred) {
            return Ok((*name).to_string());
        }
    }
    for preferred in DOCUMENT_COLUMN_PREFERENCES {
        if let Some(name) = text_columns.iter().find(|n| n.eq_ignore_ascii_case(preferred)) {
            return Ok((*name).to_string());
        }
    }

    let sample = data.head(GUESS_SAMPLE_ROWS)?;
    if let Some(guessed) = guess(&schema, &sample) {
        if is_text(schema.get(&guessed)) {
            debug!(column = %guessed, "document column guessed");
            return Ok(guessed);
        }
    }

    Err(GraphError::DocumentColumnUndetected {
        available: schema.names(),
    })
}

/// Convert a table to another representation
///
/// Leaving a deferred representation for an eager one collects the plan.
/// Text-aware targets need a document column, resolved with
/// [`resolve_document_column`].
///
/// # Errors
/// Propagates plan failures and document-column resolution failures.
pub fn convert(
    data: &NodeData,
    target: NodeKind,
    document_column: Option<&str>,
    guess: impl FnOnce(&Schema, &DataFrame) -> Option<String>,
) -> Result<NodeData, GraphError> {
    let converted = match target {
        NodeKind::DataFrame => NodeData::Frame(data.collect()?),
        NodeKind::LazyFrame => NodeData::Lazy(data.to_lazy()),
        NodeKind::DocDataFrame => {
            let column = resolve_document_column(data, document_column, guess)?;
            NodeData::Doc(DocDataFrame::new(data.collect()?, column)?)
        }
        NodeKind::DocLazyFrame => {
            let column = resolve_document_column(data, document_column, guess)?;
            NodeData::DocLazy(DocLazyFrame::new(data.to_lazy(), column)?)
        }
    };
    debug!(from = %data.kind(), to = %target, "node data converted");
    Ok(converted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dw_frame::{IntoLazy, LazyExt};
    use polars::prelude::{Column, NamedFrom, Series};

    fn frame(names: &[&str]) -> NodeData {
        let columns = names
            .iter()
            .map(|n| Column::from(Series::new((*n).into(), &["some words", "more"])))
            .chain(std::iter::once(Column::from(Series::new("n".into(), &[1i64, 2]))))
            .collect();
        NodeData::Frame(DataFrame::new(columns).unwrap())
    }

    fn no_guess(_: &Schema, _: &DataFrame) -> Option<String> {
        None
    }

    #[test]
    fn preference_list_wins_over_guess() {
        let data = frame(&["title", "Body", "text"]);
        let column = resolve_document_column(&data, None, |_, _| Some("title".into())).unwrap();
        assert_eq!(column, "text");
    }

    #[test]
    fn preference_list_matches_case_insensitively() {
        let data = frame(&["title", "Body"]);
        assert_eq!(resolve_document_column(&data, None, no_guess).unwrap(), "Body");
    }

    #[test]
    fn guess_is_consulted_last() {
        let data = frame(&["title"]);
        let column = resolve_document_column(&data, None, |schema, sample| {
            assert!(schema.contains("title"));
            assert_eq!(sample.height(), 2);
            Some("title".into())
        })
        .unwrap();
        assert_eq!(column, "title");
    }

    #[test]
    fn undetected_lists_columns() {
        let data = frame(&["title"]);
        assert_eq!(
            resolve_document_column(&data, None, no_guess).unwrap_err(),
            GraphError::DocumentColumnUndetected {
                available: vec!["title".into(), "n".into()]
            }
        );
    }

    #[test]
    fn explicit_column_must_be_text() {
        let data = frame(&["text"]);
        assert!(matches!(
            resolve_document_column(&data, Some("n"), no_guess),
            Err(GraphError::Frame(FrameError::TypeMismatch { actual: DataType::Integer, .. }))
        ));
        assert!(matches!(
            resolve_document_column(&data, Some("missing"), no_guess),
            Err(GraphError::Frame(FrameError::ColumnNotFound { .. }))
        ));
    }

    #[test]
    fn converting_out_of_lazy_materializes() {
        let lazy = NodeData::Lazy(frame(&["text"]).collect().unwrap().lazy().slice_rows(0, Some(1)));
        let eager = convert(&lazy, NodeKind::DataFrame, None, no_guess).unwrap();
        assert_eq!(eager.kind(), NodeKind::DataFrame);
        assert_eq!(eager.height().unwrap(), 1);

        let doc = convert(&lazy, NodeKind::DocLazyFrame, None, no_guess).unwrap();
        assert_eq!(doc.kind(), NodeKind::DocLazyFrame);
        assert_eq!(doc.document_column(), Some("text"));
    }
}
