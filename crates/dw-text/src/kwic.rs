//! Built-in keyword-in-context search

use crate::analytics::{ConcordanceParams, TextAnalytics};
use crate::error::TextError;
use crate::tokenize::{tokenize, Token};
use dw_frame::{DataFrame, DataType, FrameError, FrameExt, Schema};
use polars::prelude::{Column, NamedFrom, Series};
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use tracing::debug;

/// Keyword-in-context analyzer
///
/// Matches whole tokens: a literal search word must equal the token, a
/// regex must match the entire token.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordInContext;

impl KeywordInContext {
    /// Create analyzer
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

enum Matcher {
    Literal { needle: String, case_sensitive: bool },
    Pattern(Regex),
}

impl Matcher {
    fn build(params: &ConcordanceParams) -> Result<Self, TextError> {
        let word = params.search_word.trim();
        if word.is_empty() {
            return Err(TextError::EmptySearch);
        }
        if params.regex {
            let regex = RegexBuilder::new(&format!("^(?:{word})$"))
                .case_insensitive(!params.case_sensitive)
                .build()
                .map_err(|e| TextError::InvalidPattern {
                    pattern: word.to_string(),
                    message: e.to_string(),
                })?;
            return Ok(Self::Pattern(regex));
        }
        let needle = if params.case_sensitive {
            word.to_string()
        } else {
            word.to_lowercase()
        };
        Ok(Self::Literal {
            needle,
            case_sensitive: params.case_sensitive,
        })
    }

    fn is_match(&self, token: &str) -> bool {
        match self {
            Self::Literal {
                needle,
                case_sensitive: true,
            } => token == needle,
            Self::Literal { needle, .. } => token.to_lowercase() == *needle,
            Self::Pattern(regex) => regex.is_match(token),
        }
    }
}

struct Hit {
    document: usize,
    left: String,
    matched: String,
    right: String,
    l1: Option<String>,
    r1: Option<String>,
}

fn join(tokens: &[Token<'_>]) -> String {
    tokens.iter().map(|t| t.text).collect::<Vec<_>>().join(" ")
}

fn neighbour_counts(keys: impl Iterator<Item = Option<String>>) -> HashMap<String, i64> {
    let mut counts = HashMap::new();
    for key in keys.flatten() {
        *counts.entry(key).or_default() += 1;
    }
    counts
}

impl TextAnalytics for KeywordInContext {
    fn guess_document_column(&self, schema: &Schema, sample: &DataFrame) -> Option<String> {
        let mut best: Option<(String, f64)> = None;
        for (name, dtype) in schema.iter() {
            if dtype != DataType::String {
                continue;
            }
            let Ok(cells) = sample.values(name) else {
                continue;
            };
            let lengths: Vec<usize> = cells
                .iter()
                .filter_map(|v| v.as_str().map(|s| s.chars().count()))
                .collect();
            if lengths.is_empty() {
                continue;
            }
            #[allow(clippy::cast_precision_loss)]
            let average = lengths.iter().sum::<usize>() as f64 / lengths.len() as f64;
            if best.as_ref().map_or(true, |(_, b)| average > *b) {
                best = Some((name.to_string(), average));
            }
        }
        best.filter(|(_, avg)| *avg > 0.0).map(|(name, _)| name)
    }

    fn concordance(
        &self,
        frame: &DataFrame,
        column: &str,
        params: &ConcordanceParams,
    ) -> Result<DataFrame, TextError> {
        let dtype = frame.table_schema().require(column)?;
        if !dtype.is_text() {
            return Err(TextError::NotText {
                column: column.to_string(),
                dtype,
            });
        }
        let source = frame.values(column)?;
        let matcher = Matcher::build(params)?;
        let fold = |s: &str| {
            if params.case_sensitive {
                s.to_string()
            } else {
                s.to_lowercase()
            }
        };

        let mut hits = Vec::new();
        for (document, value) in source.iter().enumerate() {
            let Some(text) = value.as_str() else {
                continue;
            };
            let tokens = tokenize(text);
            for (i, token) in tokens.iter().enumerate() {
                if !matcher.is_match(token.text) {
                    continue;
                }
                let left_start = i.saturating_sub(params.num_left_tokens);
                let right_end = (i + 1 + params.num_right_tokens).min(tokens.len());
                hits.push(Hit {
                    document,
                    left: join(&tokens[left_start..i]),
                    matched: token.text.to_string(),
                    right: join(&tokens[i + 1..right_end]),
                    l1: i.checked_sub(1).map(|j| tokens[j].text.to_string()),
                    r1: tokens.get(i + 1).map(|t| t.text.to_string()),
                });
            }
        }

        let l1_counts = neighbour_counts(hits.iter().map(|h| h.l1.as_deref().map(fold)));
        let r1_counts = neighbour_counts(hits.iter().map(|h| h.r1.as_deref().map(fold)));
        let freq = |counts: &HashMap<String, i64>, key: Option<&str>| {
            key.and_then(|k| counts.get(&fold(k)).copied())
        };

        let text_column = |name: &str, f: &dyn Fn(&Hit) -> Option<String>| {
            Column::from(Series::new(name.into(), hits.iter().map(f).collect::<Vec<_>>()))
        };
        let int_column = |name: &str, f: &dyn Fn(&Hit) -> Option<i64>| {
            Column::from(Series::new(name.into(), hits.iter().map(f).collect::<Vec<_>>()))
        };

        let result = DataFrame::new(vec![
            int_column("document_idx", &|h| i64::try_from(h.document).ok()),
            text_column("left_context", &|h| Some(h.left.clone())),
            text_column("matched_text", &|h| Some(h.matched.clone())),
            text_column("right_context", &|h| Some(h.right.clone())),
            text_column("l1", &|h| h.l1.clone()),
            text_column("r1", &|h| h.r1.clone()),
            int_column("l1_freq", &|h| freq(&l1_counts, h.l1.as_deref())),
            int_column("r1_freq", &|h| freq(&r1_counts, h.r1.as_deref())),
        ])
        .map_err(FrameError::from)?;
        debug!(column, search = %params.search_word, matches = result.height(), "concordance computed");
        Ok(result)
    }

    fn name(&self) -> &'static str {
        "keyword_in_context"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::CONCORDANCE_COLUMNS;
    use dw_frame::Value;
    use polars::df;
    use pretty_assertions::assert_eq;

    fn corpus() -> DataFrame {
        df!(
            "text" => &[
                Some("The cat sat on the mat."),
                None,
                Some("A black cat, a white Cat and the dog"),
            ],
            "id" => &[10i64, 11, 12]
        )
        .unwrap()
    }

    fn strings(df: &DataFrame, name: &str) -> Vec<Option<String>> {
        df.values(name)
            .unwrap()
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect()
    }

    #[test]
    fn finds_tokens_with_context() {
        let params = ConcordanceParams::new("cat").with_window(2, 2);
        let result = KeywordInContext.concordance(&corpus(), "text", &params).unwrap();
        assert_eq!(result.table_schema().names(), CONCORDANCE_COLUMNS.map(String::from).to_vec());
        assert_eq!(result.height(), 3);
        assert_eq!(
            result.values("document_idx").unwrap(),
            vec![Value::Int(0), Value::Int(2), Value::Int(2)]
        );
        assert_eq!(
            strings(&result, "left_context"),
            vec![Some("The".into()), Some("A black".into()), Some("a white".into())]
        );
        assert_eq!(
            strings(&result, "right_context"),
            vec![Some("sat on".into()), Some("a white".into()), Some("and the".into())]
        );
        assert_eq!(
            strings(&result, "matched_text"),
            vec![Some("cat".into()), Some("cat".into()), Some("Cat".into())]
        );
    }

    #[test]
    fn case_sensitive_skips_other_casing() {
        let params = ConcordanceParams::new("Cat").with_case_sensitive(true);
        let result = KeywordInContext.concordance(&corpus(), "text", &params).unwrap();
        assert_eq!(result.height(), 1);
        assert_eq!(strings(&result, "r1"), vec![Some("and".into())]);
    }

    #[test]
    fn neighbour_frequencies_fold_case() {
        let df = df!("text" => &["the fox and The fox", "fox"]).unwrap();
        let result = KeywordInContext
            .concordance(&df, "text", &ConcordanceParams::new("fox"))
            .unwrap();
        assert_eq!(
            result.values("l1_freq").unwrap(),
            vec![Value::Int(2), Value::Int(2), Value::Null]
        );
        assert_eq!(strings(&result, "l1")[2], None);
    }

    #[test]
    fn regex_matches_whole_tokens() {
        let params = ConcordanceParams::new("c.t").with_regex(true);
        let result = KeywordInContext.concordance(&corpus(), "text", &params).unwrap();
        assert_eq!(result.height(), 3);

        let partial = ConcordanceParams::new("ca").with_regex(true);
        assert_eq!(KeywordInContext.concordance(&corpus(), "text", &partial).unwrap().height(), 0);

        let broken = ConcordanceParams::new("(").with_regex(true);
        assert!(matches!(
            KeywordInContext.concordance(&corpus(), "text", &broken),
            Err(TextError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn rejects_non_text_and_empty_search() {
        assert!(matches!(
            KeywordInContext.concordance(&corpus(), "id", &ConcordanceParams::new("x")),
            Err(TextError::NotText { .. })
        ));
        assert_eq!(
            KeywordInContext
                .concordance(&corpus(), "text", &ConcordanceParams::new("  "))
                .unwrap_err(),
            TextError::EmptySearch
        );
    }

    #[test]
    fn no_matches_keeps_typed_columns() {
        let result = KeywordInContext
            .concordance(&corpus(), "text", &ConcordanceParams::new("zebra"))
            .unwrap();
        assert_eq!(result.height(), 0);
        assert_eq!(result.table_schema().get("l1_freq"), Some(DataType::Integer));
        assert_eq!(result.table_schema().get("l1"), Some(DataType::String));
    }

    #[test]
    fn guesses_longest_text_column() {
        let df = df!(
            "title" => &["short", "tiny"],
            "notes" => &[Some("a much longer passage"), None],
            "n" => &[1i64, 2]
        )
        .unwrap();
        assert_eq!(
            KeywordInContext.guess_document_column(&df.table_schema(), &df),
            Some("notes".to_string())
        );
    }
}
