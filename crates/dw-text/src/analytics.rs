//! Text analytics seam

use crate::error::TextError;
use dw_frame::{DataFrame, Schema};
use serde::{Deserialize, Serialize};

/// Columns of a concordance result, in order
pub const CONCORDANCE_COLUMNS: [&str; 8] = [
    "document_idx",
    "left_context",
    "matched_text",
    "right_context",
    "l1",
    "r1",
    "l1_freq",
    "r1_freq",
];

const fn default_window() -> usize {
    5
}

/// Search parameters of a concordance
///
/// These are exactly the fields that identify a cached result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConcordanceParams {
    /// Word or pattern to find
    pub search_word: String,
    /// Tokens of left context
    #[serde(default = "default_window")]
    pub num_left_tokens: usize,
    /// Tokens of right context
    #[serde(default = "default_window")]
    pub num_right_tokens: usize,
    /// Treat `search_word` as a regular expression
    #[serde(default)]
    pub regex: bool,
    /// Match case exactly
    #[serde(default)]
    pub case_sensitive: bool,
}

impl ConcordanceParams {
    /// Literal, case-insensitive search with a five-token window
    #[must_use]
    pub fn new(search_word: impl Into<String>) -> Self {
        Self {
            search_word: search_word.into(),
            num_left_tokens: default_window(),
            num_right_tokens: default_window(),
            regex: false,
            case_sensitive: false,
        }
    }

    /// Set both context windows
    #[must_use]
    pub fn with_window(mut self, left: usize, right: usize) -> Self {
        self.num_left_tokens = left;
        self.num_right_tokens = right;
        self
    }

    /// Interpret the search word as a regular expression
    #[must_use]
    pub fn with_regex(mut self, regex: bool) -> Self {
        self.regex = regex;
        self
    }

    /// Match case exactly
    #[must_use]
    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }
}

/// Text tooling the workspace core can delegate to
pub trait TextAnalytics: Send + Sync + std::fmt::Debug {
    /// Pick the column most likely to hold documents, if any
    fn guess_document_column(&self, schema: &Schema, sample: &DataFrame) -> Option<String>;

    /// Keyword-in-context search over `column`
    ///
    /// The result has [`CONCORDANCE_COLUMNS`], one row per match, ordered
    /// by source row and then by position in the text.
    ///
    /// # Errors
    /// Fails when the column is missing or not text, or the search is empty
    /// or does not compile.
    fn concordance(
        &self,
        frame: &DataFrame,
        column: &str,
        params: &ConcordanceParams,
    ) -> Result<DataFrame, TextError>;

    /// Implementation name (for logging)
    fn name(&self) -> &'static str;
}
