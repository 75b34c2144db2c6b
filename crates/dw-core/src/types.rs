//! Core types: user ids, service requests and responses

use crate::error::WorkspaceError;
use dw_frame::DataType;
use dw_text::ConcordanceParams;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use dw_graph::{NodeId, WorkspaceId};

/// User identifier
///
/// Restricted to ASCII letters, digits, `-` and `_` since it names the
/// user's data folder.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Validate a user id
    ///
    /// # Errors
    /// Returns [`WorkspaceError::InvalidUserId`] for empty text, more than
    /// 128 bytes, or characters outside `[A-Za-z0-9_-]`.
    pub fn new(id: impl Into<String>) -> Result<Self, WorkspaceError> {
        let id = id.into();
        let valid = !id.is_empty()
            && id.len() <= 128
            && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if valid {
            Ok(Self(id))
        } else {
            Err(WorkspaceError::InvalidUserId(id))
        }
    }

    /// Borrow as text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserId {
    type Err = WorkspaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for UserId {
    type Error = WorkspaceError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

/// Row range and projection for a derived node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceRequest {
    /// First row (default 0)
    #[serde(default)]
    pub start_row: Option<usize>,
    /// Exclusive end row (default: end of table)
    #[serde(default)]
    pub end_row: Option<usize>,
    /// Columns to keep (default: all)
    #[serde(default)]
    pub columns: Option<Vec<String>>,
}

fn default_join_type() -> String {
    "inner".to_string()
}

/// Join of two nodes into a derived node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Left input
    pub left_node: NodeId,
    /// Right input
    pub right_node: NodeId,
    /// Key column on the left (ignored for cross joins)
    #[serde(default)]
    pub left_on: Option<String>,
    /// Key column on the right (ignored for cross joins)
    #[serde(default)]
    pub right_on: Option<String>,
    /// Strategy name, case-insensitive
    #[serde(default = "default_join_type")]
    pub how: String,
    /// Name of the derived node
    #[serde(default)]
    pub new_node_name: Option<String>,
}

impl JoinRequest {
    /// Equi-join on one key per side
    #[must_use]
    pub fn on(
        left_node: NodeId,
        right_node: NodeId,
        left_on: impl Into<String>,
        right_on: impl Into<String>,
        how: impl Into<String>,
    ) -> Self {
        Self {
            left_node,
            right_node,
            left_on: Some(left_on.into()),
            right_on: Some(right_on.into()),
            how: how.into(),
            new_node_name: None,
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending
    #[default]
    Asc,
    /// Descending
    Desc,
}

const fn default_window() -> usize {
    5
}

const fn first_page() -> usize {
    1
}

/// Concordance search plus presentation options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcordanceRequest {
    /// Text column to search
    pub column: String,
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
    /// 1-based page
    #[serde(default = "first_page")]
    pub page: usize,
    /// Rows per page (default from configuration)
    #[serde(default)]
    pub page_size: Option<usize>,
    /// Result column to sort by
    #[serde(default)]
    pub sort_by: Option<String>,
    /// Sort direction
    #[serde(default)]
    pub sort_order: SortOrder,
    /// Join the source row's other columns onto each match
    #[serde(default)]
    pub show_metadata: bool,
}

impl ConcordanceRequest {
    /// First page of a literal, case-insensitive search
    #[must_use]
    pub fn new(column: impl Into<String>, search_word: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            search_word: search_word.into(),
            num_left_tokens: default_window(),
            num_right_tokens: default_window(),
            regex: false,
            case_sensitive: false,
            page: 1,
            page_size: None,
            sort_by: None,
            sort_order: SortOrder::Asc,
            show_metadata: false,
        }
    }

    /// Match case exactly
    #[must_use]
    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Select a page
    #[must_use]
    pub fn with_page(mut self, page: usize, page_size: usize) -> Self {
        self.page = page;
        self.page_size = Some(page_size);
        self
    }

    /// Sort the result
    #[must_use]
    pub fn with_sort(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = Some(column.into());
        self.sort_order = order;
        self
    }

    /// Include source row metadata
    #[must_use]
    pub fn with_metadata(mut self, show: bool) -> Self {
        self.show_metadata = show;
        self
    }

    /// The fields that identify a cached search
    #[must_use]
    pub fn params(&self) -> ConcordanceParams {
        ConcordanceParams {
            search_word: self.search_word.clone(),
            num_left_tokens: self.num_left_tokens,
            num_right_tokens: self.num_right_tokens,
            regex: self.regex,
            case_sensitive: self.case_sensitive,
        }
    }
}

/// JSON row as returned to callers
pub type Record = IndexMap<String, serde_json::Value>;

/// Pagination state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// 1-based page
    pub page: usize,
    /// Rows per page
    pub page_size: usize,
    /// Rows across all pages
    pub total_rows: usize,
    /// Number of pages (at least 1)
    pub total_pages: usize,
    /// A later page exists
    pub has_next: bool,
    /// An earlier page exists
    pub has_prev: bool,
}

impl Pagination {
    /// Compute page bounds
    ///
    /// # Errors
    /// Page and page size must be at least 1.
    pub fn new(page: usize, page_size: usize, total_rows: usize) -> Result<Self, WorkspaceError> {
        if page == 0 || page_size == 0 {
            return Err(WorkspaceError::InvalidRequest(format!(
                "page ({page}) and page size ({page_size}) must be at least 1"
            )));
        }
        let total_pages = total_rows.div_ceil(page_size).max(1);
        Ok(Self {
            page,
            page_size,
            total_rows,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        })
    }

    /// First row of the page
    #[must_use]
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

/// One page of a node's rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePage {
    /// Rows of this page
    pub data: Vec<Record>,
    /// Column names
    pub columns: Vec<String>,
    /// Column types
    pub dtypes: IndexMap<String, DataType>,
    /// Page bounds
    pub pagination: Pagination,
}

/// Distinct values of a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniqueValues {
    /// Column queried
    pub column: String,
    /// Column type
    pub dtype: DataType,
    /// Number of distinct values (null included)
    pub unique_count: usize,
    /// Up to 100 distinct values in first-seen order
    pub sample: Vec<serde_json::Value>,
}

/// Outcome of an in-place cast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastOutcome {
    /// Node rewritten
    pub node: NodeId,
    /// Cast details
    pub cast_info: dw_expr::CastInfo,
    /// Human-readable summary
    pub message: String,
}

/// Sorting echo of a concordance page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sorting {
    /// Column sorted by, when it exists in the result
    pub sort_by: Option<String>,
    /// Direction
    pub sort_order: SortOrder,
}

/// One page of a concordance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcordancePage {
    /// Matches of this page
    pub data: Vec<Record>,
    /// Result column names
    pub columns: Vec<String>,
    /// Matches across all pages
    pub total_matches: usize,
    /// Page bounds
    pub pagination: Pagination,
    /// Sort applied
    pub sorting: Sorting,
}

/// A concordance match's source row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcordanceDetail {
    /// Source row
    pub document_idx: usize,
    /// Column holding the text
    pub text_column: String,
    /// Full text (null for a missing cell)
    pub text: serde_json::Value,
    /// Every other column of the row
    pub metadata: Record,
    /// The whole row
    pub full_record: Record,
}
