//! Text analytics for document tables
//!
//! The workspace core only talks to text tooling through the
//! [`TextAnalytics`] trait. [`KeywordInContext`] is the built-in
//! implementation.
//!
//! # Core Operations
//!
//! - Guess which column holds the documents of a table
//! - Keyword-in-context search over a document column

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod analytics;
pub mod error;
pub mod kwic;
pub mod tokenize;

pub use analytics::{ConcordanceParams, TextAnalytics, CONCORDANCE_COLUMNS};
pub use error::TextError;
pub use kwic::KeywordInContext;
pub use tokenize::{tokenize, Token};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
