//! Tabular storage for DocWorkspace nodes
//!
//! Node tables are [`polars`] frames. This crate adds what the workspace
//! needs on top of them:
//! - [`FrameExt`] / [`LazyExt`]: column-checked operations on eager frames
//!   and deferred plans
//! - [`DocDataFrame`] / [`DocLazyFrame`]: text-aware wrappers with a designated
//!   document column
//! - [`Schema`], [`DataType`], [`Value`]: the logical view used in API
//!   responses and filter coercion
//! - [`records`]: JSON import, export and the persisted table shape
//!
//! # Example
//!
//! ```rust
//! use dw_frame::{col, lit, FrameExt, Value};
//!
//! let df = polars::df!("x" => &[3i64, 7, 5]).unwrap();
//! let kept = df.filter_rows(&col("x").gt(lit(5))).unwrap();
//! assert_eq!(kept.values("x").unwrap(), vec![Value::Int(7)]);
//! ```

pub mod doc;
pub mod error;
pub mod frame;
pub mod lazy;
pub mod records;
pub mod schema;
pub mod temporal;
pub mod value;

pub use polars::prelude::{col, lit, DataFrame, Expr, IntoLazy, LazyFrame};

pub use doc::{DocDataFrame, DocLazyFrame};
pub use error::{FrameError, FrameResult};
pub use frame::{FrameExt, JoinSpec, JoinType};
pub use lazy::LazyExt;
pub use schema::Schema;
pub use value::{DataType, Value};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
