//! Filter and cast compilation
//!
//! Turns the declarative request shapes a client sends into polars
//! [`dw_frame::Expr`] trees, checking column references against the node's schema before any
//! data is touched.
//!
//! # Core Operations
//!
//! - **Filter**: [`compile_filter`] folds a flat list of [`FilterCondition`]s
//!   with one [`Combinator`] into a single boolean predicate
//! - **Cast**: [`compile_cast`] turns a [`CastSpec`] into a [`CompiledCast`]
//!   that can be sample-validated and then applied to eager or lazy tables

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cast;
pub mod coerce;
pub mod error;
pub mod filter;

pub use cast::{compile_cast, CastInfo, CastSpec, CompiledCast, TargetType};
pub use error::CompileError;
pub use filter::{compile_filter, Combinator, FilterCondition, FilterOperator, FilterRequest};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
