//! Workspace node graph
//!
//! A [`Workspace`] is a named DAG of [`Node`]s. Each node owns a table
//! ([`NodeData`]) and a provenance log. Two update paths exist and are kept
//! apart:
//!
//! - [`Workspace::add_node`] derives a new node (new identity) from existing parents
//! - [`Workspace::replace_node_data`] rewrites a node's table in place (same identity)
//!
//! Persistence goes through [`WorkspaceDocument`], the on-disk JSON shape.
//! Loading validates that every parent exists and that the parent relation
//! is acyclic.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod convert;
pub mod data;
pub mod document;
pub mod error;
pub mod ids;
pub mod node;
pub mod summary;
pub mod workspace;

pub use convert::{convert, resolve_document_column, DOCUMENT_COLUMN_PREFERENCES};
pub use data::{NodeData, NodeKind};
pub use document::{NodeRecord, WorkspaceDocument, FORMAT_VERSION};
pub use error::GraphError;
pub use ids::{NodeId, WorkspaceId};
pub use node::Node;
pub use summary::{Edge, GraphView, NodeView, WorkspaceSummary};
pub use workspace::Workspace;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
