//! Graph errors

use crate::ids::NodeId;
use dw_frame::FrameError;

/// Errors raised by graph structure, conversion and persistence
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// Node id is not part of the workspace
    #[error("node '{0}' not found")]
    NodeNotFound(NodeId),

    /// Parent listed for a new or loaded node does not exist
    #[error("parent node '{0}' not found in workspace")]
    ParentNotFound(NodeId),

    /// Parent edges form a cycle
    #[error("cycle detected in node graph")]
    CycleDetected,

    /// No document column supplied and none could be detected
    #[error("could not detect a document column. Available columns: {available:?}")]
    DocumentColumnUndetected {
        /// Columns of the table
        available: Vec<String>,
    },

    /// Operation needs a text-aware node
    #[error("node '{0}' is not a document table")]
    NotDocument(NodeId),

    /// Text is not a valid node id
    #[error("invalid node id '{0}'")]
    InvalidNodeId(String),

    /// Text is not a valid workspace id
    #[error("invalid workspace id '{0}'")]
    InvalidWorkspaceId(String),

    /// Node type name not recognised
    #[error("unknown node type '{0}'. Allowed: dataframe, lazyframe, docdataframe, doclazyframe")]
    UnknownKind(String),

    /// Persisted document written by an incompatible version
    #[error("unsupported workspace file format version {0}")]
    UnsupportedFormat(u32),

    /// Persisted document is structurally invalid
    #[error("malformed workspace document: {0}")]
    Malformed(String),

    /// Table operation failed
    #[error(transparent)]
    Frame(#[from] FrameError),
}
