//! Error types for DocWorkspace core
//!
//! Provides the classified error taxonomy returned to callers:
//! - Missing workspaces, nodes, columns and rows
//! - Request validation failures
//! - Duplicate resources
//! - Missing text analytics capabilities
//! - Storage and unexpected internal failures

use dw_expr::CompileError;
use dw_frame::FrameError;
use dw_graph::{GraphError, NodeId, WorkspaceId};
use dw_text::TextError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Failure class of a [`WorkspaceError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Workspace, node, column or row absent
    NotFound,
    /// Malformed request or data
    Validation,
    /// Resource already exists
    Conflict,
    /// Text analytics absent or precondition unmet
    CapabilityUnavailable,
    /// Unexpected failure
    Internal,
}

/// Persistence errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem access failed
    #[error("I/O error at '{path}': {source}")]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Workspace file exists but cannot be read back
    #[error("workspace file '{path}' is invalid: {source}")]
    Corrupt {
        /// File path
        path: PathBuf,
        /// Decode or validation failure
        #[source]
        source: GraphError,
    },

    /// Workspace could not be serialized
    #[error("cannot encode workspace '{id}': {source}")]
    Encode {
        /// Workspace being written
        id: WorkspaceId,
        /// Underlying failure
        #[source]
        source: GraphError,
    },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("cannot read config '{path}': {source}")]
    Io {
        /// Config path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`crate::Config`]
    #[error("invalid config: {0}")]
    Parse(String),
}

/// Main workspace error type
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    /// No workspace with this id for the user
    #[error("workspace '{0}' not found")]
    WorkspaceNotFound(WorkspaceId),

    /// Workspace id already in use
    #[error("workspace '{0}' already exists")]
    AlreadyExists(WorkspaceId),

    /// Row index outside the table
    #[error("row {index} out of range for node '{node}' with {rows} rows")]
    RowOutOfRange {
        /// Node queried
        node: NodeId,
        /// Requested row
        index: usize,
        /// Rows in the table
        rows: usize,
    },

    /// User id unusable as a folder name
    #[error("invalid user id '{0}'")]
    InvalidUserId(String),

    /// Request rejected before touching any data
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No text analytics implementation configured
    #[error("text analytics is not available")]
    AnalyticsUnavailable,

    /// Filter or cast compilation failed
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Graph structure or conversion failed
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Table operation failed
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// Text analytics failed
    #[error(transparent)]
    Text(#[from] TextError),

    /// Persistence failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Unexpected failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl WorkspaceError {
    /// Classify the failure
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::WorkspaceNotFound(_) | Self::RowOutOfRange { .. } => ErrorKind::NotFound,
            Self::AlreadyExists(_) => ErrorKind::Conflict,
            Self::InvalidUserId(_) | Self::InvalidRequest(_) => ErrorKind::Validation,
            Self::AnalyticsUnavailable => ErrorKind::CapabilityUnavailable,
            Self::Compile(CompileError::UnknownColumn { .. }) => ErrorKind::NotFound,
            Self::Compile(_) => ErrorKind::Validation,
            Self::Graph(e) => graph_kind(e),
            Self::Frame(e) => frame_kind(e),
            Self::Text(TextError::Frame(e)) => frame_kind(e),
            Self::Text(_) => ErrorKind::Validation,
            Self::Storage(StorageError::Corrupt { .. }) => ErrorKind::Validation,
            Self::Storage(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Caused by the request rather than the system
    #[inline]
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Internal)
    }
}

fn frame_kind(error: &FrameError) -> ErrorKind {
    match error {
        FrameError::ColumnNotFound { .. } => ErrorKind::NotFound,
        FrameError::DuplicateColumn(_) => ErrorKind::Conflict,
        _ => ErrorKind::Validation,
    }
}

fn graph_kind(error: &GraphError) -> ErrorKind {
    match error {
        GraphError::NodeNotFound(_) | GraphError::ParentNotFound(_) => ErrorKind::NotFound,
        GraphError::NotDocument(_) => ErrorKind::CapabilityUnavailable,
        GraphError::Frame(e) => frame_kind(e),
        _ => ErrorKind::Validation,
    }
}

/// Result alias for workspace operations
pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

/// Uniform outcome of a guarded mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult<T> {
    /// Mutation applied and persisted
    pub success: bool,
    /// Human-readable outcome
    pub message: String,
    /// Mutation output on success
    pub value: Option<T>,
    /// Failure classes, empty on success
    pub errors: Vec<ErrorKind>,
}

impl<T> OperationResult<T> {
    /// Successful outcome
    #[must_use]
    pub fn ok(value: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            value: Some(value),
            errors: Vec::new(),
        }
    }

    /// Failed outcome carrying the classified message
    #[must_use]
    pub fn failed(error: &WorkspaceError) -> Self {
        Self {
            success: false,
            message: error.to_string(),
            value: None,
            errors: vec![error.kind()],
        }
    }

    /// Convert a result
    #[must_use]
    pub fn from_result(result: WorkspaceResult<T>, message: impl Into<String>) -> Self {
        match result {
            Ok(value) => Self::ok(value, message),
            Err(error) => Self::failed(&error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        let node = NodeId::new();
        assert_eq!(
            WorkspaceError::from(GraphError::NodeNotFound(node)).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            WorkspaceError::from(FrameError::column_not_found("x", vec![])).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(WorkspaceError::from(CompileError::EmptyFilter).kind(), ErrorKind::Validation);
        assert_eq!(
            WorkspaceError::from(GraphError::NotDocument(node)).kind(),
            ErrorKind::CapabilityUnavailable
        );
        assert_eq!(
            WorkspaceError::AlreadyExists(WorkspaceId::generate()).kind(),
            ErrorKind::Conflict
        );
        assert!(!WorkspaceError::Internal("boom".into()).is_client_error());
    }

    #[test]
    fn failed_result_carries_message_and_kind() {
        let error = WorkspaceError::from(GraphError::NodeNotFound(NodeId::new()));
        let result: OperationResult<()> = OperationResult::failed(&error);
        assert!(!result.success);
        assert!(result.message.contains("not found"));
        assert_eq!(result.errors, vec![ErrorKind::NotFound]);
        assert!(result.value.is_none());
    }
}
