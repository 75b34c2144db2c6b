//! Workspace nodes

use crate::data::{NodeData, NodeKind};
use crate::ids::NodeId;

/// One table in the workspace plus its derivation history
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) data: NodeData,
    pub(crate) operations: Vec<String>,
    pub(crate) parents: Vec<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    pub(crate) fn new(id: NodeId, name: String, data: NodeData, operation: String, parents: Vec<NodeId>) -> Self {
        Self {
            id,
            name,
            data,
            operations: vec![operation],
            parents,
            children: Vec::new(),
        }
    }

    /// Identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Display name (not unique)
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Table
    #[inline]
    #[must_use]
    pub fn data(&self) -> &NodeData {
        &self.data
    }

    /// Representation of the table
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }

    /// Deferred table
    #[must_use]
    pub fn is_lazy(&self) -> bool {
        self.data.is_lazy()
    }

    /// Provenance entries, oldest first
    #[must_use]
    pub fn operations(&self) -> &[String] {
        &self.operations
    }

    /// Provenance as one newline-separated label
    #[must_use]
    pub fn operation(&self) -> String {
        self.operations.join("\n")
    }

    /// Parent ids in derivation order
    #[must_use]
    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    /// Child ids, derived from the children's parent lists
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// No parents
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// No children
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Replace the table in place, appending to the provenance log
    pub(crate) fn replace_data(&mut self, data: NodeData, operation: impl Into<String>) {
        self.data = data;
        self.operations.push(operation.into());
    }
}
