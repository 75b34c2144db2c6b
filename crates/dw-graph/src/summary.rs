//! Serializable workspace views

use crate::data::NodeKind;
use crate::ids::{NodeId, WorkspaceId};
use crate::node::Node;
use chrono::{DateTime, Utc};
use dw_frame::DataType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Workspace metadata plus node counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceSummary {
    /// Identifier
    pub id: WorkspaceId,
    /// Display name
    pub name: String,
    /// Description
    pub description: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last persisted mutation
    pub modified_at: DateTime<Utc>,
    /// Number of nodes
    pub node_count: usize,
    /// Nodes without parents
    pub root_nodes: usize,
    /// Nodes without children
    pub leaf_nodes: usize,
    /// Node count per node type label
    pub node_types: BTreeMap<String, usize>,
}

/// One node for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeView {
    /// Identifier
    pub id: NodeId,
    /// Display name
    pub name: String,
    /// Representation
    pub kind: NodeKind,
    /// Deferred table
    pub is_lazy: bool,
    /// Provenance label
    pub operation: String,
    /// Column names and types (empty when a plan cannot be resolved)
    pub columns: Vec<(String, DataType)>,
    /// Text column of a text-aware node
    pub document_column: Option<String>,
    /// Parent ids
    pub parents: Vec<NodeId>,
    /// Child ids
    pub children: Vec<NodeId>,
}

impl NodeView {
    /// Build the view of a node
    #[must_use]
    pub fn from_node(node: &Node) -> Self {
        let columns = node
            .data()
            .schema()
            .map(|s| s.iter().map(|(n, t)| (n.to_string(), t)).collect())
            .unwrap_or_default();
        Self {
            id: node.id(),
            name: node.name().to_string(),
            kind: node.kind(),
            is_lazy: node.is_lazy(),
            operation: node.operation(),
            columns,
            document_column: node.data().document_column().map(str::to_string),
            parents: node.parents().to_vec(),
            children: node.children().to_vec(),
        }
    }
}

/// Parent to child edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Parent
    pub source: NodeId,
    /// Child
    pub target: NodeId,
}

/// All nodes and edges of a workspace
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GraphView {
    /// Nodes in insertion order
    pub nodes: Vec<NodeView>,
    /// Edges grouped by child in insertion order
    pub edges: Vec<Edge>,
}
