//! Persisted workspace format
//!
//! One JSON document per workspace. Deferred tables are stored materialized;
//! the node kind records that they were deferred so loading restores the
//! same representation. Children are not stored, they are rebuilt from the
//! parent lists.

use crate::data::{NodeData, NodeKind};
use crate::error::GraphError;
use crate::ids::{NodeId, WorkspaceId};
use crate::node::Node;
use crate::workspace::Workspace;
use chrono::{DateTime, Utc};
use dw_frame::records::StoredTable;
use dw_frame::{DocDataFrame, DocLazyFrame, IntoLazy};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Current document format
pub const FORMAT_VERSION: u32 = 1;

/// Serialized node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Identifier
    pub id: NodeId,
    /// Display name
    pub name: String,
    /// Provenance log
    pub operations: Vec<String>,
    /// Parent ids in derivation order
    pub parents: Vec<NodeId>,
    /// Representation to restore
    pub kind: NodeKind,
    /// Text column for text-aware kinds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_column: Option<String>,
    /// Materialized table, column by column
    pub table: StoredTable,
}

/// Serialized workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceDocument {
    /// Format version
    pub format_version: u32,
    /// Identifier
    pub id: WorkspaceId,
    /// Display name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last persisted mutation
    pub modified_at: DateTime<Utc>,
    /// Nodes in insertion order
    pub nodes: Vec<NodeRecord>,
}

impl NodeRecord {
    fn from_node(node: &Node) -> Result<Self, GraphError> {
        Ok(Self {
            id: node.id,
            name: node.name.clone(),
            operations: node.operations.clone(),
            parents: node.parents.clone(),
            kind: node.kind(),
            document_column: node.data.document_column().map(str::to_string),
            table: StoredTable::from_frame(&node.data.collect()?)?,
        })
    }

    fn into_data(self) -> Result<NodeData, GraphError> {
        let column = || {
            self.document_column.clone().ok_or_else(|| {
                GraphError::Malformed(format!("node '{}' of kind {} has no document column", self.id, self.kind))
            })
        };
        let table = self.table.into_frame()?;
        Ok(match self.kind {
            NodeKind::DataFrame => NodeData::Frame(table),
            NodeKind::LazyFrame => NodeData::Lazy(table.lazy()),
            NodeKind::DocDataFrame => {
                let column = column()?;
                NodeData::Doc(DocDataFrame::new(table, column)?)
            }
            NodeKind::DocLazyFrame => {
                let column = column()?;
                NodeData::DocLazy(DocLazyFrame::new(table.lazy(), column)?)
            }
        })
    }
}

impl Workspace {
    /// Serializable form; deferred tables are collected
    ///
    /// # Errors
    /// Propagates plan failures.
    pub fn to_document(&self) -> Result<WorkspaceDocument, GraphError> {
        Ok(WorkspaceDocument {
            format_version: FORMAT_VERSION,
            id: self.id().clone(),
            name: self.name().to_string(),
            description: self.description().to_string(),
            created_at: self.created_at(),
            modified_at: self.modified_at(),
            nodes: self
                .nodes()
                .map(NodeRecord::from_node)
                .collect::<Result<_, _>>()?,
        })
    }

    /// Rebuild a workspace from its serialized form
    ///
    /// # Errors
    /// Rejects unknown format versions, duplicate node ids, parents that do
    /// not exist, cyclic parent relations, and tables that do not fit their
    /// node kind.
    pub fn from_document(document: WorkspaceDocument) -> Result<Self, GraphError> {
        if document.format_version != FORMAT_VERSION {
            return Err(GraphError::UnsupportedFormat(document.format_version));
        }

        let mut nodes: IndexMap<NodeId, Node> = IndexMap::with_capacity(document.nodes.len());
        for record in document.nodes {
            let id = record.id;
            if nodes.contains_key(&id) {
                return Err(GraphError::Malformed(format!("duplicate node id '{id}'")));
            }
            let name = record.name.clone();
            let mut operations = record.operations.clone();
            let parents = record.parents.clone();
            let data = record.into_data()?;
            if operations.is_empty() {
                operations.push(String::new());
            }
            let first = operations.remove(0);
            let mut node = Node::new(id, name, data, first, parents);
            node.operations.extend(operations);
            nodes.insert(id, node);
        }

        let edges: Vec<(NodeId, NodeId)> = nodes
            .values()
            .flat_map(|n| n.parents.iter().map(move |p| (*p, n.id)))
            .collect();
        for (parent, child) in &edges {
            match nodes.get_mut(parent) {
                Some(p) => p.children.push(*child),
                None => return Err(GraphError::ParentNotFound(*parent)),
            }
        }

        let workspace = Self::from_parts(
            document.id,
            document.name,
            document.description,
            document.created_at,
            document.modified_at,
            nodes,
        );
        if petgraph::algo::is_cyclic_directed(&workspace.edge_graph()) {
            return Err(GraphError::CycleDetected);
        }
        Ok(workspace)
    }

    /// Serialize to pretty JSON
    ///
    /// # Errors
    /// Propagates plan failures and encoding failures.
    pub fn to_json(&self) -> Result<String, GraphError> {
        serde_json::to_string_pretty(&self.to_document()?).map_err(|e| GraphError::Malformed(e.to_string()))
    }

    /// Parse and validate JSON
    ///
    /// # Errors
    /// Fails on invalid JSON or an invalid graph.
    pub fn from_json(text: &str) -> Result<Self, GraphError> {
        let document: WorkspaceDocument =
            serde_json::from_str(text).map_err(|e| GraphError::Malformed(e.to_string()))?;
        Self::from_document(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dw_frame::DataFrame;
    use polars::df;
    use pretty_assertions::assert_eq;

    fn table() -> DataFrame {
        df!("text" => &["one", "two"], "n" => &[Some(1i64), None]).unwrap()
    }

    fn sample() -> (Workspace, NodeId, NodeId) {
        let mut ws = Workspace::new(WorkspaceId::generate(), "w", "desc", Utc::now());
        let a = ws
            .add_node(NodeData::Doc(DocDataFrame::new(table(), "text").unwrap()), "a", "upload", &[])
            .unwrap();
        let b = ws
            .add_node(NodeData::Lazy(table().lazy()), "b", "filter(a)", &[a])
            .unwrap();
        ws.replace_node_data(b, NodeData::Lazy(table().lazy()), "cast(n, float)")
            .unwrap();
        (ws, a, b)
    }

    #[test]
    fn round_trip_preserves_structure() {
        let (ws, a, b) = sample();
        let back = Workspace::from_json(&ws.to_json().unwrap()).unwrap();
        assert_eq!(back.id(), ws.id());
        assert_eq!(back.node_ids(), vec![a, b]);
        let node_b = back.require_node(b).unwrap();
        assert_eq!(node_b.parents(), &[a]);
        assert_eq!(node_b.operations(), ws.require_node(b).unwrap().operations());
        assert!(node_b.is_lazy());
        let node_a = back.require_node(a).unwrap();
        assert_eq!(node_a.children(), &[b]);
        assert_eq!(node_a.data().document_column(), Some("text"));
        assert!(node_a.data().collect().unwrap().equals_missing(&table()));
    }

    #[test]
    fn dangling_parent_is_rejected() {
        let (ws, a, _) = sample();
        let mut document = ws.to_document().unwrap();
        document.nodes.remove(0);
        assert_eq!(
            Workspace::from_document(document).unwrap_err(),
            GraphError::ParentNotFound(a)
        );
    }

    #[test]
    fn cyclic_parents_are_rejected() {
        let (ws, a, b) = sample();
        let mut document = ws.to_document().unwrap();
        document.nodes[0].parents.push(b);
        assert_eq!(document.nodes[0].id, a);
        assert_eq!(Workspace::from_document(document).unwrap_err(), GraphError::CycleDetected);
    }

    #[test]
    fn unknown_version_is_rejected() {
        let (ws, _, _) = sample();
        let mut document = ws.to_document().unwrap();
        document.format_version = 99;
        assert_eq!(
            Workspace::from_document(document).unwrap_err(),
            GraphError::UnsupportedFormat(99)
        );
    }
}
