//! Workspace DAG

use crate::data::NodeData;
use crate::error::GraphError;
use crate::ids::{NodeId, WorkspaceId};
use crate::node::Node;
use crate::summary::{Edge, GraphView, NodeView, WorkspaceSummary};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use petgraph::graphmap::DiGraphMap;
use std::collections::BTreeMap;
use tracing::debug;

/// A named DAG of nodes belonging to one user
#[derive(Debug, Clone)]
pub struct Workspace {
    id: WorkspaceId,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
    nodes: IndexMap<NodeId, Node>,
}

impl Workspace {
    /// Empty workspace
    #[must_use]
    pub fn new(id: WorkspaceId, name: impl Into<String>, description: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            created_at: now,
            modified_at: now,
            nodes: IndexMap::new(),
        }
    }

    pub(crate) fn from_parts(
        id: WorkspaceId,
        name: String,
        description: String,
        created_at: DateTime<Utc>,
        modified_at: DateTime<Utc>,
        nodes: IndexMap<NodeId, Node>,
    ) -> Self {
        Self {
            id,
            name,
            description,
            created_at,
            modified_at,
            nodes,
        }
    }

    /// Identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> &WorkspaceId {
        &self.id
    }

    /// Display name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Free-text description
    #[inline]
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Creation time
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time of the last persisted mutation
    #[must_use]
    pub fn modified_at(&self) -> DateTime<Utc> {
        self.modified_at
    }

    /// Stamp a persisted mutation
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.modified_at = now;
    }

    /// Copy under a new identity; node ids and timestamps are kept
    #[must_use]
    pub fn duplicate(&self, id: WorkspaceId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..self.clone()
        }
    }

    /// Number of nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// No nodes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Node ids in insertion order
    #[must_use]
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    /// Look up a node
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Look up a node or fail with [`GraphError::NodeNotFound`]
    ///
    /// # Errors
    /// Node is absent.
    pub fn require_node(&self, id: NodeId) -> Result<&Node, GraphError> {
        self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))
    }

    /// Derive a new node from existing parents
    ///
    /// Parents must already exist, which keeps the graph acyclic. Repeated
    /// parent ids are collapsed.
    ///
    /// # Errors
    /// Returns [`GraphError::ParentNotFound`] for a missing parent.
    pub fn add_node(
        &mut self,
        data: NodeData,
        name: impl Into<String>,
        operation: impl Into<String>,
        parents: &[NodeId],
    ) -> Result<NodeId, GraphError> {
        let mut unique: Vec<NodeId> = Vec::with_capacity(parents.len());
        for parent in parents {
            if !self.nodes.contains_key(parent) {
                return Err(GraphError::ParentNotFound(*parent));
            }
            if !unique.contains(parent) {
                unique.push(*parent);
            }
        }

        let id = NodeId::new();
        for parent in &unique {
            if let Some(p) = self.nodes.get_mut(parent) {
                p.children.push(id);
            }
        }
        let node = Node::new(id, name.into(), data, operation.into(), unique);
        debug!(workspace = %self.id, node = %id, name = %node.name, "node added");
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Remove a node, detaching it from parents and children
    ///
    /// Descendants are not deleted; children left without parents become roots.
    ///
    /// # Errors
    /// Returns [`GraphError::NodeNotFound`].
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node, GraphError> {
        let removed = self.nodes.shift_remove(&id).ok_or(GraphError::NodeNotFound(id))?;
        for node in self.nodes.values_mut() {
            node.parents.retain(|p| *p != id);
            node.children.retain(|c| *c != id);
        }
        debug!(workspace = %self.id, node = %id, "node removed");
        Ok(removed)
    }

    /// Replace a node's table in place, appending to its provenance log
    ///
    /// # Errors
    /// Returns [`GraphError::NodeNotFound`].
    pub fn replace_node_data(
        &mut self,
        id: NodeId,
        data: NodeData,
        operation: impl Into<String>,
    ) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))?;
        node.replace_data(data, operation);
        Ok(())
    }

    /// Rename a node
    ///
    /// # Errors
    /// Returns [`GraphError::NodeNotFound`].
    pub fn rename_node(&mut self, id: NodeId, name: impl Into<String>) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))?;
        node.name = name.into();
        Ok(())
    }

    /// Nodes without parents
    #[must_use]
    pub fn root_nodes(&self) -> Vec<&Node> {
        self.nodes.values().filter(|n| n.is_root()).collect()
    }

    /// Nodes without children
    #[must_use]
    pub fn leaf_nodes(&self) -> Vec<&Node> {
        self.nodes.values().filter(|n| n.is_leaf()).collect()
    }

    /// Parent to child edges as a graph
    #[must_use]
    pub fn edge_graph(&self) -> DiGraphMap<NodeId, ()> {
        let mut graph = DiGraphMap::new();
        for node in self.nodes.values() {
            graph.add_node(node.id);
            for parent in &node.parents {
                graph.add_edge(*parent, node.id, ());
            }
        }
        graph
    }

    /// Counts and node-type histogram
    #[must_use]
    pub fn summary(&self) -> WorkspaceSummary {
        let mut node_types: BTreeMap<String, usize> = BTreeMap::new();
        for node in self.nodes.values() {
            *node_types.entry(node.kind().to_string()).or_default() += 1;
        }
        WorkspaceSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            created_at: self.created_at,
            modified_at: self.modified_at,
            node_count: self.nodes.len(),
            root_nodes: self.root_nodes().len(),
            leaf_nodes: self.leaf_nodes().len(),
            node_types,
        }
    }

    /// Nodes and edges for display
    #[must_use]
    pub fn graph_view(&self) -> GraphView {
        let nodes = self.nodes.values().map(NodeView::from_node).collect();
        let edges = self
            .nodes
            .values()
            .flat_map(|n| {
                n.parents.iter().map(move |p| Edge {
                    source: *p,
                    target: n.id,
                })
            })
            .collect();
        GraphView { nodes, edges }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    fn data() -> NodeData {
        NodeData::Frame(df!("x" => &[1i64]).unwrap())
    }

    fn workspace() -> Workspace {
        Workspace::new(WorkspaceId::generate(), "w", "", Utc::now())
    }

    #[test]
    fn add_node_wires_both_directions() {
        let mut ws = workspace();
        let a = ws.add_node(data(), "a", "upload", &[]).unwrap();
        let b = ws.add_node(data(), "b", "filter(a)", &[a, a]).unwrap();
        assert_eq!(ws.require_node(b).unwrap().parents(), &[a]);
        assert_eq!(ws.require_node(a).unwrap().children(), &[b]);
        assert_eq!(ws.root_nodes().len(), 1);
        assert_eq!(ws.leaf_nodes().len(), 1);
    }

    #[test]
    fn missing_parent_is_rejected() {
        let mut ws = workspace();
        let ghost = NodeId::new();
        assert_eq!(
            ws.add_node(data(), "a", "x", &[ghost]).unwrap_err(),
            GraphError::ParentNotFound(ghost)
        );
        assert!(ws.is_empty());
    }

    #[test]
    fn removal_promotes_children_to_roots() {
        let mut ws = workspace();
        let a = ws.add_node(data(), "a", "upload", &[]).unwrap();
        let b = ws.add_node(data(), "b", "filter(a)", &[a]).unwrap();
        ws.remove_node(a).unwrap();
        let b_node = ws.require_node(b).unwrap();
        assert!(b_node.is_root());
        assert_eq!(ws.summary().root_nodes, 1);
        assert!(matches!(ws.remove_node(a), Err(GraphError::NodeNotFound(_))));
    }

    #[test]
    fn replace_data_appends_operation() {
        let mut ws = workspace();
        let a = ws.add_node(data(), "a", "upload", &[]).unwrap();
        ws.replace_node_data(a, data(), "cast(x, float)").unwrap();
        let node = ws.require_node(a).unwrap();
        assert_eq!(node.operations(), &["upload".to_string(), "cast(x, float)".to_string()]);
        assert_eq!(node.operation(), "upload\ncast(x, float)");
    }

    #[test]
    fn summary_histograms_kinds() {
        let mut ws = workspace();
        let a = ws.add_node(data(), "a", "upload", &[]).unwrap();
        let lazy = NodeData::Lazy(ws.require_node(a).unwrap().data().to_lazy());
        ws.add_node(lazy, "b", "convert", &[a]).unwrap();
        let summary = ws.summary();
        assert_eq!(summary.node_count, 2);
        assert_eq!(summary.node_types.get("dataframe"), Some(&1));
        assert_eq!(summary.node_types.get("lazyframe"), Some(&1));
    }

    #[test]
    fn graph_view_lists_edges() {
        let mut ws = workspace();
        let a = ws.add_node(data(), "a", "upload", &[]).unwrap();
        let b = ws.add_node(data(), "b", "upload", &[]).unwrap();
        let c = ws.add_node(data(), "c", "join(a, b)", &[a, b]).unwrap();
        let view = ws.graph_view();
        assert_eq!(view.nodes.len(), 3);
        assert_eq!(
            view.edges,
            vec![Edge { source: a, target: c }, Edge { source: b, target: c }]
        );
    }
}
