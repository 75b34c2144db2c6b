use chrono::Utc;
use polars::df;
use dw_graph::{GraphError, NodeData, NodeId, Workspace, WorkspaceId};
use proptest::prelude::*;

fn data() -> NodeData {
    NodeData::Frame(df!("x" => &[1i64]).unwrap())
}

proptest! {
    #[test]
    fn prop_add_node_keeps_graph_acyclic(
        steps in proptest::collection::vec(proptest::collection::vec(0..30usize, 0..3), 1..30),
        removals in proptest::collection::vec(0..30usize, 0..5),
    ) {
        let mut ws = Workspace::new(WorkspaceId::generate(), "p", "", Utc::now());
        let mut ids: Vec<NodeId> = Vec::new();

        for parents in steps {
            let chosen: Vec<NodeId> = parents
                .iter()
                .filter_map(|i| ids.get(*i).copied())
                .collect();
            let id = ws.add_node(data(), "n", "derive", &chosen).unwrap();
            ids.push(id);
        }
        for index in removals {
            if let Some(id) = ids.get(index).copied() {
                let _ = ws.remove_node(id);
            }
        }

        prop_assert!(!petgraph::algo::is_cyclic_directed(&ws.edge_graph()));
        for node in ws.nodes() {
            for parent in node.parents() {
                let parent_node = ws.node(*parent);
                prop_assert!(parent_node.is_some());
                prop_assert!(parent_node.unwrap().children().contains(&node.id()));
            }
        }

        let reloaded = Workspace::from_json(&ws.to_json().unwrap()).unwrap();
        prop_assert_eq!(reloaded.node_ids(), ws.node_ids());
    }

    #[test]
    fn prop_unknown_parent_always_rejected(existing in 0..10usize) {
        let mut ws = Workspace::new(WorkspaceId::generate(), "p", "", Utc::now());
        for _ in 0..existing {
            ws.add_node(data(), "n", "upload", &[]).unwrap();
        }
        let ghost = NodeId::new();
        prop_assert_eq!(
            ws.add_node(data(), "child", "derive", &[ghost]),
            Err(GraphError::ParentNotFound(ghost))
        );
        prop_assert_eq!(ws.len(), existing);
    }
}
