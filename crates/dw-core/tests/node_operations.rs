//! End-to-end node operations through the service and the file store

use dw_core::{AnalysisService, Config, JoinRequest, SliceRequest, UserId, WorkspaceError, WorkspaceId, WorkspaceStore};
use dw_expr::{CastSpec, CompileError, FilterCondition, FilterRequest};
use dw_frame::{DataType, FrameError, FrameExt, IntoLazy, Value};
use dw_graph::{GraphError, NodeData, NodeId, NodeKind};
use dw_test_utils::{corpus, frame, int_column, numbers, str_column};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

fn service(dir: &TempDir) -> AnalysisService {
    AnalysisService::from_config(&Config::new().with_data_root(dir.path()))
}

fn alice() -> UserId {
    UserId::new("alice").unwrap()
}

fn workspace_with(service: &AnalysisService, data: NodeData) -> (WorkspaceId, NodeId) {
    let id = service.manager().create(&alice(), "ws", "").unwrap().read().id().clone();
    let node = service
        .manager()
        .add_node(&alice(), &id, data, "numbers", "upload", &[])
        .unwrap();
    (id, node)
}

fn column_of(service: &AnalysisService, ws: &WorkspaceId, node: NodeId, column: &str) -> Vec<Value> {
    service
        .manager()
        .read(&alice(), ws, |w| {
            let table = w.require_node(node)?.data().collect()?;
            Ok(table.values(column)?)
        })
        .unwrap()
}

#[test]
fn filter_remove_and_delete_lifecycle() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    let (ws, root) = workspace_with(&service, NodeData::Frame(numbers()));

    let request = FilterRequest::all(vec![FilterCondition::new("x", "gt", json!(5))]);
    let filtered = service.filter(&alice(), &ws, root, &request).unwrap();
    assert_eq!(filtered.name, "numbers_filtered");
    assert_eq!(filtered.operation, "filter(numbers)");
    assert_eq!(filtered.parents, vec![root]);
    assert_eq!(service.node_shape(&alice(), &ws, filtered.id).unwrap(), (5, 2));

    let summary = &service.manager().list_summaries(&alice()).unwrap()[&ws];
    assert_eq!((summary.node_count, summary.root_nodes, summary.leaf_nodes), (2, 1, 1));

    service.remove_node(&alice(), &ws, root).unwrap();
    let info = service.manager().workspace_info(&alice(), &ws).unwrap();
    assert_eq!((info.node_count, info.root_nodes), (1, 1));
    let graph = service.manager().graph(&alice(), &ws).unwrap();
    assert!(graph.nodes[0].parents.is_empty());

    let store = service.manager().store();
    assert!(store.exists(&alice(), &ws).unwrap());
    assert!(service.delete_workspace(&alice(), &ws).unwrap());
    assert!(!store.exists(&alice(), &ws).unwrap());
    assert_eq!(service.manager().current_id(&alice()), None);
}

#[test]
fn mutations_survive_a_restart() {
    let dir = TempDir::new().unwrap();
    let (ws, node) = {
        let service = service(&dir);
        let (ws, root) = workspace_with(&service, NodeData::Frame(numbers()));
        let sliced = service
            .slice(
                &alice(),
                &ws,
                root,
                &SliceRequest {
                    start_row: Some(2),
                    end_row: Some(4),
                    columns: Some(vec!["x".into()]),
                },
            )
            .unwrap();
        (ws, sliced.id)
    };

    let reopened = service(&dir);
    assert_eq!(column_of(&reopened, &ws, node, "x"), vec![Value::Int(3), Value::Int(4)]);
    let info = reopened.manager().workspace_info(&alice(), &ws).unwrap();
    assert_eq!(info.node_count, 2);
}

#[test]
fn slice_validates_bounds_and_columns() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    let (ws, root) = workspace_with(&service, NodeData::Frame(numbers()));

    let inverted = SliceRequest {
        start_row: Some(5),
        end_row: Some(2),
        columns: None,
    };
    assert!(matches!(
        service.slice(&alice(), &ws, root, &inverted),
        Err(WorkspaceError::Frame(FrameError::InvalidSlice { start: 5, end: 2 }))
    ));

    let unknown = SliceRequest {
        columns: Some(vec!["nope".into()]),
        ..SliceRequest::default()
    };
    let error = service.slice(&alice(), &ws, root, &unknown).unwrap_err();
    assert!(matches!(error, WorkspaceError::InvalidRequest(_)));
    assert_eq!(service.manager().workspace_info(&alice(), &ws).unwrap().node_count, 1);
}

#[test]
fn join_names_node_after_both_parents() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    let (ws, left) = workspace_with(&service, NodeData::Frame(numbers()));
    let lookup = frame(vec![int_column("x", &[1, 2]), str_column("tag", &["one", "two"])]);
    let right = service
        .manager()
        .add_node(&alice(), &ws, NodeData::Frame(lookup), "tags", "upload", &[])
        .unwrap();

    let joined = service
        .join(&alice(), &ws, &JoinRequest::on(left, right, "x", "x", "INNER"))
        .unwrap();
    assert_eq!(joined.name, "numbers_join_tags");
    assert_eq!(joined.operation, "join(numbers, tags)");
    assert_eq!(joined.parents, vec![left, right]);
    assert_eq!(service.node_shape(&alice(), &ws, joined.id).unwrap(), (2, 3));

    let mut missing_keys = JoinRequest::on(left, right, "x", "x", "left");
    missing_keys.right_on = None;
    assert!(matches!(
        service.join(&alice(), &ws, &missing_keys),
        Err(WorkspaceError::Frame(FrameError::MissingJoinKeys { .. }))
    ));

    let bogus = JoinRequest::on(left, right, "x", "x", "sideways");
    assert!(matches!(
        service.join(&alice(), &ws, &bogus),
        Err(WorkspaceError::Frame(FrameError::UnknownJoinType(_)))
    ));

    let cross = JoinRequest {
        left_on: None,
        right_on: None,
        ..JoinRequest::on(left, right, "", "", "cross")
    };
    let product = service.join(&alice(), &ws, &cross).unwrap();
    assert_eq!(service.node_shape(&alice(), &ws, product.id).unwrap().0, 20);
}

#[test]
fn lenient_cast_keeps_identity_and_nulls_bad_cells() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    let table = frame(vec![str_column("n", &["1", "2", "bad", "4"])]);
    let (ws, node) = workspace_with(&service, NodeData::Frame(table));

    let outcome = service.cast(&alice(), &ws, node, &CastSpec::new("n", "integer")).unwrap();
    assert_eq!(outcome.node, node);
    assert_eq!(outcome.cast_info.new_type, DataType::Integer);
    assert_eq!(
        column_of(&service, &ws, node, "n"),
        vec![Value::Int(1), Value::Int(2), Value::Null, Value::Int(4)]
    );

    let operations = service
        .manager()
        .read(&alice(), &ws, |w| Ok(w.require_node(node)?.operations().to_vec()))
        .unwrap();
    assert_eq!(operations, vec!["upload".to_string(), "cast(n, integer)".to_string()]);
}

#[test]
fn strict_datetime_cast_failure_leaves_node_unmodified() {
    let dir = TempDir::new().unwrap();
    let service = AnalysisService::from_config(&Config::new().with_data_root(dir.path()).with_sample_rows(1));
    let table = frame(vec![str_column("d", &["2024-01-01", "2024-01-02", "garbage"])]);
    let (ws, node) = workspace_with(&service, NodeData::Lazy(table.lazy()));

    let spec = CastSpec::new("d", "datetime").with_strict(true);
    let error = service.cast(&alice(), &ws, node, &spec).unwrap_err();
    assert!(matches!(error, WorkspaceError::Compile(CompileError::SampleValidation { .. })));

    let (dtype, operations) = service
        .manager()
        .read(&alice(), &ws, |w| {
            let n = w.require_node(node)?;
            Ok((n.data().schema()?.get("d"), n.operations().len()))
        })
        .unwrap();
    assert_eq!(dtype, Some(DataType::String));
    assert_eq!(operations, 1);
}

#[test]
fn convert_and_reset_document_column() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    let (ws, node) = workspace_with(&service, NodeData::Frame(corpus()));

    let converted = service
        .convert(&alice(), &ws, node, NodeKind::DocDataFrame, None)
        .unwrap();
    assert_eq!(converted.kind, NodeKind::DocDataFrame);
    assert_eq!(converted.document_column.as_deref(), Some("text"));
    assert_eq!(converted.operation, "convert(docdataframe)");

    let before = service.manager().workspace_info(&alice(), &ws).unwrap().modified_at;
    let unchanged = service.reset_document(&alice(), &ws, node, Some("text")).unwrap();
    assert_eq!(unchanged.operation, "convert(docdataframe)");
    assert_eq!(service.manager().workspace_info(&alice(), &ws).unwrap().modified_at, before);

    let reset = service.reset_document(&alice(), &ws, node, Some("author")).unwrap();
    assert_eq!(reset.document_column.as_deref(), Some("author"));

    assert!(matches!(
        service.reset_document(&alice(), &ws, node, Some("year")),
        Err(WorkspaceError::Graph(GraphError::Frame(FrameError::TypeMismatch { .. })))
    ));

    let plain = service.convert(&alice(), &ws, node, NodeKind::DataFrame, None).unwrap();
    assert_eq!(plain.document_column, None);
    assert!(matches!(
        service.reset_document(&alice(), &ws, node, None),
        Err(WorkspaceError::Graph(GraphError::NotDocument(_)))
    ));
}

#[test]
fn pages_and_unique_values() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    let (ws, node) = workspace_with(&service, NodeData::Frame(numbers()));

    let page = service.node_page(&alice(), &ws, node, 3, 4).unwrap();
    assert_eq!(page.data.len(), 2);
    assert_eq!(page.data[0]["x"], json!(9));
    assert_eq!(page.dtypes["x"], DataType::Integer);
    assert_eq!((page.pagination.total_pages, page.pagination.has_next), (3, false));
    assert!(service.node_page(&alice(), &ws, node, 0, 4).is_err());

    let unique = service.unique_values(&alice(), &ws, node, "x").unwrap();
    assert_eq!(unique.unique_count, 10);
    assert_eq!(unique.sample[0], json!(1));
    assert!(matches!(
        service.unique_values(&alice(), &ws, node, "missing"),
        Err(WorkspaceError::Frame(FrameError::ColumnNotFound { .. }))
    ));
}

#[test]
fn rename_persists() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    let (ws, node) = workspace_with(&service, NodeData::Frame(numbers()));
    let view = service.rename_node(&alice(), &ws, node, "renamed").unwrap();
    assert_eq!(view.name, "renamed");

    service.manager().unload(&alice(), false).unwrap();
    let name = service
        .manager()
        .read(&alice(), &ws, |w| Ok(w.require_node(node)?.name().to_string()))
        .unwrap();
    assert_eq!(name, "renamed");
}
