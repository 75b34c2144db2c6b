//! Concordance search, caching and detachment

use dw_core::{AnalysisService, ConcordanceRequest, Config, SortOrder, UserId, WorkspaceError, WorkspaceId};
use dw_expr::CastSpec;
use dw_graph::{GraphError, NodeData, NodeId, NodeKind};
use dw_test_utils::{corpus, corpus_document};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

fn alice() -> UserId {
    UserId::new("alice").unwrap()
}

fn setup(dir: &TempDir, data: NodeData) -> (AnalysisService, WorkspaceId, NodeId) {
    let service = AnalysisService::from_config(&Config::new().with_data_root(dir.path()));
    let ws = service.manager().create(&alice(), "texts", "").unwrap().read().id().clone();
    let node = service
        .manager()
        .add_node(&alice(), &ws, data, "corpus", "upload", &[])
        .unwrap();
    (service, ws, node)
}

#[test]
fn search_is_case_insensitive_by_default() {
    let dir = TempDir::new().unwrap();
    let (service, ws, node) = setup(&dir, NodeData::Doc(corpus_document()));

    let page = service
        .concordance(&alice(), &ws, node, &ConcordanceRequest::new("text", "cat"))
        .unwrap();
    assert_eq!(page.total_matches, 2);
    assert_eq!(page.columns, dw_text::CONCORDANCE_COLUMNS.map(String::from).to_vec());
    assert_eq!(page.data[0]["left_context"], json!("The"));
    assert_eq!(page.data[1]["matched_text"], json!("Cat"));
    assert_eq!(page.pagination.page_size, 20);

    let exact = service
        .concordance(
            &alice(),
            &ws,
            node,
            &ConcordanceRequest::new("text", "cat").with_case_sensitive(true),
        )
        .unwrap();
    assert_eq!(exact.total_matches, 1);
    assert_eq!(service.cache().len(), 2);
}

#[test]
fn metadata_sorting_and_pages() {
    let dir = TempDir::new().unwrap();
    let (service, ws, node) = setup(&dir, NodeData::Doc(corpus_document()));

    let request = ConcordanceRequest::new("text", "cat")
        .with_metadata(true)
        .with_sort("document_idx", SortOrder::Desc)
        .with_page(1, 1);
    let page = service.concordance(&alice(), &ws, node, &request).unwrap();
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0]["document_idx"], json!(1));
    assert_eq!(page.data[0]["author"], json!("bob"));
    assert_eq!(page.sorting.sort_by.as_deref(), Some("document_idx"));
    assert!(page.pagination.has_next);

    let unknown_sort = ConcordanceRequest::new("text", "cat").with_sort("nope", SortOrder::Asc);
    let page = service.concordance(&alice(), &ws, node, &unknown_sort).unwrap();
    assert_eq!(page.sorting.sort_by, None);
    assert_eq!(service.cache().len(), 1);
}

#[test]
fn in_place_edits_invalidate_the_workspace_scope() {
    let dir = TempDir::new().unwrap();
    let (service, ws, node) = setup(&dir, NodeData::Doc(corpus_document()));
    service
        .concordance(&alice(), &ws, node, &ConcordanceRequest::new("text", "cat"))
        .unwrap();
    assert_eq!(service.cache().len(), 1);

    service
        .cast(&alice(), &ws, node, &CastSpec::new("year", "float"))
        .unwrap();
    assert!(service.cache().is_empty());

    service
        .concordance(&alice(), &ws, node, &ConcordanceRequest::new("text", "dog"))
        .unwrap();
    assert_eq!(service.clear_concordance_cache(&alice(), &ws), 1);
}

#[test]
fn only_applied_edits_invalidate() {
    let dir = TempDir::new().unwrap();
    let (service, ws, node) = setup(&dir, NodeData::Doc(corpus_document()));
    let search = ConcordanceRequest::new("text", "cat");
    service.concordance(&alice(), &ws, node, &search).unwrap();

    assert!(service
        .cast(&alice(), &ws, node, &CastSpec::new("missing", "float"))
        .is_err());
    assert_eq!(service.cache().len(), 1);

    service.remove_node(&alice(), &ws, node).unwrap();
    assert!(service.cache().is_empty());

    let again = service
        .manager()
        .add_node(&alice(), &ws, NodeData::Doc(corpus_document()), "corpus", "upload", &[])
        .unwrap();
    service.concordance(&alice(), &ws, again, &search).unwrap();
    assert_eq!(service.cache().len(), 1);
    assert!(service.delete_workspace(&alice(), &ws).unwrap());
    assert!(service.cache().is_empty());
}

#[test]
fn plain_nodes_and_disabled_analytics_are_rejected() {
    let dir = TempDir::new().unwrap();
    let (service, ws, node) = setup(&dir, NodeData::Frame(corpus()));
    assert!(matches!(
        service.concordance(&alice(), &ws, node, &ConcordanceRequest::new("text", "cat")),
        Err(WorkspaceError::Graph(GraphError::NotDocument(_)))
    ));

    let service = service.with_analytics(None);
    let error = service
        .concordance(&alice(), &ws, node, &ConcordanceRequest::new("text", "cat"))
        .unwrap_err();
    assert!(matches!(error, WorkspaceError::AnalyticsUnavailable));
}

#[test]
fn detail_splits_text_from_metadata() {
    let dir = TempDir::new().unwrap();
    let (service, ws, node) = setup(&dir, NodeData::Doc(corpus_document()));

    let detail = service.concordance_detail(&alice(), &ws, node, 1, "text").unwrap();
    assert_eq!(detail.text, json!("A dog chased the Cat home"));
    assert_eq!(detail.metadata.keys().collect::<Vec<_>>(), vec!["author", "year"]);
    assert_eq!(detail.full_record.len(), 3);

    assert!(matches!(
        service.concordance_detail(&alice(), &ws, node, 3, "text"),
        Err(WorkspaceError::RowOutOfRange { index: 3, rows: 3, .. })
    ));
}

#[test]
fn detached_concordance_stays_a_document() {
    let dir = TempDir::new().unwrap();
    let (service, ws, node) = setup(&dir, NodeData::Doc(corpus_document()));

    let view = service
        .detach_concordance(&alice(), &ws, node, &ConcordanceRequest::new("text", "cat"), None)
        .unwrap();
    assert_eq!(view.name, "corpus_conc_cat");
    assert_eq!(view.operation, "concordance_detach");
    assert_eq!(view.kind, NodeKind::DocDataFrame);
    assert_eq!(view.document_column.as_deref(), Some("text"));
    assert_eq!(view.parents, vec![node]);
    assert_eq!(service.node_shape(&alice(), &ws, view.id).unwrap().0, 2);
}
