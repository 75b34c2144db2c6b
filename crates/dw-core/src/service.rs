//! Node operations over resident workspaces
//!
//! [`AnalysisService`] turns requests into node derivations (filter, slice,
//! join, detached concordance) or in-place rewrites (cast, convert, document
//! column reset). Compilation and validation run before any node is touched;
//! a failed request leaves the workspace and its file unchanged.

use crate::cache::{ConcordanceCache, ConcordanceKey};
use crate::clock::SystemClock;
use crate::config::Config;
use crate::error::{WorkspaceError, WorkspaceResult};
use crate::manager::WorkspaceManager;
use crate::store::FsStore;
use crate::types::{
    CastOutcome, ConcordanceDetail, ConcordancePage, ConcordanceRequest, JoinRequest, NodePage, Pagination, SliceRequest,
    SortOrder, Sorting, UniqueValues, UserId,
};
use dw_expr::{compile_cast, compile_filter, CastSpec, FilterRequest};
use dw_frame::records::to_json_records;
use dw_frame::{DataFrame, DataType, DocDataFrame, FrameError, FrameExt, JoinSpec, JoinType, Schema, Value};
use dw_graph::{convert, resolve_document_column, GraphError, Node, NodeData, NodeId, NodeKind, NodeView, WorkspaceId};
use dw_text::{KeywordInContext, TextAnalytics};
use std::sync::Arc;
use tracing::{debug, info};

/// Distinct values returned by [`AnalysisService::unique_values`]
const UNIQUE_SAMPLE: usize = 100;

/// Row index column joining concordance matches to their source rows
const DOCUMENT_INDEX: &str = "document_idx";

/// Orchestrates node operations, persistence and concordance caching
#[derive(Debug)]
pub struct AnalysisService {
    manager: Arc<WorkspaceManager>,
    cache: ConcordanceCache,
    analytics: Option<Arc<dyn TextAnalytics>>,
    sample_rows: usize,
    default_page_size: usize,
}

impl AnalysisService {
    /// Create service with the built-in text analytics
    #[must_use]
    pub fn new(manager: Arc<WorkspaceManager>, config: &Config) -> Self {
        Self {
            manager,
            cache: ConcordanceCache::new(),
            analytics: Some(Arc::new(KeywordInContext::new())),
            sample_rows: config.sample_rows,
            default_page_size: config.concordance.default_page_size,
        }
    }

    /// Filesystem-backed service on the wall clock
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let store = Arc::new(FsStore::new(config.users_root()));
        let manager = Arc::new(WorkspaceManager::new(store, Arc::new(SystemClock)));
        Self::new(manager, config)
    }

    /// Replace the text analytics implementation (`None` disables it)
    #[must_use]
    pub fn with_analytics(mut self, analytics: Option<Arc<dyn TextAnalytics>>) -> Self {
        self.analytics = analytics;
        self
    }

    /// Residency manager
    #[must_use]
    pub fn manager(&self) -> &Arc<WorkspaceManager> {
        &self.manager
    }

    /// Concordance cache
    #[must_use]
    pub fn cache(&self) -> &ConcordanceCache {
        &self.cache
    }

    fn analytics(&self) -> WorkspaceResult<&Arc<dyn TextAnalytics>> {
        self.analytics.as_ref().ok_or(WorkspaceError::AnalyticsUnavailable)
    }

    fn guess(&self) -> impl FnOnce(&Schema, &DataFrame) -> Option<String> + '_ {
        move |schema, sample| {
            self.analytics
                .as_ref()
                .and_then(|a| a.guess_document_column(schema, sample))
        }
    }

    fn invalidate(&self, user: &UserId, workspace: &WorkspaceId) {
        let removed = self.cache.clear_scope(user, workspace);
        debug!(user = %user, workspace = %workspace, removed, "concordance results invalidated");
    }

    /// Derive a node keeping the rows that match the conditions
    ///
    /// # Errors
    /// Missing workspace or node, compilation failures, evaluation failures.
    pub fn filter(
        &self,
        user: &UserId,
        workspace: &WorkspaceId,
        node: NodeId,
        request: &FilterRequest,
    ) -> WorkspaceResult<NodeView> {
        self.manager.mutate(user, workspace, |ws| {
            let source = ws.require_node(node)?;
            let predicate = compile_filter(request, &source.data().schema()?)?;
            let data = source.data().filter(&predicate)?;
            let name = request
                .new_node_name
                .clone()
                .unwrap_or_else(|| format!("{}_filtered", source.name()));
            let operation = format!("filter({})", source.name());
            let id = ws.add_node(data, name, operation, &[node])?;
            info!(workspace = %workspace, node = %id, predicate = ?predicate, "filtered node derived");
            Ok(NodeView::from_node(ws.require_node(id)?))
        })
    }

    /// Derive a node from a row range and optional column subset
    ///
    /// # Errors
    /// Inverted bounds and unknown columns are validation errors.
    pub fn slice(
        &self,
        user: &UserId,
        workspace: &WorkspaceId,
        node: NodeId,
        request: &SliceRequest,
    ) -> WorkspaceResult<NodeView> {
        let start = request.start_row.unwrap_or(0);
        if let Some(end) = request.end_row.filter(|end| *end < start) {
            return Err(FrameError::InvalidSlice { start, end }.into());
        }
        let length = request.end_row.map(|end| end - start);

        self.manager.mutate(user, workspace, |ws| {
            let source = ws.require_node(node)?;
            if let Some(columns) = &request.columns {
                let schema = source.data().schema()?;
                if let Some(missing) = columns.iter().find(|c| !schema.contains(c)) {
                    return Err(WorkspaceError::InvalidRequest(format!(
                        "column '{missing}' not found. Available columns: {:?}",
                        schema.names()
                    )));
                }
            }
            let data = source.data().slice(start, length, request.columns.as_deref())?;
            let name = format!("{}_sliced", source.name());
            let operation = format!("slice({})", source.name());
            let id = ws.add_node(data, name, operation, &[node])?;
            Ok(NodeView::from_node(ws.require_node(id)?))
        })
    }

    /// Derive a node joining two nodes
    ///
    /// # Errors
    /// Unknown strategy, missing nodes, missing keys.
    pub fn join(&self, user: &UserId, workspace: &WorkspaceId, request: &JoinRequest) -> WorkspaceResult<NodeView> {
        let how: JoinType = request.how.parse()?;
        self.manager.mutate(user, workspace, |ws| {
            let left = ws.require_node(request.left_node)?;
            let right = ws.require_node(request.right_node)?;
            let spec = if how == JoinType::Cross {
                JoinSpec::cross()
            } else {
                let (Some(left_on), Some(right_on)) = (&request.left_on, &request.right_on) else {
                    return Err(FrameError::MissingJoinKeys { how: how.to_string() }.into());
                };
                left.data().schema()?.require(left_on)?;
                right.data().schema()?.require(right_on)?;
                JoinSpec::on(how, left_on.as_str(), right_on.as_str())
            };
            let data = left.data().join(right.data(), &spec)?;
            let name = request
                .new_node_name
                .clone()
                .unwrap_or_else(|| format!("{}_join_{}", left.name(), right.name()));
            let operation = format!("join({}, {})", left.name(), right.name());
            let id = ws.add_node(data, name, operation, &[request.left_node, request.right_node])?;
            info!(workspace = %workspace, node = %id, how = %how, "joined node derived");
            Ok(NodeView::from_node(ws.require_node(id)?))
        })
    }

    /// Rewrite one column's type in place
    ///
    /// The cast is first evaluated on a sample; strict casts on deferred
    /// tables are evaluated on the whole table before anything is replaced.
    ///
    /// # Errors
    /// Compilation failures, sample validation failures, strict parse
    /// failures. The node is left unmodified on error.
    pub fn cast(
        &self,
        user: &UserId,
        workspace: &WorkspaceId,
        node: NodeId,
        spec: &CastSpec,
    ) -> WorkspaceResult<CastOutcome> {
        self.manager.mutate(user, workspace, |ws| {
            let data = ws.require_node(node)?.data();
            let compiled = compile_cast(spec, &data.schema()?)?;
            compiled.validate_sample(&data.head(self.sample_rows)?)?;
            if compiled.is_strict() && data.is_lazy() {
                compiled.validate_sample(&data.collect()?)?;
            }
            let rewritten = data.transform(|df| compiled.apply(df), |lf| compiled.apply_lazy(lf))?;
            ws.replace_node_data(node, rewritten, compiled.describe())?;
            self.invalidate(user, workspace);
            Ok(CastOutcome {
                node,
                cast_info: compiled.info(),
                message: compiled.message(),
            })
        })
    }

    /// Change a node's representation in place
    ///
    /// # Errors
    /// Document column resolution failures, plan failures.
    pub fn convert(
        &self,
        user: &UserId,
        workspace: &WorkspaceId,
        node: NodeId,
        target: NodeKind,
        document_column: Option<&str>,
    ) -> WorkspaceResult<NodeView> {
        self.manager.mutate(user, workspace, |ws| {
            let converted = convert(ws.require_node(node)?.data(), target, document_column, self.guess())?;
            ws.replace_node_data(node, converted, format!("convert({target})"))?;
            self.invalidate(user, workspace);
            Ok(NodeView::from_node(ws.require_node(node)?))
        })
    }

    /// Rename a node
    ///
    /// # Errors
    /// Missing workspace or node.
    pub fn rename_node(
        &self,
        user: &UserId,
        workspace: &WorkspaceId,
        node: NodeId,
        name: &str,
    ) -> WorkspaceResult<NodeView> {
        self.manager.mutate(user, workspace, |ws| {
            ws.rename_node(node, name)?;
            Ok(NodeView::from_node(ws.require_node(node)?))
        })
    }

    /// Change the document column of a text-aware node
    ///
    /// Without an explicit column the column is detected again as if the
    /// node had none. An unchanged column is a no-op.
    ///
    /// # Errors
    /// [`GraphError::NotDocument`] for plain nodes; the column must exist and
    /// be text.
    pub fn reset_document(
        &self,
        user: &UserId,
        workspace: &WorkspaceId,
        node: NodeId,
        column: Option<&str>,
    ) -> WorkspaceResult<NodeView> {
        self.manager.mutate_if_changed(user, workspace, |ws| {
            let data = ws.require_node(node)?.data();
            let current = data.document_column().ok_or(GraphError::NotDocument(node))?;
            let resolved = match column {
                Some(explicit) => resolve_document_column(data, Some(explicit), self.guess())?,
                None => {
                    let plain = if data.is_lazy() {
                        NodeData::Lazy(data.to_lazy())
                    } else {
                        NodeData::Frame(data.collect()?)
                    };
                    resolve_document_column(&plain, None, self.guess())?
                }
            };
            if resolved == current {
                return Ok((NodeView::from_node(ws.require_node(node)?), false));
            }
            let replaced = match data {
                NodeData::Doc(doc) => NodeData::Doc(doc.with_document_column(resolved.as_str())?),
                NodeData::DocLazy(doc) => NodeData::DocLazy(doc.with_document_column(resolved.as_str())?),
                NodeData::Frame(_) | NodeData::Lazy(_) => return Err(GraphError::NotDocument(node).into()),
            };
            ws.replace_node_data(node, replaced, format!("reset_document({resolved})"))?;
            self.invalidate(user, workspace);
            Ok((NodeView::from_node(ws.require_node(node)?), true))
        })
    }

    /// Remove a node; its children become roots
    ///
    /// # Errors
    /// Missing workspace or node.
    pub fn remove_node(&self, user: &UserId, workspace: &WorkspaceId, node: NodeId) -> WorkspaceResult<()> {
        self.manager.mutate(user, workspace, |ws| {
            ws.remove_node(node)?;
            self.invalidate(user, workspace);
            Ok(())
        })
    }

    /// Delete a workspace and its cached results
    ///
    /// # Errors
    /// Storage failures.
    pub fn delete_workspace(&self, user: &UserId, workspace: &WorkspaceId) -> WorkspaceResult<bool> {
        self.manager
            .delete_with(user, workspace, || self.invalidate(user, workspace))
    }

    /// One page of a node's rows
    ///
    /// # Errors
    /// Page and page size must be at least 1.
    pub fn node_page(
        &self,
        user: &UserId,
        workspace: &WorkspaceId,
        node: NodeId,
        page: usize,
        page_size: usize,
    ) -> WorkspaceResult<NodePage> {
        self.manager.read(user, workspace, |ws| {
            let table = ws.require_node(node)?.data().collect()?;
            let pagination = Pagination::new(page, page_size, table.height())?;
            let rows = table.slice_rows(pagination.offset(), Some(page_size));
            let schema = table.table_schema();
            Ok(NodePage {
                data: to_json_records(&rows),
                columns: schema.names(),
                dtypes: schema.iter().map(|(n, t)| (n.to_string(), t)).collect(),
                pagination,
            })
        })
    }

    /// `(rows, columns)`; deferred tables are collected to count rows
    ///
    /// # Errors
    /// Missing workspace or node, plan failures.
    pub fn node_shape(&self, user: &UserId, workspace: &WorkspaceId, node: NodeId) -> WorkspaceResult<(usize, usize)> {
        self.manager.read(user, workspace, |ws| {
            let data = ws.require_node(node)?.data();
            Ok((data.height()?, data.schema()?.len()))
        })
    }

    /// Distinct values of a column
    ///
    /// # Errors
    /// Missing workspace, node or column.
    pub fn unique_values(
        &self,
        user: &UserId,
        workspace: &WorkspaceId,
        node: NodeId,
        column: &str,
    ) -> WorkspaceResult<UniqueValues> {
        self.manager.read(user, workspace, |ws| {
            let table = ws.require_node(node)?.data().collect()?;
            let values = table.unique_values(column)?;
            Ok(UniqueValues {
                column: column.to_string(),
                dtype: table.table_schema().require(column)?,
                unique_count: values.len(),
                sample: values.iter().take(UNIQUE_SAMPLE).map(Value::to_json).collect(),
            })
        })
    }

    fn concordance_base(
        &self,
        user: &UserId,
        workspace: &WorkspaceId,
        node: &Node,
        request: &ConcordanceRequest,
    ) -> WorkspaceResult<Arc<DataFrame>> {
        let analytics = self.analytics()?;
        if node.data().document_column().is_none() {
            return Err(GraphError::NotDocument(node.id()).into());
        }
        node.data().schema()?.require(&request.column)?;
        let key = ConcordanceKey {
            user: user.clone(),
            workspace: workspace.clone(),
            node: node.id(),
            column: request.column.clone(),
            params: request.params(),
        };
        self.cache.get_or_try_insert_with(key, || {
            let table = node.data().collect()?;
            Ok(analytics.concordance(&table, &request.column, &request.params())?)
        })
    }

    fn with_source_rows(node: &Node, matches: &DataFrame) -> WorkspaceResult<DataFrame> {
        let source = node.data().collect()?.with_index_column(DOCUMENT_INDEX)?;
        Ok(matches.join_on(&source, &JoinSpec::on(JoinType::Left, DOCUMENT_INDEX, DOCUMENT_INDEX))?)
    }

    /// Sorted, paginated keyword-in-context matches
    ///
    /// The unsorted result is cached per search; sorting and pagination are
    /// applied per request.
    ///
    /// # Errors
    /// [`WorkspaceError::AnalyticsUnavailable`], [`GraphError::NotDocument`],
    /// missing column, invalid search.
    pub fn concordance(
        &self,
        user: &UserId,
        workspace: &WorkspaceId,
        node: NodeId,
        request: &ConcordanceRequest,
    ) -> WorkspaceResult<ConcordancePage> {
        let page_size = request.page_size.unwrap_or(self.default_page_size);
        self.manager.read(user, workspace, |ws| {
            let source = ws.require_node(node)?;
            let base = self.concordance_base(user, workspace, source, request)?;
            let mut result = if request.show_metadata {
                Self::with_source_rows(source, &base)?
            } else {
                (*base).clone()
            };

            let sort_by = request
                .sort_by
                .clone()
                .filter(|column| result.table_schema().contains(column));
            if let Some(column) = &sort_by {
                result = result.sort_rows(column, request.sort_order == SortOrder::Desc)?;
            }

            let pagination = Pagination::new(request.page, page_size, result.height())?;
            let rows = result.slice_rows(pagination.offset(), Some(page_size));
            Ok(ConcordancePage {
                data: to_json_records(&rows),
                columns: result.table_schema().names(),
                total_matches: result.height(),
                pagination,
                sorting: Sorting {
                    sort_by,
                    sort_order: request.sort_order,
                },
            })
        })
    }

    /// Full text and metadata of a concordance match's source row
    ///
    /// # Errors
    /// [`WorkspaceError::RowOutOfRange`], missing column.
    pub fn concordance_detail(
        &self,
        user: &UserId,
        workspace: &WorkspaceId,
        node: NodeId,
        document_idx: usize,
        text_column: &str,
    ) -> WorkspaceResult<ConcordanceDetail> {
        self.manager.read(user, workspace, |ws| {
            let table = ws.require_node(node)?.data().collect()?;
            table.table_schema().require(text_column)?;
            let row = table.record(document_idx).ok_or(WorkspaceError::RowOutOfRange {
                node,
                index: document_idx,
                rows: table.height(),
            })?;
            let full_record: crate::types::Record = row.iter().map(|(k, v)| (k.clone(), v.to_json())).collect();
            let mut metadata = full_record.clone();
            let text = metadata.shift_remove(text_column).unwrap_or(serde_json::Value::Null);
            Ok(ConcordanceDetail {
                document_idx,
                text_column: text_column.to_string(),
                text,
                metadata,
                full_record,
            })
        })
    }

    /// Derive a node holding every match joined to its source row
    ///
    /// The result stays text-aware while the source document column survives.
    ///
    /// # Errors
    /// Same as [`Self::concordance`].
    pub fn detach_concordance(
        &self,
        user: &UserId,
        workspace: &WorkspaceId,
        node: NodeId,
        request: &ConcordanceRequest,
        new_node_name: Option<&str>,
    ) -> WorkspaceResult<NodeView> {
        self.manager.mutate(user, workspace, |ws| {
            let source = ws.require_node(node)?;
            let base = self.concordance_base(user, workspace, source, request)?;
            let joined = Self::with_source_rows(source, &base)?;
            let text_column = source
                .data()
                .document_column()
                .filter(|column| joined.table_schema().get(column).is_some_and(DataType::is_text));
            let data = match text_column {
                Some(column) => NodeData::Doc(DocDataFrame::new(joined, column)?),
                None => NodeData::Frame(joined),
            };
            let name = new_node_name.map_or_else(
                || format!("{}_conc_{}", source.name(), request.search_word),
                str::to_string,
            );
            let id = ws.add_node(data, name, "concordance_detach", &[node])?;
            info!(workspace = %workspace, node = %id, search = %request.search_word, "concordance detached");
            Ok(NodeView::from_node(ws.require_node(id)?))
        })
    }

    /// Drop cached concordances of a workspace; returns how many were removed
    #[must_use]
    pub fn clear_concordance_cache(&self, user: &UserId, workspace: &WorkspaceId) -> usize {
        self.cache.clear_scope(user, workspace)
    }
}
