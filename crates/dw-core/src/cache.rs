//! Concordance result cache using moka
//!
//! Stores unsorted, unpaginated concordance results keyed by the search
//! parameters. Sorting and pagination are reapplied per request.
//! Entries are never evicted automatically; callers clear a
//! `(user, workspace)` scope explicitly.

use crate::types::UserId;
use dw_frame::DataFrame;
use dw_graph::{NodeId, WorkspaceId};
use dw_text::ConcordanceParams;
use moka::sync::Cache;
use std::sync::Arc;
use tracing::debug;

/// Identity of a cached concordance
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConcordanceKey {
    /// Owner
    pub user: UserId,
    /// Workspace of the node
    pub workspace: WorkspaceId,
    /// Node searched
    pub node: NodeId,
    /// Column searched
    pub column: String,
    /// Search parameters
    pub params: ConcordanceParams,
}

impl ConcordanceKey {
    fn in_scope(&self, user: &UserId, workspace: &WorkspaceId) -> bool {
        self.user == *user && self.workspace == *workspace
    }
}

/// Process-wide concordance cache
#[derive(Debug, Clone)]
pub struct ConcordanceCache {
    inner: Cache<ConcordanceKey, Arc<DataFrame>>,
}

impl Default for ConcordanceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ConcordanceCache {
    /// Create unbounded cache
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Cache::builder().build(),
        }
    }

    /// Cached result
    #[must_use]
    pub fn get(&self, key: &ConcordanceKey) -> Option<Arc<DataFrame>> {
        let hit = self.inner.get(key);
        debug!(node = %key.node, search = %key.params.search_word, hit = hit.is_some(), "concordance cache lookup");
        hit
    }

    /// Store a result
    pub fn put(&self, key: ConcordanceKey, table: Arc<DataFrame>) {
        self.inner.insert(key, table);
    }

    /// Cached result, computing and storing it on a miss
    ///
    /// # Errors
    /// Propagates the computation's error; nothing is stored then.
    pub fn get_or_try_insert_with<E>(
        &self,
        key: ConcordanceKey,
        compute: impl FnOnce() -> Result<DataFrame, E>,
    ) -> Result<Arc<DataFrame>, E> {
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }
        let table = Arc::new(compute()?);
        self.put(key, Arc::clone(&table));
        Ok(table)
    }

    /// Drop every entry of a user's workspace; returns how many were removed
    pub fn clear_scope(&self, user: &UserId, workspace: &WorkspaceId) -> usize {
        let keys: Vec<Arc<ConcordanceKey>> = self
            .inner
            .iter()
            .filter(|(key, _)| key.in_scope(user, workspace))
            .map(|(key, _)| key)
            .collect();
        for key in &keys {
            self.inner.invalidate(key.as_ref());
        }
        if !keys.is_empty() {
            debug!(user = %user, workspace = %workspace, removed = keys.len(), "concordance cache scope cleared");
        }
        keys.len()
    }

    /// Check if cache contains key
    #[inline]
    #[must_use]
    pub fn contains(&self, key: &ConcordanceKey) -> bool {
        self.inner.contains_key(key)
    }

    /// Exact number of live entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.iter().count()
    }

    /// No live entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
