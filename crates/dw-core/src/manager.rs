//! Resident workspace manager
//!
//! Keeps at most one workspace in memory per user:
//! - Load on demand, persisting the outgoing workspace before a switch
//! - Identity-preserving access to the resident workspace
//! - Guarded mutations that persist on success
//!
//! Every operation holds the user's slot lock for its whole duration, so
//! requests of one user are serialized while different users proceed in
//! parallel.

use crate::clock::Clock;
use crate::error::{OperationResult, WorkspaceError, WorkspaceResult};
use crate::store::WorkspaceStore;
use crate::types::UserId;
use dashmap::DashMap;
use dw_graph::{GraphView, NodeData, NodeId, Workspace, WorkspaceId, WorkspaceSummary};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shared handle to a resident workspace
pub type SharedWorkspace = Arc<RwLock<Workspace>>;

#[derive(Debug)]
struct Resident {
    id: WorkspaceId,
    workspace: SharedWorkspace,
}

type Slot = Arc<Mutex<Option<Resident>>>;

/// Per-user residency and persistence of workspaces
#[derive(Debug)]
pub struct WorkspaceManager {
    store: Arc<dyn WorkspaceStore>,
    clock: Arc<dyn Clock>,
    resident: DashMap<UserId, Slot>,
}

impl WorkspaceManager {
    /// Create manager over a store
    #[must_use]
    pub fn new(store: Arc<dyn WorkspaceStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            resident: DashMap::new(),
        }
    }

    /// Backing store
    #[must_use]
    pub fn store(&self) -> &Arc<dyn WorkspaceStore> {
        &self.store
    }

    fn slot(&self, user: &UserId) -> Slot {
        Arc::clone(self.resident.entry(user.clone()).or_default().value())
    }

    fn persist(&self, user: &UserId, workspace: &Workspace) -> WorkspaceResult<()> {
        self.store.save(user, workspace)?;
        Ok(())
    }

    /// Persist and drop the resident workspace
    fn evict(&self, user: &UserId, slot: &mut Option<Resident>, save: bool) -> WorkspaceResult<bool> {
        let Some(current) = slot.as_ref() else {
            return Ok(false);
        };
        if save {
            self.persist(user, &current.workspace.read())?;
        }
        info!(user = %user, workspace = %current.id, saved = save, "workspace evicted");
        *slot = None;
        Ok(true)
    }

    fn install(&self, user: &UserId, slot: &mut Option<Resident>, workspace: Workspace) -> WorkspaceResult<SharedWorkspace> {
        self.evict(user, slot, true)?;
        let id = workspace.id().clone();
        let shared = Arc::new(RwLock::new(workspace));
        info!(user = %user, workspace = %id, "workspace resident");
        *slot = Some(Resident {
            id,
            workspace: Arc::clone(&shared),
        });
        Ok(shared)
    }

    fn activate(
        &self,
        user: &UserId,
        slot: &mut Option<Resident>,
        id: &WorkspaceId,
    ) -> WorkspaceResult<Option<SharedWorkspace>> {
        if let Some(current) = slot.as_ref().filter(|r| r.id == *id) {
            return Ok(Some(Arc::clone(&current.workspace)));
        }
        match self.store.load(user, id)? {
            Some(workspace) => self.install(user, slot, workspace).map(Some),
            None => Ok(None),
        }
    }

    fn require(&self, user: &UserId, slot: &mut Option<Resident>, id: &WorkspaceId) -> WorkspaceResult<SharedWorkspace> {
        self.activate(user, slot, id)?
            .ok_or_else(|| WorkspaceError::WorkspaceNotFound(id.clone()))
    }

    /// Resident workspace, loading it (and persisting the previous one) on a switch
    ///
    /// Returns the same handle while the workspace stays resident; `None`
    /// when no such workspace is stored.
    ///
    /// # Errors
    /// Storage failures while persisting the outgoing or loading the incoming
    /// workspace.
    pub fn get(&self, user: &UserId, id: &WorkspaceId) -> WorkspaceResult<Option<SharedWorkspace>> {
        let slot = self.slot(user);
        let mut guard = slot.lock();
        self.activate(user, &mut guard, id)
    }

    /// Create, persist and install an empty workspace
    ///
    /// # Errors
    /// Storage failures; [`WorkspaceError::AlreadyExists`] if the generated id
    /// is taken.
    pub fn create(&self, user: &UserId, name: &str, description: &str) -> WorkspaceResult<SharedWorkspace> {
        let slot = self.slot(user);
        let mut guard = slot.lock();
        let id = WorkspaceId::generate();
        if self.store.exists(user, &id)? {
            return Err(WorkspaceError::AlreadyExists(id));
        }
        self.evict(user, &mut guard, true)?;
        let workspace = Workspace::new(id, name, description, self.clock.now());
        self.persist(user, &workspace)?;
        info!(user = %user, workspace = %workspace.id(), name, "workspace created");
        self.install(user, &mut guard, workspace)
    }

    /// Switch the resident workspace; `None` closes the current one
    ///
    /// Returns whether the requested state was reached.
    ///
    /// # Errors
    /// Storage failures.
    pub fn set_current(&self, user: &UserId, id: Option<&WorkspaceId>) -> WorkspaceResult<bool> {
        let slot = self.slot(user);
        let mut guard = slot.lock();
        match id {
            None => {
                self.evict(user, &mut guard, true)?;
                Ok(true)
            }
            Some(id) => Ok(self.activate(user, &mut guard, id)?.is_some()),
        }
    }

    /// Id of the resident workspace
    #[must_use]
    pub fn current_id(&self, user: &UserId) -> Option<WorkspaceId> {
        let slot = self.slot(user);
        let guard = slot.lock();
        guard.as_ref().map(|r| r.id.clone())
    }

    /// Drop the resident workspace, optionally persisting it first
    ///
    /// Returns whether a workspace was resident.
    ///
    /// # Errors
    /// Storage failures while persisting.
    pub fn unload(&self, user: &UserId, save: bool) -> WorkspaceResult<bool> {
        let slot = self.slot(user);
        let mut guard = slot.lock();
        self.evict(user, &mut guard, save)
    }

    /// Delete a stored workspace, evicting it first when resident
    ///
    /// Returns whether the file existed.
    ///
    /// # Errors
    /// Storage failures.
    pub fn delete(&self, user: &UserId, id: &WorkspaceId) -> WorkspaceResult<bool> {
        self.delete_with(user, id, || {})
    }

    /// Like [`Self::delete`], running `on_deleted` before the user's lock is released
    ///
    /// # Errors
    /// Storage failures; `on_deleted` does not run on error.
    pub fn delete_with(&self, user: &UserId, id: &WorkspaceId, on_deleted: impl FnOnce()) -> WorkspaceResult<bool> {
        let slot = self.slot(user);
        let mut guard = slot.lock();
        if guard.as_ref().is_some_and(|r| r.id == *id) {
            self.evict(user, &mut guard, true)?;
        }
        let existed = self.store.delete(user, id)?;
        on_deleted();
        info!(user = %user, workspace = %id, existed, "workspace deleted");
        Ok(existed)
    }

    /// Summaries of every stored workspace of a user
    ///
    /// The resident workspace is summarized from memory; others are loaded
    /// transiently and not made resident. Unreadable files are skipped.
    ///
    /// # Errors
    /// Storage failures while listing.
    pub fn list_summaries(&self, user: &UserId) -> WorkspaceResult<IndexMap<WorkspaceId, WorkspaceSummary>> {
        let slot = self.slot(user);
        let guard = slot.lock();
        let mut summaries = IndexMap::new();
        for id in self.store.list(user)? {
            if let Some(current) = guard.as_ref().filter(|r| r.id == id) {
                summaries.insert(id, current.workspace.read().summary());
                continue;
            }
            match self.store.load(user, &id) {
                Ok(Some(workspace)) => {
                    summaries.insert(id, workspace.summary());
                }
                Ok(None) => {}
                Err(error) => warn!(user = %user, workspace = %id, %error, "skipping unreadable workspace"),
            }
        }
        Ok(summaries)
    }

    /// Read access to a workspace, loading it if needed
    ///
    /// # Errors
    /// [`WorkspaceError::WorkspaceNotFound`], storage failures, and whatever
    /// `f` returns.
    pub fn read<T>(
        &self,
        user: &UserId,
        id: &WorkspaceId,
        f: impl FnOnce(&Workspace) -> WorkspaceResult<T>,
    ) -> WorkspaceResult<T> {
        let slot = self.slot(user);
        let mut guard = slot.lock();
        let shared = self.require(user, &mut guard, id)?;
        let workspace = shared.read();
        f(&workspace)
    }

    /// Apply a mutation and persist the workspace when it succeeds
    ///
    /// A mutation that fails, or whose result cannot be persisted, leaves the
    /// resident workspace as it was. Successful mutations stamp
    /// `modified_at`.
    ///
    /// # Errors
    /// [`WorkspaceError::WorkspaceNotFound`], storage failures, and whatever
    /// `f` returns.
    pub fn mutate<T>(
        &self,
        user: &UserId,
        id: &WorkspaceId,
        f: impl FnOnce(&mut Workspace) -> WorkspaceResult<T>,
    ) -> WorkspaceResult<T> {
        self.mutate_if_changed(user, id, |ws| f(ws).map(|value| (value, true)))
    }

    /// Like [`Self::mutate`], but persists only when `f` reports a change
    ///
    /// # Errors
    /// [`WorkspaceError::WorkspaceNotFound`], storage failures, and whatever
    /// `f` returns.
    pub fn mutate_if_changed<T>(
        &self,
        user: &UserId,
        id: &WorkspaceId,
        f: impl FnOnce(&mut Workspace) -> WorkspaceResult<(T, bool)>,
    ) -> WorkspaceResult<T> {
        let slot = self.slot(user);
        let mut guard = slot.lock();
        let shared = self.require(user, &mut guard, id)?;
        let mut workspace = shared.write();
        let snapshot = workspace.clone();
        let result = f(&mut workspace).and_then(|(value, changed)| {
            if changed {
                workspace.touch(self.clock.now());
                self.persist(user, &workspace)?;
                debug!(user = %user, workspace = %id, "workspace mutated");
            }
            Ok(value)
        });
        if result.is_err() {
            *workspace = snapshot;
            debug!(user = %user, workspace = %id, "mutation rolled back");
        }
        result
    }

    /// Guarded mutation returning a uniform outcome instead of an error
    pub fn execute_safe_operation<T>(
        &self,
        user: &UserId,
        id: &WorkspaceId,
        f: impl FnOnce(&mut Workspace) -> WorkspaceResult<T>,
    ) -> OperationResult<T> {
        let result = self.mutate(user, id, f);
        if let Err(error) = &result {
            warn!(user = %user, workspace = %id, kind = ?error.kind(), %error, "operation failed");
        }
        OperationResult::from_result(result, "Operation completed successfully")
    }

    /// Derive a node and persist
    ///
    /// # Errors
    /// Missing workspace or parent, storage failures.
    pub fn add_node(
        &self,
        user: &UserId,
        id: &WorkspaceId,
        data: NodeData,
        name: &str,
        operation: &str,
        parents: &[NodeId],
    ) -> WorkspaceResult<NodeId> {
        self.mutate(user, id, |ws| Ok(ws.add_node(data, name, operation, parents)?))
    }

    /// Remove a node and persist; descendants become roots
    ///
    /// # Errors
    /// Missing workspace or node, storage failures.
    pub fn remove_node(&self, user: &UserId, id: &WorkspaceId, node: NodeId) -> WorkspaceResult<()> {
        self.mutate(user, id, |ws| {
            ws.remove_node(node)?;
            Ok(())
        })
    }

    /// Workspace metadata and counts
    ///
    /// # Errors
    /// Missing workspace, storage failures.
    pub fn workspace_info(&self, user: &UserId, id: &WorkspaceId) -> WorkspaceResult<WorkspaceSummary> {
        self.read(user, id, |ws| Ok(ws.summary()))
    }

    /// Rename a workspace and persist
    ///
    /// # Errors
    /// Missing workspace, storage failures.
    pub fn rename_workspace(&self, user: &UserId, id: &WorkspaceId, name: &str) -> WorkspaceResult<WorkspaceSummary> {
        self.mutate(user, id, |ws| {
            ws.set_name(name);
            Ok(())
        })?;
        self.workspace_info(user, id)
    }

    /// Persist a workspace as it is
    ///
    /// # Errors
    /// Missing workspace, storage failures.
    pub fn save(&self, user: &UserId, id: &WorkspaceId) -> WorkspaceResult<()> {
        self.read(user, id, |ws| self.persist(user, ws))
    }

    /// Copy a workspace under a new id without making the copy resident
    ///
    /// # Errors
    /// Missing workspace, storage failures.
    pub fn save_as(&self, user: &UserId, id: &WorkspaceId, name: &str) -> WorkspaceResult<WorkspaceSummary> {
        self.read(user, id, |ws| {
            let copy = ws.duplicate(WorkspaceId::generate(), name);
            self.persist(user, &copy)?;
            info!(user = %user, source = %id, copy = %copy.id(), "workspace copied");
            Ok(copy.summary())
        })
    }

    /// Nodes and edges of a workspace
    ///
    /// # Errors
    /// Missing workspace, storage failures.
    pub fn graph(&self, user: &UserId, id: &WorkspaceId) -> WorkspaceResult<GraphView> {
        self.read(user, id, |ws| Ok(ws.graph_view()))
    }

    /// Persist and evict every resident workspace; returns how many there were
    ///
    /// # Errors
    /// The first storage failure; remaining users are still processed.
    pub fn shutdown(&self) -> WorkspaceResult<usize> {
        let users: Vec<(UserId, Slot)> = self
            .resident
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect();
        let mut evicted = 0;
        let mut first_error = None;
        for (user, slot) in users {
            let mut guard = slot.lock();
            match self.evict(&user, &mut guard, true) {
                Ok(true) => evicted += 1,
                Ok(false) => {}
                Err(error) => {
                    warn!(user = %user, %error, "failed to persist on shutdown");
                    first_error.get_or_insert(error);
                }
            }
        }
        info!(evicted, "workspace manager shut down");
        first_error.map_or(Ok(evicted), Err)
    }
}
