//! Workspace persistence

use crate::error::StorageError;
use crate::types::UserId;
use dw_graph::{GraphError, Workspace, WorkspaceId};
use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const FILE_PREFIX: &str = "workspace_";
const FILE_SUFFIX: &str = ".json";

/// Durable storage of workspaces, one document per workspace
pub trait WorkspaceStore: Send + Sync + std::fmt::Debug {
    /// Load a workspace; `None` when it was never saved or has been deleted
    ///
    /// # Errors
    /// I/O failures, files that do not decode to a valid workspace, and files
    /// holding a workspace other than `id`.
    fn load(&self, user: &UserId, id: &WorkspaceId) -> Result<Option<Workspace>, StorageError>;

    /// Write a workspace, replacing any previous version
    ///
    /// # Errors
    /// I/O and encoding failures.
    fn save(&self, user: &UserId, workspace: &Workspace) -> Result<(), StorageError>;

    /// Remove a workspace; returns whether it existed
    ///
    /// # Errors
    /// I/O failures other than absence.
    fn delete(&self, user: &UserId, id: &WorkspaceId) -> Result<bool, StorageError>;

    /// Ids of every stored workspace of a user, sorted
    ///
    /// # Errors
    /// I/O failures other than a missing user folder.
    fn list(&self, user: &UserId) -> Result<Vec<WorkspaceId>, StorageError>;

    /// Whether a workspace is stored
    ///
    /// # Errors
    /// I/O failures.
    fn exists(&self, user: &UserId, id: &WorkspaceId) -> Result<bool, StorageError>;
}

/// JSON files under `{root}/user_{user}/workspaces/workspace_{id}.json`
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Store rooted at the folder holding every user's folder
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root folder
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Folder holding a user's workspace files
    #[must_use]
    pub fn user_dir(&self, user: &UserId) -> PathBuf {
        self.root.join(format!("user_{user}")).join("workspaces")
    }

    /// File of one workspace
    #[must_use]
    pub fn workspace_path(&self, user: &UserId, id: &WorkspaceId) -> PathBuf {
        self.user_dir(user).join(format!("{FILE_PREFIX}{id}{FILE_SUFFIX}"))
    }
}

fn id_from_file_name(name: &str) -> Option<WorkspaceId> {
    let id = name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX)?;
    WorkspaceId::parse(id).ok()
}

impl WorkspaceStore for FsStore {
    fn load(&self, user: &UserId, id: &WorkspaceId) -> Result<Option<Workspace>, StorageError> {
        let path = self.workspace_path(user, id);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io(path, e)),
        };
        let workspace = Workspace::from_json(&text).map_err(|source| StorageError::Corrupt {
            path: path.clone(),
            source,
        })?;
        if workspace.id() != id {
            return Err(StorageError::Corrupt {
                source: GraphError::Malformed(format!(
                    "file of workspace '{id}' holds workspace '{}'",
                    workspace.id()
                )),
                path,
            });
        }
        debug!(user = %user, workspace = %id, nodes = workspace.len(), "workspace loaded");
        Ok(Some(workspace))
    }

    fn save(&self, user: &UserId, workspace: &Workspace) -> Result<(), StorageError> {
        let dir = self.user_dir(user);
        std::fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
        let json = workspace.to_json().map_err(|source| StorageError::Encode {
            id: workspace.id().clone(),
            source,
        })?;

        let path = self.workspace_path(user, workspace.id());
        let mut file = tempfile::NamedTempFile::new_in(&dir).map_err(|e| StorageError::io(&dir, e))?;
        file.write_all(json.as_bytes())
            .and_then(|()| file.as_file().sync_all())
            .map_err(|e| StorageError::io(file.path(), e))?;
        file.persist(&path).map_err(|e| StorageError::io(&path, e.error))?;
        debug!(user = %user, workspace = %workspace.id(), bytes = json.len(), "workspace saved");
        Ok(())
    }

    fn delete(&self, user: &UserId, id: &WorkspaceId) -> Result<bool, StorageError> {
        let path = self.workspace_path(user, id);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    fn list(&self, user: &UserId) -> Result<Vec<WorkspaceId>, StorageError> {
        let dir = self.user_dir(user);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(dir, e)),
        };
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(&dir, e))?;
            let name = entry.file_name();
            match name.to_str().and_then(id_from_file_name) {
                Some(id) => ids.push(id),
                None => warn!(file = ?entry.path(), "ignoring unexpected file in workspace folder"),
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn exists(&self, user: &UserId, id: &WorkspaceId) -> Result<bool, StorageError> {
        let path = self.workspace_path(user, id);
        path.try_exists().map_err(|e| StorageError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn user() -> UserId {
        UserId::new("u1").unwrap()
    }

    #[test]
    fn save_load_delete() {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path());
        let ws = Workspace::new(WorkspaceId::generate(), "w", "", Utc::now());

        assert!(store.load(&user(), ws.id()).unwrap().is_none());
        store.save(&user(), &ws).unwrap();
        assert!(store.workspace_path(&user(), ws.id()).ends_with(format!("user_u1/workspaces/workspace_{}.json", ws.id())));
        assert!(store.exists(&user(), ws.id()).unwrap());
        assert_eq!(store.load(&user(), ws.id()).unwrap().unwrap().name(), "w");
        assert_eq!(store.list(&user()).unwrap(), vec![ws.id().clone()]);

        assert!(store.delete(&user(), ws.id()).unwrap());
        assert!(!store.delete(&user(), ws.id()).unwrap());
        assert!(store.list(&user()).unwrap().is_empty());
    }

    #[test]
    fn stray_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path());
        std::fs::create_dir_all(store.user_dir(&user())).unwrap();
        std::fs::write(store.user_dir(&user()).join("notes.txt"), "x").unwrap();
        assert!(store.list(&user()).unwrap().is_empty());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path());
        let id = WorkspaceId::generate();
        std::fs::create_dir_all(store.user_dir(&user())).unwrap();
        std::fs::write(store.workspace_path(&user(), &id), "{not json").unwrap();
        assert!(matches!(
            store.load(&user(), &id),
            Err(StorageError::Corrupt { .. })
        ));
    }

    #[test]
    fn file_holding_another_workspace_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path());
        let ws = Workspace::new(WorkspaceId::generate(), "w", "", Utc::now());
        store.save(&user(), &ws).unwrap();
        let other = WorkspaceId::generate();
        std::fs::copy(store.workspace_path(&user(), ws.id()), store.workspace_path(&user(), &other)).unwrap();
        assert!(matches!(
            store.load(&user(), &other),
            Err(StorageError::Corrupt { source: GraphError::Malformed(_), .. })
        ));
        assert!(store.load(&user(), ws.id()).unwrap().is_some());
    }
}
