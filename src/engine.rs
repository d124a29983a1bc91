//! The file-system engine
//!
//! Owns the in-memory workspace and the pane layout on top of it. Every
//! mutation is applied to memory first, then persisted: to the remote
//! provider while in remote mode, and always to the local snapshot. A remote
//! failure of any kind flips the engine into local mode; the caller still
//! gets success because the local snapshot already holds the change.
//!
//! Operations take `&mut self`, so one engine only ever runs one operation
//! at a time. Share it behind a lock (see `Workspace`) to keep it that way.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, StorageError};
use crate::models::{
    ConnectionConfig, ConnectionStatus, File, FilePatch, FileSystem, Folder, FolderPatch,
    ROOT_FOLDER_ID,
};
use crate::panes::{Pane, PaneManager, PaneState};
use crate::storage::{
    push_snapshot, with_timeout, LocalStorageProvider, Mutation, StorageProvider, DEFAULT_TIMEOUT,
};
use crate::tree::{self, Subtree};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    Remote,
    Local,
}

/// What the status indicator shows.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub mode: StorageMode,
    pub remote_configured: bool,
    pub last_error: Option<String>,
    pub degraded_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SyncOutcome {
    pub success: bool,
    pub message: String,
}

pub struct FileSystemEngine {
    fs: FileSystem,
    panes: PaneManager,
    local: LocalStorageProvider,
    remote: Option<Box<dyn StorageProvider>>,
    mode: StorageMode,
    timeout: Duration,
    last_error: Option<String>,
    degraded_at: Option<DateTime<Utc>>,
    last_id: i64,
}

impl FileSystemEngine {
    /// An engine that only ever persists locally.
    pub fn new(local: LocalStorageProvider) -> Self {
        Self {
            fs: FileSystem::seed(),
            panes: PaneManager::new(),
            local,
            remote: None,
            mode: StorageMode::Local,
            timeout: DEFAULT_TIMEOUT,
            last_error: None,
            degraded_at: None,
            last_id: 0,
        }
    }

    /// An engine that persists to `remote`, falling back to `local`.
    pub fn with_remote(local: LocalStorageProvider, remote: Box<dyn StorageProvider>) -> Self {
        Self {
            remote: Some(remote),
            mode: StorageMode::Remote,
            ..Self::new(local)
        }
    }

    /// Budget for each remote call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Swaps the remote backend. The engine stays in local mode until a
    /// successful `sync` brings it back to remote.
    pub fn set_remote(&mut self, remote: Option<Box<dyn StorageProvider>>) {
        self.remote = remote;
        self.mode = StorageMode::Local;
        // the new backend has never seen the local tree
        self.note_unsynced();
    }

    pub fn file_system(&self) -> &FileSystem {
        &self.fs
    }

    pub fn panes(&self) -> &PaneManager {
        &self.panes
    }

    pub fn panes_mut(&mut self) -> &mut PaneManager {
        &mut self.panes
    }

    pub fn mode(&self) -> StorageMode {
        self.mode
    }

    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            mode: self.mode,
            remote_configured: self.remote.is_some(),
            last_error: self.last_error.clone(),
            degraded_at: self.degraded_at,
        }
    }

    /// Fetches the workspace from the active backend.
    ///
    /// Never fails: a remote failure (or a remote that never answers) falls
    /// back to the local snapshot, and an unreadable local snapshot falls
    /// back to the seed workspace.
    ///
    /// While the local snapshot holds changes the remote lacks, even from a
    /// previous session, the remote is not read at all: the engine starts in
    /// local mode and only `sync` brings it back.
    pub async fn load(&mut self) -> &FileSystem {
        if self.mode == StorageMode::Remote && self.remote.is_some() {
            if let Some(since) = self.local.unsynced_since() {
                log::warn!(
                    "Local changes since {} were never synced, staying on local storage",
                    since
                );
                self.mode = StorageMode::Local;
                self.last_error = Some("Local changes have not been synced yet".to_string());
                self.degraded_at = Some(since);
            }
        }

        let remote_result = match (&self.remote, self.mode) {
            (Some(remote), StorageMode::Remote) => {
                let fetch = async {
                    remote.init().await?;
                    remote.load().await
                };
                Some(with_timeout(self.timeout, fetch).await)
            }
            _ => None,
        };

        self.fs = match remote_result {
            Some(Ok(mut fs)) => {
                ensure_root(&mut fs);
                if let Err(e) = self.local.save_snapshot(&fs) {
                    log::error!("Failed to cache remote workspace locally: {}", e);
                }
                fs
            }
            Some(Err(e)) => {
                self.degrade("load", e);
                self.load_local()
            }
            None => self.load_local(),
        };

        self.drop_stale_tabs();
        &self.fs
    }

    fn load_local(&self) -> FileSystem {
        if !self.local.has_snapshot() {
            log::info!("No local snapshot yet, starting from the default workspace");
        }
        match self.local.read_snapshot() {
            Ok(mut fs) => {
                ensure_root(&mut fs);
                fs
            }
            Err(e) => {
                log::error!(
                    "Local snapshot at {} is unreadable, starting from seed: {}",
                    self.local.snapshot_file().display(),
                    e
                );
                FileSystem::seed()
            }
        }
    }

    fn drop_stale_tabs(&mut self) {
        let fs = &self.fs;
        self.panes.retain_files(|id| fs.file(id).is_some());
    }

    /// Flips into local mode after a remote failure.
    fn degrade(&mut self, operation: &str, error: StorageError) {
        let backend = self.remote.as_ref().map(|r| r.name()).unwrap_or("remote");
        if error.is_permanent() {
            // the server understood and refused; our data and theirs disagree
            log::error!("{} rejected by {} storage: {}", operation, backend, error);
        } else if self.mode == StorageMode::Remote {
            log::warn!(
                "{} on {} storage failed, switching to local storage: {}",
                operation,
                backend,
                error
            );
        } else {
            log::warn!("{} on {} storage failed: {}", operation, backend, error);
        }
        self.mode = StorageMode::Local;
        self.last_error = Some(error.to_string());
        self.degraded_at = Some(Utc::now());
    }

    /// Pushes `mutations` to the remote (if active) in order, stopping at
    /// the first failure, then writes the local snapshot.
    async fn persist(&mut self, mutations: Vec<Mutation>) {
        if self.mode == StorageMode::Remote {
            if let Some(remote) = &self.remote {
                let mut failure = None;
                for mutation in &mutations {
                    if let Err(e) = with_timeout(self.timeout, mutation.apply(remote.as_ref())).await {
                        failure = Some((mutation.describe(), e));
                        break;
                    }
                }
                if let Some((operation, e)) = failure {
                    self.degrade(&operation, e);
                }
            }
        }

        if let Err(e) = self.local.save_snapshot(&self.fs) {
            log::error!("Failed to write local snapshot: {}", e);
        }
        if self.mode == StorageMode::Local {
            self.note_unsynced();
        }
    }

    /// Persists the fact that local data is ahead of the remote, if there
    /// is a remote to be ahead of.
    fn note_unsynced(&self) {
        if self.remote.is_none() {
            return;
        }
        let since = self.degraded_at.unwrap_or_else(Utc::now);
        if let Err(e) = self.local.mark_unsynced(since) {
            log::error!("Failed to record unsynced local changes: {}", e);
        }
    }

    /// Timestamp-derived, strictly increasing, never reused within the
    /// current workspace.
    fn next_id(&mut self) -> String {
        let mut candidate = Utc::now().timestamp_millis().max(self.last_id + 1);
        while self.fs.contains_id(&candidate.to_string()) {
            candidate += 1;
        }
        self.last_id = candidate;
        candidate.to_string()
    }

    fn require_folder(&self, id: &str) -> Result<&Folder, EngineError> {
        self.fs
            .folder(id)
            .ok_or_else(|| EngineError::FolderNotFound(id.to_string()))
    }

    fn require_file(&self, id: &str) -> Result<&File, EngineError> {
        self.fs
            .file(id)
            .ok_or_else(|| EngineError::FileNotFound(id.to_string()))
    }

    fn require_parent(&self, id: &str) -> Result<(), EngineError> {
        if self.fs.folder(id).is_none() {
            return Err(EngineError::ParentNotFound(id.to_string()));
        }
        Ok(())
    }

    pub async fn create_folder(&mut self, name: &str, parent_id: &str) -> Result<Folder, EngineError> {
        let name = valid_name(name)?;
        self.require_parent(parent_id)?;

        let folder = Folder::new(self.next_id(), name, Some(parent_id.to_string()));
        self.fs.folders.push(folder.clone());
        self.persist(vec![Mutation::CreateFolder(folder.clone())]).await;
        Ok(folder)
    }

    pub async fn create_file(
        &mut self,
        name: &str,
        parent_id: &str,
        content: &str,
    ) -> Result<File, EngineError> {
        let name = valid_name(name)?;
        self.require_parent(parent_id)?;

        let file = File::new(self.next_id(), name, parent_id, content);
        self.fs.files.push(file.clone());
        self.persist(vec![Mutation::CreateFile(file.clone())]).await;
        Ok(file)
    }

    pub async fn rename_folder(&mut self, id: &str, new_name: &str) -> Result<Folder, EngineError> {
        let name = valid_name(new_name)?;
        let patch = FolderPatch {
            name: Some(name),
            ..Default::default()
        };
        self.patch_folder(id, patch).await
    }

    pub async fn rename_file(&mut self, id: &str, new_name: &str) -> Result<File, EngineError> {
        let name = valid_name(new_name)?;
        let patch = FilePatch {
            name: Some(name),
            ..Default::default()
        };
        self.patch_file(id, patch).await
    }

    pub async fn update_file_content(&mut self, id: &str, content: &str) -> Result<File, EngineError> {
        let patch = FilePatch {
            content: Some(content.to_string()),
            ..Default::default()
        };
        self.patch_file(id, patch).await
    }

    /// Flips the folder's expand/collapse state and persists it.
    pub async fn toggle_folder_open(&mut self, id: &str) -> Result<Folder, EngineError> {
        let is_open = !self.require_folder(id)?.is_open;
        let patch = FolderPatch {
            is_open: Some(is_open),
            ..Default::default()
        };
        self.patch_folder(id, patch).await
    }

    /// Reparents a folder. The target must not be the folder itself or one
    /// of its descendants.
    pub async fn move_folder(&mut self, id: &str, new_parent_id: &str) -> Result<Folder, EngineError> {
        if self.require_folder(id)?.is_root() {
            return Err(EngineError::RootFolderProtected);
        }
        self.require_parent(new_parent_id)?;
        if tree::would_create_cycle(&self.fs, id, new_parent_id) {
            return Err(EngineError::WouldCreateCycle {
                folder: id.to_string(),
                target: new_parent_id.to_string(),
            });
        }
        let patch = FolderPatch {
            parent_id: Some(new_parent_id.to_string()),
            ..Default::default()
        };
        self.patch_folder(id, patch).await
    }

    pub async fn move_file(&mut self, id: &str, new_parent_id: &str) -> Result<File, EngineError> {
        self.require_file(id)?;
        self.require_parent(new_parent_id)?;
        let patch = FilePatch {
            parent_id: Some(new_parent_id.to_string()),
            ..Default::default()
        };
        self.patch_file(id, patch).await
    }

    async fn patch_folder(&mut self, id: &str, patch: FolderPatch) -> Result<Folder, EngineError> {
        let folder = self
            .fs
            .folder_mut(id)
            .ok_or_else(|| EngineError::FolderNotFound(id.to_string()))?;
        patch.apply(folder);
        let updated = folder.clone();
        self.persist(vec![Mutation::UpdateFolder {
            id: id.to_string(),
            patch,
        }])
        .await;
        Ok(updated)
    }

    async fn patch_file(&mut self, id: &str, patch: FilePatch) -> Result<File, EngineError> {
        let file = self
            .fs
            .file_mut(id)
            .ok_or_else(|| EngineError::FileNotFound(id.to_string()))?;
        patch.apply(file);
        let updated = file.clone();
        self.persist(vec![Mutation::UpdateFile {
            id: id.to_string(),
            patch,
        }])
        .await;
        Ok(updated)
    }

    /// Deletes a folder with everything beneath it.
    ///
    /// Tabs for the removed files are closed first, in the order the files
    /// were collected. Remote deletes go children first so a backend with
    /// cascading foreign keys never sees a dangling request.
    pub async fn delete_folder(&mut self, id: &str) -> Result<Subtree, EngineError> {
        let folder = self.require_folder(id)?;
        if folder.is_root() || folder.id == ROOT_FOLDER_ID {
            return Err(EngineError::RootFolderProtected);
        }

        let subtree = tree::collect_subtree(&self.fs, id);
        for file_id in &subtree.file_ids {
            self.panes.close_everywhere(file_id);
        }

        let folder_ids: HashSet<&str> = subtree.folder_ids.iter().map(String::as_str).collect();
        let file_ids: HashSet<&str> = subtree.file_ids.iter().map(String::as_str).collect();
        self.fs.folders.retain(|f| !folder_ids.contains(f.id.as_str()));
        self.fs.files.retain(|f| !file_ids.contains(f.id.as_str()));

        let mutations = subtree
            .file_ids
            .iter()
            .map(|id| Mutation::DeleteFile(id.clone()))
            .chain(
                subtree
                    .folder_ids
                    .iter()
                    .rev()
                    .map(|id| Mutation::DeleteFolder(id.clone())),
            )
            .collect();
        self.persist(mutations).await;

        log::debug!(
            "Deleted folder {} ({} folders, {} files)",
            id,
            subtree.folder_ids.len(),
            subtree.file_ids.len()
        );
        Ok(subtree)
    }

    pub async fn delete_file(&mut self, id: &str) -> Result<(), EngineError> {
        self.require_file(id)?;
        self.panes.close_everywhere(id);
        self.fs.files.retain(|f| f.id != id);
        self.persist(vec![Mutation::DeleteFile(id.to_string())]).await;
        Ok(())
    }

    /// Opens a file from the tree into whichever pane the click rules pick.
    pub fn open_file(&mut self, id: &str) -> Result<Pane, EngineError> {
        self.require_file(id)?;
        Ok(self.panes.open_file(id))
    }

    pub fn open_in_split(&mut self, id: &str) -> Result<(), EngineError> {
        self.require_file(id)?;
        self.panes.open_in_split(id);
        Ok(())
    }

    /// Re-applies a persisted layout, dropping tabs whose files are gone.
    pub fn restore_layout(&mut self, layout: PaneState) {
        self.panes = PaneManager::from_state(layout);
        self.drop_stale_tabs();
    }

    /// Replaces the whole workspace. Tabs are cleared; nothing is merged.
    pub async fn import_snapshot(&mut self, mut fs: FileSystem) {
        ensure_root(&mut fs);
        self.fs = fs;
        self.panes.clear();

        if let Err(e) = self.local.save_snapshot(&self.fs) {
            log::error!("Failed to write imported workspace locally: {}", e);
        }
        if self.mode == StorageMode::Remote {
            if let Err(e) = self.push_to_remote().await {
                self.degrade("import", e);
            }
        }
        if self.mode == StorageMode::Local {
            self.note_unsynced();
        }
    }

    /// User asked to stop using the remote backend.
    pub fn switch_to_local_storage(&mut self) -> &FileSystem {
        log::info!("Switching to local storage on request");
        self.mode = StorageMode::Local;
        self.fs = self.load_local();
        self.drop_stale_tabs();
        &self.fs
    }

    /// Tests the remote backend. Doesn't change the mode.
    pub async fn check_connection(&self, config: &ConnectionConfig) -> ConnectionStatus {
        let remote = match &self.remote {
            Some(remote) => remote,
            None => return ConnectionStatus::failed("No remote storage configured"),
        };
        match tokio::time::timeout(self.timeout, remote.test_connection(config)).await {
            Ok(status) => status,
            Err(_) => ConnectionStatus::failed(format!(
                "Connection test timed out after {:?}",
                self.timeout
            )),
        }
    }

    /// Pushes the local workspace to the remote and resumes remote mode.
    ///
    /// Local wins: whatever the remote holds is overwritten with what the
    /// user has been editing while degraded.
    pub async fn sync(&mut self, config: &ConnectionConfig) -> SyncOutcome {
        let status = self.check_connection(config).await;
        if !status.success {
            return SyncOutcome {
                success: false,
                message: status.message,
            };
        }

        match self.push_to_remote().await {
            Ok(()) => {
                log::info!("Local workspace pushed to remote, resuming remote storage");
                if let Err(e) = self.local.clear_unsynced() {
                    log::error!("Failed to clear unsynced marker: {}", e);
                }
                self.mode = StorageMode::Remote;
                self.last_error = None;
                self.degraded_at = None;
                SyncOutcome {
                    success: true,
                    message: "Local data synced to remote storage".to_string(),
                }
            }
            Err(e) => {
                let message = format!("Sync failed: {}", e);
                self.degrade("sync", e);
                SyncOutcome {
                    success: false,
                    message,
                }
            }
        }
    }

    async fn push_to_remote(&self) -> Result<(), StorageError> {
        let remote = match &self.remote {
            Some(remote) => remote,
            None => return Ok(()),
        };
        // one round trip per changed record, so allow more than a single call
        let budget = self.timeout * 4;
        with_timeout(budget, push_snapshot(remote.as_ref(), &self.fs)).await
    }
}

fn valid_name(name: &str) -> Result<String, EngineError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(EngineError::EmptyName);
    }
    Ok(trimmed.to_string())
}

/// A workspace without a root gets the default one back.
fn ensure_root(fs: &mut FileSystem) {
    if fs.root().is_none() {
        log::warn!("Workspace has no root folder, restoring it");
        let mut root = Folder::new(ROOT_FOLDER_ID, "PingVim", None);
        root.is_open = true;
        fs.folders.insert(0, root);
    }
}
