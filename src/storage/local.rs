use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{StorageError, StorageResult};
use crate::models::{
    ConnectionConfig, ConnectionStatus, File, FilePatch, FileSystem, Folder, FolderPatch,
};

use super::StorageProvider;

/// Persists the whole workspace as one JSON snapshot on local disk.
///
/// The engine keeps its local copy through `read_snapshot`/`save_snapshot`.
/// The record-level [`StorageProvider`] impl makes the same file usable as a
/// stand-alone backend, e.g. as the remote of an engine that mirrors into a
/// synced or network-mounted directory.
///
/// Every write is read-modify-write of the full snapshot, written to a
/// temporary sibling and renamed over the original so a crash never leaves
/// a half-written file behind.
///
/// Next to the snapshot lives an `.unsynced` marker holding the time local
/// changes first diverged from the remote backend. It survives restarts.
#[derive(Debug)]
pub struct LocalStorageProvider {
    snapshot_file: PathBuf,
    unsynced_marker: PathBuf,
    write_lock: Mutex<()>,
}

impl LocalStorageProvider {
    pub fn new(snapshot_file: impl Into<PathBuf>) -> Self {
        let snapshot_file = snapshot_file.into();
        Self {
            unsynced_marker: snapshot_file.with_extension("unsynced"),
            snapshot_file,
            write_lock: Mutex::new(()),
        }
    }

    /// Records that the snapshot holds changes the remote lacks. An existing
    /// marker keeps its original time.
    pub fn mark_unsynced(&self, since: DateTime<Utc>) -> StorageResult<()> {
        if self.unsynced_marker.exists() {
            return Ok(());
        }
        if let Some(parent) = self.unsynced_marker.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.unsynced_marker, since.to_rfc3339())?;
        Ok(())
    }

    /// When local changes first diverged from the remote, if they still do.
    pub fn unsynced_since(&self) -> Option<DateTime<Utc>> {
        if !self.unsynced_marker.exists() {
            return None;
        }
        let since = fs::read_to_string(&self.unsynced_marker)
            .ok()
            .and_then(|text| DateTime::parse_from_rfc3339(text.trim()).ok())
            .map(|at| at.with_timezone(&Utc));
        Some(since.unwrap_or_else(|| {
            log::warn!(
                "Unreadable marker at {}, treating local changes as unsynced",
                self.unsynced_marker.display()
            );
            Utc::now()
        }))
    }

    pub fn clear_unsynced(&self) -> StorageResult<()> {
        if self.unsynced_marker.exists() {
            fs::remove_file(&self.unsynced_marker)?;
        }
        Ok(())
    }

    pub fn snapshot_file(&self) -> &Path {
        &self.snapshot_file
    }

    /// Whether anything has been persisted yet.
    pub fn has_snapshot(&self) -> bool {
        self.snapshot_file.exists()
    }

    /// Reads the stored snapshot; the seed workspace if nothing is stored.
    pub fn read_snapshot(&self) -> StorageResult<FileSystem> {
        if !self.snapshot_file.exists() {
            return Ok(FileSystem::seed());
        }
        let content = fs::read_to_string(&self.snapshot_file)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Replaces the stored snapshot wholesale.
    pub fn save_snapshot(&self, snapshot: &FileSystem) -> StorageResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.write(snapshot)
    }

    fn write(&self, snapshot: &FileSystem) -> StorageResult<()> {
        if let Some(parent) = self.snapshot_file.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(snapshot)?;
        let tmp = self.snapshot_file.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.snapshot_file)?;
        Ok(())
    }

    fn modify<T, F>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&mut FileSystem) -> StorageResult<T>,
    {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut snapshot = self.read_snapshot()?;
        let result = f(&mut snapshot)?;
        self.write(&snapshot)?;
        Ok(result)
    }
}

#[async_trait]
impl StorageProvider for LocalStorageProvider {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn load(&self) -> StorageResult<FileSystem> {
        self.read_snapshot()
    }

    async fn create_folder(&self, folder: &Folder) -> StorageResult<Folder> {
        self.modify(|snapshot| {
            match snapshot.folder_mut(&folder.id) {
                Some(existing) => *existing = folder.clone(),
                None => snapshot.folders.push(folder.clone()),
            }
            Ok(folder.clone())
        })
    }

    async fn create_file(&self, file: &File) -> StorageResult<File> {
        self.modify(|snapshot| {
            match snapshot.file_mut(&file.id) {
                Some(existing) => *existing = file.clone(),
                None => snapshot.files.push(file.clone()),
            }
            Ok(file.clone())
        })
    }

    async fn update_folder(&self, id: &str, patch: &FolderPatch) -> StorageResult<Folder> {
        self.modify(|snapshot| {
            let folder = snapshot
                .folder_mut(id)
                .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
            patch.apply(folder);
            Ok(folder.clone())
        })
    }

    async fn update_file(&self, id: &str, patch: &FilePatch) -> StorageResult<File> {
        self.modify(|snapshot| {
            let file = snapshot
                .file_mut(id)
                .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
            patch.apply(file);
            Ok(file.clone())
        })
    }

    async fn delete_folder(&self, id: &str) -> StorageResult<()> {
        self.modify(|snapshot| {
            snapshot.folders.retain(|f| f.id != id);
            Ok(())
        })
    }

    async fn delete_file(&self, id: &str) -> StorageResult<()> {
        self.modify(|snapshot| {
            snapshot.files.retain(|f| f.id != id);
            Ok(())
        })
    }

    async fn test_connection(&self, _config: &ConnectionConfig) -> ConnectionStatus {
        let dir = match self.snapshot_file.parent() {
            Some(dir) => dir,
            None => return ConnectionStatus::failed("Snapshot path has no parent directory"),
        };
        let marker = dir.join(".pingvim-write-check");
        let result = fs::create_dir_all(dir)
            .and_then(|_| fs::write(&marker, b"ok"))
            .and_then(|_| fs::remove_file(&marker));
        match result {
            Ok(()) => ConnectionStatus::ok(format!("Local storage writable at {}", dir.display())),
            Err(e) => ConnectionStatus::failed(format!("Local storage not writable: {}", e)),
        }
    }
}
