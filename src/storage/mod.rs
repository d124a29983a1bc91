//! Storage backends
//!
//! Every backend (local snapshot file, remote HTTP server, in-memory mock)
//! implements [`StorageProvider`]. Providers only touch the single record
//! they are told about; cascading is the engine's job.

pub mod http;
pub mod local;
pub mod memory;

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};
use crate::models::{
    ConnectionConfig, ConnectionStatus, File, FilePatch, FileSystem, Folder, FolderPatch,
};
use crate::tree;

pub use http::HttpProvider;
pub use local::LocalStorageProvider;
pub use memory::{FailureMode, MockProvider};

/// Default budget for a single remote call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Short name used in logs and status messages.
    fn name(&self) -> &'static str;

    async fn load(&self) -> StorageResult<FileSystem>;

    async fn create_folder(&self, folder: &Folder) -> StorageResult<Folder>;

    async fn create_file(&self, file: &File) -> StorageResult<File>;

    async fn update_folder(&self, id: &str, patch: &FolderPatch) -> StorageResult<Folder>;

    async fn update_file(&self, id: &str, patch: &FilePatch) -> StorageResult<File>;

    async fn delete_folder(&self, id: &str) -> StorageResult<()>;

    async fn delete_file(&self, id: &str) -> StorageResult<()>;

    /// Tests `config` without touching any state the provider shares.
    async fn test_connection(&self, config: &ConnectionConfig) -> ConnectionStatus;

    /// Schema bootstrap. Must be safe to call any number of times.
    async fn init(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Races `future` against a timer.
///
/// When the timer wins the request future is dropped, so a response that
/// arrives afterwards is never observed.
pub async fn with_timeout<T, F>(duration: Duration, future: F) -> StorageResult<T>
where
    F: Future<Output = StorageResult<T>>,
{
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(StorageError::Timeout(duration)),
    }
}

/// One logical write, replayable against any provider.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    CreateFolder(Folder),
    CreateFile(File),
    UpdateFolder { id: String, patch: FolderPatch },
    UpdateFile { id: String, patch: FilePatch },
    DeleteFolder(String),
    DeleteFile(String),
}

impl Mutation {
    pub async fn apply(&self, provider: &dyn StorageProvider) -> StorageResult<()> {
        match self {
            Mutation::CreateFolder(folder) => provider.create_folder(folder).await.map(|_| ()),
            Mutation::CreateFile(file) => provider.create_file(file).await.map(|_| ()),
            Mutation::UpdateFolder { id, patch } => {
                provider.update_folder(id, patch).await.map(|_| ())
            }
            Mutation::UpdateFile { id, patch } => provider.update_file(id, patch).await.map(|_| ()),
            Mutation::DeleteFolder(id) => provider.delete_folder(id).await,
            Mutation::DeleteFile(id) => provider.delete_file(id).await,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Mutation::CreateFolder(f) => format!("create folder {}", f.id),
            Mutation::CreateFile(f) => format!("create file {}", f.id),
            Mutation::UpdateFolder { id, .. } => format!("update folder {}", id),
            Mutation::UpdateFile { id, .. } => format!("update file {}", id),
            Mutation::DeleteFolder(id) => format!("delete folder {}", id),
            Mutation::DeleteFile(id) => format!("delete file {}", id),
        }
    }
}

/// Makes `provider` hold exactly `target`.
///
/// Creates or updates folders parents first, then files, so anything that
/// survives has already been moved out of folders that are about to go.
/// Only then removes what `target` lacks: files, then folders deepest first,
/// never a root. A backend that cascades folder deletes therefore only ever
/// cascades over records that are stale anyway.
pub async fn push_snapshot(provider: &dyn StorageProvider, target: &FileSystem) -> StorageResult<()> {
    let current = provider.load().await?;

    let mut folders: Vec<&Folder> = target.folders.iter().collect();
    folders.sort_by_key(|f| tree::ancestors(target, &f.id).len());
    for folder in folders {
        match current.folder(&folder.id) {
            Some(existing) if existing == folder => {}
            Some(_) => {
                let patch = FolderPatch {
                    name: Some(folder.name.clone()),
                    is_open: Some(folder.is_open),
                    parent_id: folder.parent_id.clone(),
                };
                provider.update_folder(&folder.id, &patch).await?;
            }
            None => {
                provider.create_folder(folder).await?;
            }
        }
    }

    for file in &target.files {
        match current.file(&file.id) {
            Some(existing) if existing == file => {}
            Some(_) => {
                let patch = FilePatch {
                    name: Some(file.name.clone()),
                    content: Some(file.content.clone()),
                    parent_id: Some(file.parent_id.clone()),
                };
                provider.update_file(&file.id, &patch).await?;
            }
            None => {
                provider.create_file(file).await?;
            }
        }
    }

    let target_files: HashSet<&str> = target.files.iter().map(|f| f.id.as_str()).collect();
    let target_folders: HashSet<&str> = target.folders.iter().map(|f| f.id.as_str()).collect();

    for file in current.files.iter().filter(|f| !target_files.contains(f.id.as_str())) {
        provider.delete_file(&file.id).await?;
    }

    let mut stale: Vec<&Folder> = current
        .folders
        .iter()
        .filter(|f| !f.is_root() && !target_folders.contains(f.id.as_str()))
        .collect();
    stale.sort_by_key(|f| std::cmp::Reverse(tree::ancestors(&current, &f.id).len()));
    for folder in stale {
        provider.delete_folder(&folder.id).await?;
    }

    Ok(())
}
