use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};
use crate::models::{
    ConnectionConfig, ConnectionStatus, File, FilePatch, FileSystem, Folder, FolderPatch,
    ROOT_FOLDER_ID,
};
use crate::tree;

use super::StorageProvider;

/// How a [`MockProvider`] misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    #[default]
    Healthy,
    /// Every call fails with a 503.
    Fail,
    /// Every call stalls far past any reasonable timeout.
    Hang,
    /// Every call answers with the server's "use local storage" signal.
    UseLocalStorage,
}

#[derive(Debug, Default)]
struct MockState {
    fs: FileSystem,
    initialized: bool,
}

/// In-memory backend with the same rules a relational server enforces:
/// roots can't be deleted, ids are unique, bootstrap is idempotent.
///
/// Folder deletes remove only the named record unless built with
/// [`MockProvider::with_cascading_deletes`], which mimics a schema with
/// `ON DELETE CASCADE` foreign keys.
#[derive(Debug, Default)]
pub struct MockProvider {
    state: Mutex<MockState>,
    failure: Mutex<FailureMode>,
    calls: AtomicUsize,
    cascade_deletes: bool,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::with_file_system(FileSystem::seed())
    }

    pub fn with_file_system(fs: FileSystem) -> Self {
        Self {
            state: Mutex::new(MockState {
                fs,
                initialized: false,
            }),
            ..Default::default()
        }
    }

    pub fn failing(mode: FailureMode) -> Self {
        let provider = Self::new();
        provider.set_failure(mode);
        provider
    }

    pub fn with_cascading_deletes(mut self) -> Self {
        self.cascade_deletes = true;
        self
    }

    pub fn set_failure(&self, mode: FailureMode) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = mode;
    }

    /// Number of provider calls made so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> FileSystem {
        self.state().fs.clone()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn check(&self) -> StorageResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mode = *self.failure.lock().unwrap_or_else(PoisonError::into_inner);
        match mode {
            FailureMode::Healthy => Ok(()),
            FailureMode::Fail => Err(StorageError::Http {
                status: 503,
                message: "mock backend unavailable".to_string(),
            }),
            FailureMode::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(StorageError::Network("mock backend never answered".to_string()))
            }
            FailureMode::UseLocalStorage => Err(StorageError::UseLocalStorage(
                "database not configured".to_string(),
            )),
        }
    }
}

fn conflict(kind: &str, id: &str) -> StorageError {
    StorageError::Rejected {
        status: 409,
        message: format!("{} {} already exists", kind, id),
    }
}

#[async_trait]
impl StorageProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn load(&self) -> StorageResult<FileSystem> {
        self.check().await?;
        Ok(self.snapshot())
    }

    async fn create_folder(&self, folder: &Folder) -> StorageResult<Folder> {
        self.check().await?;
        let mut state = self.state();
        if state.fs.folder(&folder.id).is_some() {
            return Err(conflict("folder", &folder.id));
        }
        state.fs.folders.push(folder.clone());
        Ok(folder.clone())
    }

    async fn create_file(&self, file: &File) -> StorageResult<File> {
        self.check().await?;
        let mut state = self.state();
        if state.fs.file(&file.id).is_some() {
            return Err(conflict("file", &file.id));
        }
        state.fs.files.push(file.clone());
        Ok(file.clone())
    }

    async fn update_folder(&self, id: &str, patch: &FolderPatch) -> StorageResult<Folder> {
        self.check().await?;
        let mut state = self.state();
        let folder = state
            .fs
            .folder_mut(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        patch.apply(folder);
        Ok(folder.clone())
    }

    async fn update_file(&self, id: &str, patch: &FilePatch) -> StorageResult<File> {
        self.check().await?;
        let mut state = self.state();
        let file = state
            .fs
            .file_mut(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        patch.apply(file);
        Ok(file.clone())
    }

    async fn delete_folder(&self, id: &str) -> StorageResult<()> {
        self.check().await?;
        let mut state = self.state();
        match state.fs.folder(id) {
            Some(folder) if folder.is_root() => Err(StorageError::Rejected {
                status: 400,
                message: "Cannot delete root folder".to_string(),
            }),
            Some(_) if self.cascade_deletes => {
                let subtree = tree::collect_subtree(&state.fs, id);
                let folder_ids: HashSet<&str> =
                    subtree.folder_ids.iter().map(String::as_str).collect();
                state.fs.folders.retain(|f| !folder_ids.contains(f.id.as_str()));
                state.fs.files.retain(|f| !folder_ids.contains(f.parent_id.as_str()));
                Ok(())
            }
            Some(_) => {
                state.fs.folders.retain(|f| f.id != id);
                Ok(())
            }
            None => Err(StorageError::NotFound(id.to_string())),
        }
    }

    async fn delete_file(&self, id: &str) -> StorageResult<()> {
        self.check().await?;
        let mut state = self.state();
        let before = state.fs.files.len();
        state.fs.files.retain(|f| f.id != id);
        if state.fs.files.len() == before {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn test_connection(&self, _config: &ConnectionConfig) -> ConnectionStatus {
        match self.check().await {
            Ok(()) => ConnectionStatus::ok("Connected to mock backend"),
            Err(e) => ConnectionStatus::failed(e.to_string()),
        }
    }

    async fn init(&self) -> StorageResult<()> {
        self.check().await?;
        let mut state = self.state();
        if state.initialized {
            log::debug!("mock backend already initialized, skipping bootstrap");
            return Ok(());
        }
        if state.fs.folder(ROOT_FOLDER_ID).is_none() {
            let mut root = Folder::new(ROOT_FOLDER_ID, "PingVim", None);
            root.is_open = true;
            state.fs.folders.insert(0, root);
        }
        state.initialized = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_root_delete_is_rejected() {
        let provider = MockProvider::new();
        let err = provider.delete_folder(ROOT_FOLDER_ID).await.unwrap_err();
        assert!(err.is_permanent());
        assert!(provider.snapshot().folder(ROOT_FOLDER_ID).is_some());
    }

    #[tokio::test]
    async fn test_delete_only_removes_the_named_record() {
        let provider = MockProvider::new();
        provider
            .create_folder(&Folder::new("5", "sub", Some("1".into())))
            .await
            .unwrap();
        provider
            .create_file(&File::new("6", "x.md", "5", ""))
            .await
            .unwrap();
        provider.delete_folder("5").await.unwrap();
        assert!(provider.snapshot().file("6").is_some());
    }

    #[tokio::test]
    async fn test_cascading_delete_takes_the_subtree() {
        let provider = MockProvider::new().with_cascading_deletes();
        provider
            .create_folder(&Folder::new("5", "sub", Some("1".into())))
            .await
            .unwrap();
        provider
            .create_folder(&Folder::new("7", "deeper", Some("5".into())))
            .await
            .unwrap();
        provider
            .create_file(&File::new("8", "x.md", "7", ""))
            .await
            .unwrap();
        provider.delete_folder("5").await.unwrap();
        let fs = provider.snapshot();
        assert!(fs.folder("7").is_none());
        assert!(fs.file("8").is_none());
        assert!(fs.file("2").is_some());
    }

    #[tokio::test]
    async fn test_duplicate_ids_conflict() {
        let provider = MockProvider::new();
        let file = File::new("9", "a.md", "1", "");
        provider.create_file(&file).await.unwrap();
        let err = provider.create_file(&file).await.unwrap_err();
        assert!(matches!(err, StorageError::Rejected { status: 409, .. }));
    }

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let provider = MockProvider::with_file_system(FileSystem::default());
        provider.init().await.unwrap();
        provider.init().await.unwrap();
        let fs = provider.snapshot();
        assert_eq!(fs.folders.len(), 1);
        assert!(fs.folders[0].is_root());
    }

    #[tokio::test]
    async fn test_failure_modes() {
        let provider = MockProvider::failing(FailureMode::Fail);
        assert!(matches!(
            provider.load().await,
            Err(StorageError::Http { status: 503, .. })
        ));
        provider.set_failure(FailureMode::UseLocalStorage);
        assert!(matches!(
            provider.load().await,
            Err(StorageError::UseLocalStorage(_))
        ));
        let status = provider.test_connection(&ConnectionConfig::default()).await;
        assert!(!status.success);
        provider.set_failure(FailureMode::Healthy);
        assert!(provider.load().await.is_ok());
        assert_eq!(provider.calls(), 4);
    }
}
