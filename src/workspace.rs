//! One open workspace: the engine, its settings and where both live on disk.

use tokio::sync::{Mutex, MutexGuard};

use crate::config::ConfigManager;
use crate::engine::FileSystemEngine;
use crate::models::{ConnectionConfig, StorageType};
use crate::paths::DataPaths;
use crate::storage::{HttpProvider, LocalStorageProvider, StorageProvider, DEFAULT_TIMEOUT};

/// The engine sits behind a single async mutex, so UI actions against the
/// workspace run strictly one after another.
pub struct Workspace {
    engine: Mutex<FileSystemEngine>,
    config: ConfigManager,
    paths: DataPaths,
}

impl Workspace {
    /// Opens the workspace under `paths`, building the remote backend from
    /// the saved connection settings.
    pub async fn open(paths: DataPaths) -> Result<Self, String> {
        paths.ensure_directories()?;
        let config = ConfigManager::new(paths.config_file.clone())?;

        let settings = config.get();
        let remote = if settings.storage_type == StorageType::Remote {
            remote_provider(&settings.connection)
        } else {
            None
        };

        Self::open_with(paths, config, remote).await
    }

    /// Opens the workspace with an explicit remote backend.
    pub async fn open_with(
        paths: DataPaths,
        config: ConfigManager,
        remote: Option<Box<dyn StorageProvider>>,
    ) -> Result<Self, String> {
        paths.ensure_directories()?;
        let local = LocalStorageProvider::new(paths.snapshot_file.clone());
        let mut engine = match remote {
            Some(remote) => FileSystemEngine::with_remote(local, remote),
            None => FileSystemEngine::new(local),
        };

        let fs = engine.load().await;
        log::info!(
            "Workspace loaded from {}: {} folders, {} files",
            paths.base_dir.display(),
            fs.folders.len(),
            fs.files.len()
        );
        engine.restore_layout(config.get_layout());

        Ok(Self {
            engine: Mutex::new(engine),
            config,
            paths,
        })
    }

    /// Waits for exclusive access to the engine.
    pub async fn engine(&self) -> MutexGuard<'_, FileSystemEngine> {
        self.engine.lock().await
    }

    pub fn config(&self) -> &ConfigManager {
        &self.config
    }

    pub fn paths(&self) -> &DataPaths {
        &self.paths
    }

    /// Records the current pane layout and schedules a config save.
    pub async fn persist_layout(&self, engine: &FileSystemEngine) {
        self.config.set_layout(engine.panes().state().clone());
        self.config.schedule_save().await;
    }

    /// Rebuilds the remote backend from `connection` and saves the settings.
    ///
    /// The engine stays local until the next successful sync.
    pub async fn configure_remote(&self, connection: ConnectionConfig) {
        let remote = remote_provider(&connection);
        let storage_type = if remote.is_some() {
            StorageType::Remote
        } else {
            StorageType::Local
        };
        self.engine().await.set_remote(remote);

        self.config.update_and_save(|config| {
            config.connection = connection;
            config.storage_type = storage_type;
        })
        .await;
    }
}

fn remote_provider(connection: &ConnectionConfig) -> Option<Box<dyn StorageProvider>> {
    if !connection.enabled {
        return None;
    }
    match HttpProvider::new(connection, DEFAULT_TIMEOUT) {
        Ok(provider) => Some(Box::new(provider)),
        Err(e) => {
            log::warn!("Remote storage unavailable, staying local: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::StorageMode;
    use crate::models::FileSystem;
    use crate::panes::{Pane, PaneState};
    use crate::storage::{FailureMode, MockProvider};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_open_fresh_workspace_is_seeded_and_local() {
        let dir = tempdir().unwrap();
        let workspace = Workspace::open(DataPaths::new_with_base(&dir.path().join("data")))
            .await
            .unwrap();
        let engine = workspace.engine().await;
        assert_eq!(engine.file_system(), &FileSystem::seed());
        assert_eq!(engine.mode(), StorageMode::Local);
        assert!(workspace.paths().base_dir.exists());
    }

    #[tokio::test]
    async fn test_open_restores_saved_layout() {
        let dir = tempdir().unwrap();
        let paths = DataPaths::new_with_base(dir.path());
        let config = ConfigManager::new(paths.config_file.clone()).unwrap();
        let mut layout = PaneState::default();
        layout.left.open_files = vec!["2".into(), "gone".into()];
        layout.left.active_file = Some("2".into());
        config.set_layout(layout);

        let workspace = Workspace::open_with(paths, config, None).await.unwrap();
        let engine = workspace.engine().await;
        assert_eq!(engine.panes().open_files(Pane::Left), ["2".to_string()].as_slice());
    }

    #[tokio::test]
    async fn test_unreachable_remote_opens_in_local_mode() {
        let dir = tempdir().unwrap();
        let paths = DataPaths::new_with_base(dir.path());
        let config = ConfigManager::new(paths.config_file.clone()).unwrap();
        let remote = Box::new(MockProvider::failing(FailureMode::UseLocalStorage));

        let workspace = Workspace::open_with(paths, config, Some(remote)).await.unwrap();
        let engine = workspace.engine().await;
        assert_eq!(engine.mode(), StorageMode::Local);
        assert_eq!(engine.file_system(), &FileSystem::seed());
    }

    #[tokio::test]
    async fn test_persist_layout_writes_config() {
        let dir = tempdir().unwrap();
        let workspace = Workspace::open(DataPaths::new_with_base(dir.path())).await.unwrap();
        {
            let mut engine = workspace.engine().await;
            engine.open_file("2").unwrap();
            workspace.persist_layout(&engine).await;
        }
        assert_eq!(
            workspace.config().get_layout().left.active_file.as_deref(),
            Some("2")
        );
        workspace.config().save_sync().unwrap();

        let reopened = ConfigManager::new(workspace.paths().config_file.clone()).unwrap();
        assert_eq!(reopened.get_layout().left.open_files, vec!["2".to_string()]);
    }

    #[tokio::test]
    async fn test_configure_disabled_remote_stays_local() {
        let dir = tempdir().unwrap();
        let workspace = Workspace::open(DataPaths::new_with_base(dir.path())).await.unwrap();
        let connection = ConnectionConfig {
            enabled: false,
            ..Default::default()
        };
        workspace.configure_remote(connection).await;
        assert_eq!(workspace.config().get_storage_type(), StorageType::Local);
        assert!(!workspace.engine().await.status().remote_configured);
    }
}
