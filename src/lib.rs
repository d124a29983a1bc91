pub mod codec;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod panes;
pub mod paths;
pub mod search;
pub mod storage;
pub mod tree;
pub mod workspace;

pub use engine::{FileSystemEngine, StorageMode, SyncOutcome, SyncStatus};
pub use error::{EngineError, StorageError};
pub use models::{ApiResult, Config, ConnectionConfig, File, FileSystem, Folder};
pub use panes::{Pane, PaneManager, PaneState};
pub use workspace::Workspace;

/// Installs the env_logger backend, defaulting to `info` when `RUST_LOG`
/// isn't set. Calling it more than once is harmless.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

/// Opens the workspace in the platform data directory.
pub async fn open_default_workspace() -> Result<Workspace, String> {
    init_logging();
    let paths = paths::DataPaths::new()?;
    Workspace::open(paths).await
}
