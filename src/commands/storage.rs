use crate::engine::SyncStatus;
use crate::models::{ApiResult, ConnectionConfig, FileSystem, StorageType};
use crate::storage::{HttpProvider, StorageProvider, DEFAULT_TIMEOUT};
use crate::workspace::Workspace;

/// Current backend and the last remote failure, for the status indicator.
pub async fn get_sync_status(workspace: &Workspace) -> Result<SyncStatus, String> {
    Ok(workspace.engine().await.status())
}

pub async fn get_connection(workspace: &Workspace) -> Result<ConnectionConfig, String> {
    Ok(workspace.config().get_connection())
}

/// Checks a storage server with settings the user hasn't saved yet.
pub async fn test_connection(connection: ConnectionConfig) -> Result<ApiResult, String> {
    let provider = match HttpProvider::new(&connection, DEFAULT_TIMEOUT) {
        Ok(provider) => provider,
        Err(e) => return Ok(ApiResult::error(e.to_string())),
    };
    let outcome = tokio::time::timeout(DEFAULT_TIMEOUT, provider.test_connection(&connection)).await;
    match outcome {
        Ok(status) if status.success => Ok(ApiResult::with_message(status.message)),
        Ok(status) => Ok(ApiResult::error(status.message)),
        Err(_) => Ok(ApiResult::error("Connection test timed out")),
    }
}

/// Saves connection settings and swaps the remote backend.
///
/// The workspace keeps working locally until `sync_storage` succeeds.
pub async fn save_connection(
    connection: ConnectionConfig,
    workspace: &Workspace,
) -> Result<ApiResult, String> {
    let enabled = connection.enabled;
    workspace.configure_remote(connection).await;
    if enabled && workspace.config().get_storage_type() == StorageType::Local {
        return Ok(ApiResult::error("Could not set up remote storage"));
    }
    Ok(ApiResult::success())
}

/// Pushes everything edited locally to the remote backend and goes back to
/// remote storage.
pub async fn sync_storage(workspace: &Workspace) -> Result<ApiResult, String> {
    let connection = workspace.config().get_connection();
    let outcome = workspace.engine().await.sync(&connection).await;
    if outcome.success {
        Ok(ApiResult::with_message(outcome.message))
    } else {
        Ok(ApiResult {
            use_local_storage: Some(true),
            ..ApiResult::error(outcome.message)
        })
    }
}

/// Stops using the remote backend and reloads the local snapshot.
pub async fn use_local_storage(workspace: &Workspace) -> Result<FileSystem, String> {
    let fs = workspace.engine().await.switch_to_local_storage().clone();
    workspace
        .config()
        .update_and_save(|config| config.storage_type = StorageType::Local)
        .await;
    Ok(fs)
}

/// Re-reads the workspace from the active backend.
pub async fn reload_file_system(workspace: &Workspace) -> Result<FileSystem, String> {
    let mut engine = workspace.engine().await;
    let fs = engine.load().await.clone();
    workspace.persist_layout(&engine).await;
    Ok(fs)
}
