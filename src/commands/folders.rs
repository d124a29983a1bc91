use crate::models::{ApiResult, FileSystem};
use crate::workspace::Workspace;

/// Returns the whole folder/file tree as currently held in memory.
pub async fn get_file_system(workspace: &Workspace) -> Result<FileSystem, String> {
    Ok(workspace.engine().await.file_system().clone())
}

/// Creates a new, collapsed folder.
///
/// # Arguments
/// * `name` - Display name, must not be blank
/// * `parent_id` - Folder to create it in
pub async fn create_folder(
    name: String,
    parent_id: String,
    workspace: &Workspace,
) -> Result<ApiResult, String> {
    match workspace.engine().await.create_folder(&name, &parent_id).await {
        Ok(folder) => Ok(ApiResult::with_folder(folder)),
        Err(e) => Ok(ApiResult::error(e.to_string())),
    }
}

/// Renames a folder.
///
/// # Arguments
/// * `id` - The folder to rename
/// * `new_name` - The new name, must not be blank
pub async fn rename_folder(
    id: String,
    new_name: String,
    workspace: &Workspace,
) -> Result<ApiResult, String> {
    match workspace.engine().await.rename_folder(&id, &new_name).await {
        Ok(folder) => Ok(ApiResult::with_folder(folder)),
        Err(e) => Ok(ApiResult::error(e.to_string())),
    }
}

/// Expands or collapses a folder in the tree.
pub async fn toggle_folder(id: String, workspace: &Workspace) -> Result<ApiResult, String> {
    match workspace.engine().await.toggle_folder_open(&id).await {
        Ok(folder) => Ok(ApiResult::with_folder(folder)),
        Err(e) => Ok(ApiResult::error(e.to_string())),
    }
}

/// Drops a folder onto another folder.
///
/// # Arguments
/// * `id` - The folder being moved
/// * `new_parent_id` - The folder it was dropped on
pub async fn move_folder(
    id: String,
    new_parent_id: String,
    workspace: &Workspace,
) -> Result<ApiResult, String> {
    match workspace.engine().await.move_folder(&id, &new_parent_id).await {
        Ok(folder) => Ok(ApiResult::with_folder(folder)),
        Err(e) => Ok(ApiResult::error(e.to_string())),
    }
}

/// Deletes a folder together with every folder and file beneath it.
///
/// Tabs of deleted files are closed, so the layout is saved as well.
pub async fn delete_folder(id: String, workspace: &Workspace) -> Result<ApiResult, String> {
    let mut engine = workspace.engine().await;
    match engine.delete_folder(&id).await {
        Ok(removed) => {
            workspace.persist_layout(&engine).await;
            Ok(ApiResult::with_message(format!(
                "Deleted {} folders and {} files",
                removed.folder_ids.len(),
                removed.file_ids.len()
            )))
        }
        Err(e) => Ok(ApiResult::error(e.to_string())),
    }
}
