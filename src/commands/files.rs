use crate::models::{ApiResult, File};
use crate::search;
use crate::workspace::Workspace;

/// Creates a new file.
///
/// # Arguments
/// * `name` - File name including extension, must not be blank
/// * `parent_id` - Folder to create it in
/// * `content` - Initial text, empty if not given
pub async fn create_file(
    name: String,
    parent_id: String,
    content: Option<String>,
    workspace: &Workspace,
) -> Result<ApiResult, String> {
    let content = content.unwrap_or_default();
    match workspace.engine().await.create_file(&name, &parent_id, &content).await {
        Ok(file) => Ok(ApiResult::with_file(file)),
        Err(e) => Ok(ApiResult::error(e.to_string())),
    }
}

/// Returns a file's text.
pub async fn read_file(id: String, workspace: &Workspace) -> Result<ApiResult, String> {
    let engine = workspace.engine().await;
    match engine.file_system().file(&id) {
        Some(file) => Ok(ApiResult {
            content: Some(file.content.clone()),
            file_name: Some(file.name.clone()),
            ..ApiResult::success()
        }),
        None => Ok(ApiResult::error(format!("File not found: {}", id))),
    }
}

/// Saves editor content.
///
/// # Arguments
/// * `id` - The file being edited
/// * `content` - The full new text
pub async fn save_file_content(
    id: String,
    content: String,
    workspace: &Workspace,
) -> Result<ApiResult, String> {
    match workspace.engine().await.update_file_content(&id, &content).await {
        Ok(_) => Ok(ApiResult::success()),
        Err(e) => Ok(ApiResult::error(e.to_string())),
    }
}

/// Renames a file.
///
/// # Arguments
/// * `id` - The file to rename
/// * `new_name` - The new name, must not be blank
pub async fn rename_file(
    id: String,
    new_name: String,
    workspace: &Workspace,
) -> Result<ApiResult, String> {
    match workspace.engine().await.rename_file(&id, &new_name).await {
        Ok(file) => Ok(ApiResult::with_file(file)),
        Err(e) => Ok(ApiResult::error(e.to_string())),
    }
}

/// Drops a file onto a folder.
pub async fn move_file(
    id: String,
    new_parent_id: String,
    workspace: &Workspace,
) -> Result<ApiResult, String> {
    match workspace.engine().await.move_file(&id, &new_parent_id).await {
        Ok(file) => Ok(ApiResult::with_file(file)),
        Err(e) => Ok(ApiResult::error(e.to_string())),
    }
}

/// Deletes a file, closing its tabs in both panes.
pub async fn delete_file(id: String, workspace: &Workspace) -> Result<ApiResult, String> {
    let mut engine = workspace.engine().await;
    match engine.delete_file(&id).await {
        Ok(()) => {
            workspace.persist_layout(&engine).await;
            Ok(ApiResult::success())
        }
        Err(e) => Ok(ApiResult::error(e.to_string())),
    }
}

/// Files whose name or content contains `query`, ignoring case.
pub async fn search_files(query: String, workspace: &Workspace) -> Result<Vec<File>, String> {
    let engine = workspace.engine().await;
    Ok(search::search(engine.file_system(), &query).cloned().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panes::Pane;
    use crate::paths::DataPaths;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_file_commands() {
        let dir = tempdir().unwrap();
        let workspace = Workspace::open(DataPaths::new_with_base(dir.path())).await.unwrap();

        let created = create_file("todo.md".into(), "1".into(), None, &workspace).await.unwrap();
        let id = created.file.unwrap().id;

        assert!(save_file_content(id.clone(), "buy milk".into(), &workspace).await.unwrap().success);
        let read = read_file(id.clone(), &workspace).await.unwrap();
        assert_eq!(read.content.as_deref(), Some("buy milk"));
        assert_eq!(read.file_name.as_deref(), Some("todo.md"));

        let hits = search_files("MILK".into(), &workspace).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, id);

        let orphan = create_file("x.md".into(), "missing".into(), None, &workspace).await.unwrap();
        assert!(!orphan.success);

        workspace.engine().await.open_file(&id).unwrap();
        assert!(delete_file(id.clone(), &workspace).await.unwrap().success);
        assert!(workspace.config().get_layout().left.open_files.is_empty());
        assert!(workspace.engine().await.panes().open_files(Pane::Left).iter().all(|f| f != &id));
        assert!(!read_file(id, &workspace).await.unwrap().success);
    }
}
