use chrono::Utc;

use crate::codec;
use crate::models::ApiResult;
use crate::workspace::Workspace;

/// Serializes the whole workspace into a dated backup file.
///
/// Returns the payload in `content` and the suggested download name in
/// `file_name`.
pub async fn export_workspace(workspace: &Workspace) -> Result<ApiResult, String> {
    let now = Utc::now();
    let engine = workspace.engine().await;
    let payload = codec::export_snapshot(engine.file_system(), now)
        .map_err(|e| format!("Failed to serialize workspace: {}", e))?;
    Ok(ApiResult {
        content: Some(payload),
        file_name: Some(codec::export_file_name(now.date_naive())),
        ..ApiResult::success()
    })
}

/// Replaces the whole workspace with a backup file's contents.
///
/// A malformed file is rejected before anything changes. On success every
/// tab is closed.
///
/// # Arguments
/// * `payload` - The backup file's text
pub async fn import_workspace(payload: String, workspace: &Workspace) -> Result<ApiResult, String> {
    let fs = match codec::import_snapshot(&payload) {
        Ok(fs) => fs,
        Err(e) => return Ok(ApiResult::error(e.to_string())),
    };
    let (folders, files) = (fs.folders.len(), fs.files.len());

    let mut engine = workspace.engine().await;
    engine.import_snapshot(fs).await;
    workspace.persist_layout(&engine).await;
    Ok(ApiResult::with_message(format!(
        "Imported {} folders and {} files",
        folders, files
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{create_file, get_file_system, get_pane_state, open_file};
    use crate::models::FileSystem;
    use crate::paths::DataPaths;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_export_import_round_trip_clears_tabs() {
        let dir = tempdir().unwrap();
        let workspace = Workspace::open(DataPaths::new_with_base(dir.path())).await.unwrap();
        create_file("a.md".into(), "1".into(), Some("alpha".into()), &workspace)
            .await
            .unwrap();
        let exported = export_workspace(&workspace).await.unwrap();
        let saved = get_file_system(&workspace).await.unwrap();
        assert!(exported.file_name.unwrap().starts_with("pingvim-backup-"));

        let other = tempdir().unwrap();
        let target = Workspace::open(DataPaths::new_with_base(other.path())).await.unwrap();
        open_file("2".into(), &target).await.unwrap();

        let imported = import_workspace(exported.content.unwrap(), &target).await.unwrap();
        assert!(imported.success);
        assert_eq!(get_file_system(&target).await.unwrap(), saved);
        let panes = get_pane_state(&target).await.unwrap();
        assert!(panes.left.open_files.is_empty());
        assert!(panes.left.active_file.is_none());
        assert!(panes.right.open_files.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_import_changes_nothing() {
        let dir = tempdir().unwrap();
        let workspace = Workspace::open(DataPaths::new_with_base(dir.path())).await.unwrap();
        let result = import_workspace(r#"{"data":{"folders":[]}}"#.into(), &workspace)
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(get_file_system(&workspace).await.unwrap(), FileSystem::seed());
    }
}
