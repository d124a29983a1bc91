//! Tab and split-view actions. Every change to the layout is saved through
//! the debounced config writer.

use crate::engine::FileSystemEngine;
use crate::models::ApiResult;
use crate::panes::{Pane, PaneState};
use crate::workspace::Workspace;

pub async fn get_pane_state(workspace: &Workspace) -> Result<PaneState, String> {
    Ok(workspace.engine().await.panes().state().clone())
}

/// Runs a layout change and saves the result if it changed anything.
async fn change_layout<F>(workspace: &Workspace, f: F) -> Result<ApiResult, String>
where
    F: FnOnce(&mut FileSystemEngine) -> Result<(), String>,
{
    let mut engine = workspace.engine().await;
    let before = engine.panes().state().clone();
    if let Err(e) = f(&mut *engine) {
        return Ok(ApiResult::error(e));
    }
    if engine.panes().state() != &before {
        workspace.persist_layout(&engine).await;
    }
    Ok(ApiResult::success())
}

/// A click on a file in the tree.
pub async fn open_file(id: String, workspace: &Workspace) -> Result<ApiResult, String> {
    change_layout(workspace, |engine| {
        engine.open_file(&id).map(|_| ()).map_err(|e| e.to_string())
    })
    .await
}

/// "Open in split view" from a file's context menu.
pub async fn open_in_split(id: String, workspace: &Workspace) -> Result<ApiResult, String> {
    change_layout(workspace, |engine| {
        engine.open_in_split(&id).map_err(|e| e.to_string())
    })
    .await
}

/// Closes a tab in one pane.
///
/// # Arguments
/// * `pane` - The pane the tab belongs to
/// * `id` - The file shown in the tab
pub async fn close_tab(pane: Pane, id: String, workspace: &Workspace) -> Result<ApiResult, String> {
    change_layout(workspace, |engine| {
        if engine.panes_mut().close_tab(pane, &id) {
            Ok(())
        } else {
            Err(format!("File {} is not open in the {:?} pane", id, pane))
        }
    })
    .await
}

pub async fn set_active_tab(pane: Pane, id: String, workspace: &Workspace) -> Result<ApiResult, String> {
    change_layout(workspace, |engine| {
        if engine.panes_mut().set_active(pane, &id) {
            Ok(())
        } else {
            Err(format!("File {} is not open in the {:?} pane", id, pane))
        }
    })
    .await
}

/// Drags a tab from `from` onto the other pane.
pub async fn move_tab(from: Pane, id: String, workspace: &Workspace) -> Result<ApiResult, String> {
    change_layout(workspace, |engine| {
        if engine.panes_mut().move_tab(from, &id) {
            Ok(())
        } else {
            Err(format!("File {} is not open in the {:?} pane", id, from))
        }
    })
    .await
}

/// Drags a tab to another position in the same pane.
pub async fn reorder_tab(
    pane: Pane,
    from_index: usize,
    to_index: usize,
    workspace: &Workspace,
) -> Result<ApiResult, String> {
    change_layout(workspace, |engine| {
        if engine.panes_mut().reorder_tab(pane, from_index, to_index) {
            Ok(())
        } else {
            Err("Tab index out of range".to_string())
        }
    })
    .await
}

pub async fn toggle_split_view(workspace: &Workspace) -> Result<ApiResult, String> {
    change_layout(workspace, |engine| {
        engine.panes_mut().toggle_split_view();
        Ok(())
    })
    .await
}

/// Moves the split divider. The ratio is the left pane's share in percent
/// and is clamped to 20..=80.
pub async fn set_split_ratio(ratio: f64, workspace: &Workspace) -> Result<ApiResult, String> {
    change_layout(workspace, |engine| {
        engine.panes_mut().set_split_ratio(ratio);
        Ok(())
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::DataPaths;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_pane_commands_update_saved_layout() {
        let dir = tempdir().unwrap();
        let workspace = Workspace::open(DataPaths::new_with_base(dir.path())).await.unwrap();

        assert!(open_in_split("2".into(), &workspace).await.unwrap().success);
        let state = get_pane_state(&workspace).await.unwrap();
        // left was empty, so the split collapsed straight back
        assert!(!state.split_view);
        assert_eq!(state.left.active_file.as_deref(), Some("2"));

        assert!(set_split_ratio(95.0, &workspace).await.unwrap().success);
        assert_eq!(workspace.config().get_layout().split_ratio, 80.0);

        assert!(!open_file("ghost".into(), &workspace).await.unwrap().success);
        assert!(!close_tab(Pane::Right, "2".into(), &workspace).await.unwrap().success);
        assert!(!reorder_tab(Pane::Left, 3, 0, &workspace).await.unwrap().success);

        assert!(close_tab(Pane::Left, "2".into(), &workspace).await.unwrap().success);
        assert!(workspace.config().get_layout().left.open_files.is_empty());
    }
}
