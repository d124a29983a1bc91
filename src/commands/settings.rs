use crate::models::ApiResult;
use crate::workspace::Workspace;

/// Editor preferences shown in the settings panel.
#[derive(serde::Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub font_size: u32,
    pub theme: String,
}

pub async fn get_preferences(workspace: &Workspace) -> Result<Preferences, String> {
    let config = workspace.config().get();
    Ok(Preferences {
        font_size: config.font_size,
        theme: config.theme,
    })
}

/// Sets the editor font size, clamped to 8..=48.
///
/// # Arguments
/// * `size` - The requested size in points
pub async fn set_font_size(size: u32, workspace: &Workspace) -> Result<u32, String> {
    let applied = workspace.config().set_font_size(size);
    workspace.config().schedule_save().await;
    Ok(applied)
}

pub async fn set_theme(theme: String, workspace: &Workspace) -> Result<ApiResult, String> {
    if theme.trim().is_empty() {
        return Ok(ApiResult::error("Theme cannot be empty"));
    }
    workspace.config().set_theme(theme);
    workspace.config().schedule_save().await;
    Ok(ApiResult::success())
}

/// Checks the shared password on the lock screen.
pub async fn unlock(password: String, workspace: &Workspace) -> Result<ApiResult, String> {
    if workspace.config().verify_password(&password) {
        Ok(ApiResult::success())
    } else {
        Ok(ApiResult::error("Incorrect password"))
    }
}

/// Replaces the shared password. The current one must match.
///
/// # Arguments
/// * `current` - The password in use now
/// * `new_password` - The replacement, must not be empty
pub async fn change_password(
    current: String,
    new_password: String,
    workspace: &Workspace,
) -> Result<ApiResult, String> {
    if !workspace.config().verify_password(&current) {
        return Ok(ApiResult::error("Incorrect password"));
    }
    if let Err(e) = workspace.config().set_password(&new_password) {
        return Ok(ApiResult::error(e));
    }
    workspace.config().schedule_save().await;
    Ok(ApiResult::success())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DEFAULT_PASSWORD;
    use crate::paths::DataPaths;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_password_gate() {
        let dir = tempdir().unwrap();
        let workspace = Workspace::open(DataPaths::new_with_base(dir.path())).await.unwrap();

        assert!(unlock(DEFAULT_PASSWORD.into(), &workspace).await.unwrap().success);
        assert!(!unlock("guess".into(), &workspace).await.unwrap().success);

        let wrong = change_password("guess".into(), "new".into(), &workspace).await.unwrap();
        assert!(!wrong.success);
        let empty = change_password(DEFAULT_PASSWORD.into(), "".into(), &workspace).await.unwrap();
        assert!(!empty.success);

        assert!(change_password(DEFAULT_PASSWORD.into(), "new".into(), &workspace).await.unwrap().success);
        assert!(unlock("new".into(), &workspace).await.unwrap().success);
    }

    #[tokio::test]
    async fn test_preferences() {
        let dir = tempdir().unwrap();
        let workspace = Workspace::open(DataPaths::new_with_base(dir.path())).await.unwrap();
        assert_eq!(set_font_size(200, &workspace).await.unwrap(), 48);
        assert!(set_theme("light".into(), &workspace).await.unwrap().success);
        assert!(!set_theme(" ".into(), &workspace).await.unwrap().success);
        let prefs = get_preferences(&workspace).await.unwrap();
        assert_eq!(prefs, Preferences { font_size: 48, theme: "light".into() });
    }
}
