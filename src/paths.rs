use std::fs;
use std::path::{Path, PathBuf};

/// Where the workspace keeps its local state.
///
/// The structure is:
/// - `{data_dir}/file-system.json` - Local snapshot of every folder and file
/// - `{data_dir}/config.json` - Settings and pane layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    /// Base data directory for the application
    pub base_dir: PathBuf,
    /// Local file-system snapshot (file-system.json)
    pub snapshot_file: PathBuf,
    /// Settings and layout (config.json)
    pub config_file: PathBuf,
}

impl DataPaths {
    /// Resolves the platform-appropriate data directory.
    ///
    /// On Linux: ~/.local/share/pingvim/
    /// On macOS: ~/Library/Application Support/pingvim/
    /// On Windows: C:\Users\{user}\AppData\Roaming\pingvim\
    pub fn new() -> Result<Self, String> {
        let base_dir = dirs::data_dir()
            .ok_or_else(|| "Could not determine data directory".to_string())?
            .join("pingvim");

        Ok(Self::new_with_base(&base_dir))
    }

    /// Lays the files out under a custom base directory.
    pub fn new_with_base(base_dir: &Path) -> Self {
        let base_dir = base_dir.to_path_buf();
        Self {
            snapshot_file: base_dir.join("file-system.json"),
            config_file: base_dir.join("config.json"),
            base_dir,
        }
    }

    /// Creates the base directory if it doesn't exist yet.
    pub fn ensure_directories(&self) -> Result<(), String> {
        fs::create_dir_all(&self.base_dir)
            .map_err(|e| format!("Failed to create data directory: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_paths_new_with_base() {
        let temp_dir = tempdir().unwrap();
        let paths = DataPaths::new_with_base(temp_dir.path());

        assert_eq!(paths.base_dir, temp_dir.path());
        assert_eq!(paths.snapshot_file, temp_dir.path().join("file-system.json"));
        assert_eq!(paths.config_file, temp_dir.path().join("config.json"));
    }

    #[test]
    fn test_ensure_directories_idempotent() {
        let temp_dir = tempdir().unwrap();
        let paths = DataPaths::new_with_base(&temp_dir.path().join("pingvim"));

        assert!(!paths.base_dir.exists());
        paths.ensure_directories().unwrap();
        paths.ensure_directories().unwrap();
        assert!(paths.base_dir.is_dir());
    }
}
