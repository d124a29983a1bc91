use serde::{Deserialize, Serialize};

use crate::panes::PaneState;

/// Id of the folder every workspace is rooted at.
pub const ROOT_FOLDER_ID: &str = "1";

/// A folder in the workspace tree.
///
/// `is_open` is view state, but it lives on the entity so the expand/collapse
/// state survives a reload.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_open: bool,
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl Folder {
    pub fn new(id: impl Into<String>, name: impl Into<String>, parent_id: Option<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_open: false,
            parent_id,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// A text file. Files always belong to a folder.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct File {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub content: String,
    pub parent_id: String,
}

impl File {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        parent_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            content: content.into(),
            parent_id: parent_id.into(),
        }
    }

    pub fn kind(&self) -> FileKind {
        FileKind::from_name(&self.name)
    }
}

/// Preview renderer a file is dispatched to, chosen by extension.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Markdown,
    Html,
    Image,
    Plain,
}

impl FileKind {
    pub fn from_name(name: &str) -> Self {
        let ext = match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
            _ => return FileKind::Plain,
        };
        match ext.as_str() {
            "md" | "markdown" => FileKind::Markdown,
            "html" | "htm" => FileKind::Html,
            "png" | "jpg" | "jpeg" | "gif" | "svg" | "webp" => FileKind::Image,
            _ => FileKind::Plain,
        }
    }
}

/// Partial update for a folder. `None` fields are left untouched.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FolderPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_open: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl FolderPatch {
    pub fn apply(&self, folder: &mut Folder) {
        if let Some(name) = &self.name {
            folder.name = name.clone();
        }
        if let Some(is_open) = self.is_open {
            folder.is_open = is_open;
        }
        if let Some(parent_id) = &self.parent_id {
            folder.parent_id = Some(parent_id.clone());
        }
    }
}

/// Partial update for a file. `None` fields are left untouched.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl FilePatch {
    pub fn apply(&self, file: &mut File) {
        if let Some(name) = &self.name {
            file.name = name.clone();
        }
        if let Some(content) = &self.content {
            file.content = content.clone();
        }
        if let Some(parent_id) = &self.parent_id {
            file.parent_id = parent_id.clone();
        }
    }
}

/// The whole workspace: an unordered set of folders plus an unordered set
/// of files. Parent/child relationships are derived from `parent_id`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct FileSystem {
    pub folders: Vec<Folder>,
    pub files: Vec<File>,
}

impl FileSystem {
    /// The workspace a fresh install starts with.
    pub fn seed() -> Self {
        let mut root = Folder::new(ROOT_FOLDER_ID, "PingVim", None);
        root.is_open = true;
        Self {
            folders: vec![root],
            files: vec![File::new(
                "2",
                "welcome.md",
                ROOT_FOLDER_ID,
                "# Welcome to PingVim\n\nCreate folders and files from the sidebar.\n",
            )],
        }
    }

    pub fn folder(&self, id: &str) -> Option<&Folder> {
        self.folders.iter().find(|f| f.id == id)
    }

    pub fn folder_mut(&mut self, id: &str) -> Option<&mut Folder> {
        self.folders.iter_mut().find(|f| f.id == id)
    }

    pub fn file(&self, id: &str) -> Option<&File> {
        self.files.iter().find(|f| f.id == id)
    }

    pub fn file_mut(&mut self, id: &str) -> Option<&mut File> {
        self.files.iter_mut().find(|f| f.id == id)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.folder(id).is_some() || self.file(id).is_some()
    }

    pub fn root(&self) -> Option<&Folder> {
        self.folders.iter().find(|f| f.is_root())
    }

    /// Folders directly inside `parent_id`, in insertion order.
    pub fn child_folders<'a>(&'a self, parent_id: &'a str) -> impl Iterator<Item = &'a Folder> + 'a {
        self.folders
            .iter()
            .filter(move |f| f.parent_id.as_deref() == Some(parent_id))
    }

    /// Files directly inside `parent_id`, in insertion order.
    pub fn child_files<'a>(&'a self, parent_id: &'a str) -> impl Iterator<Item = &'a File> + 'a {
        self.files.iter().filter(move |f| f.parent_id == parent_id)
    }
}

/// Which backend the user wants to persist to.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    #[default]
    Local,
    Remote,
}

/// Database connection settings forwarded to the storage server, plus the
/// address of the server itself.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    pub api_url: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl: Option<bool>,
    #[serde(default)]
    pub enabled: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3000/api".to_string(),
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            database: "pingvim".to_string(),
            ssl: None,
            enabled: false,
        }
    }
}

/// Outcome of a connectivity check.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub success: bool,
    pub message: String,
}

impl ConnectionStatus {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Default for the shared password gate.
pub const DEFAULT_PASSWORD: &str = "pingvim";

pub const MIN_FONT_SIZE: u32 = 8;
pub const MAX_FONT_SIZE: u32 = 48;

/// Locally persisted application settings
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Config {
    pub font_size: u32,
    pub theme: String,
    pub storage_type: StorageType,
    pub connection: ConnectionConfig,
    pub password: String,
    pub layout: PaneState,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            font_size: 14,
            theme: "dark".to_string(),
            storage_type: StorageType::Local,
            connection: ConnectionConfig::default(),
            password: DEFAULT_PASSWORD.to_string(),
            layout: PaneState::default(),
        }
    }
}

/// Generic result handed back to the UI by the command layer
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<Folder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<File>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_local_storage: Option<bool>,
}

impl ApiResult {
    /// Create a successful result
    pub fn success() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    /// Create an error result
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn with_folder(folder: Folder) -> Self {
        Self {
            success: true,
            folder: Some(folder),
            ..Default::default()
        }
    }

    pub fn with_file(file: File) -> Self {
        Self {
            success: true,
            file: Some(file),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_api_result_success() {
        let result = ApiResult::success();
        assert!(result.success);
        assert!(result.error.is_none());
    }

    #[test]
    fn test_api_result_error() {
        let result = ApiResult::error("test error");
        assert!(!result.success);
        assert_eq!(result.error, Some("test error".to_string()));
    }

    #[test]
    fn test_seed_has_single_root() {
        let fs = FileSystem::seed();
        let roots: Vec<_> = fs.folders.iter().filter(|f| f.is_root()).collect();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].id, ROOT_FOLDER_ID);
        assert!(fs.files.iter().all(|f| fs.folder(&f.parent_id).is_some()));
    }

    #[test]
    fn test_folder_wire_format_is_camel_case() {
        let folder = Folder::new("7", "notes", Some("1".to_string()));
        let json = serde_json::to_value(&folder).unwrap();
        assert_eq!(json["parentId"], "1");
        assert_eq!(json["isOpen"], false);

        let root: Folder = serde_json::from_str(r#"{"id":"1","name":"root","parentId":null}"#).unwrap();
        assert!(root.is_root());
        assert!(!root.is_open);
    }

    #[test]
    fn test_children_follow_insertion_order() {
        let mut fs = FileSystem::seed();
        fs.folders.push(Folder::new("b", "zeta", Some("1".into())));
        fs.folders.push(Folder::new("a", "alpha", Some("1".into())));
        fs.folders.push(Folder::new("c", "nested", Some("a".into())));

        let names: Vec<_> = fs.child_folders("1").map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert_eq!(fs.child_files("1").count(), 1);
        assert_eq!(fs.child_files("a").count(), 0);
    }

    #[test]
    fn test_patches_touch_only_given_fields() {
        let mut file = File::new("3", "a.md", "1", "old");
        FilePatch {
            content: Some("new".into()),
            ..Default::default()
        }
        .apply(&mut file);
        assert_eq!(file.name, "a.md");
        assert_eq!(file.content, "new");

        let mut folder = Folder::new("4", "x", Some("1".into()));
        FolderPatch {
            is_open: Some(true),
            ..Default::default()
        }
        .apply(&mut folder);
        assert!(folder.is_open);
        assert_eq!(folder.name, "x");
    }

    #[test]
    fn test_file_kind_dispatch() {
        assert_eq!(FileKind::from_name("todo.md"), FileKind::Markdown);
        assert_eq!(FileKind::from_name("INDEX.HTML"), FileKind::Html);
        assert_eq!(FileKind::from_name("cat.jpeg"), FileKind::Image);
        assert_eq!(FileKind::from_name("notes.txt"), FileKind::Plain);
        assert_eq!(FileKind::from_name("Makefile"), FileKind::Plain);
        assert_eq!(FileKind::from_name(".md"), FileKind::Plain);
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.font_size, 14);
        assert_eq!(config.password, DEFAULT_PASSWORD);
        assert_eq!(config.storage_type, StorageType::Local);
        assert!(!config.layout.split_view);
    }

    #[test]
    fn test_connection_config_defaults() {
        let config = ConnectionConfig::default();
        assert_eq!(config.port, 5432);
        assert!(!config.enabled);
        assert!(config.ssl.is_none());
    }

    fn optional_string() -> impl Strategy<Value = Option<String>> {
        prop_oneof![Just(None), ".*".prop_map(Some)]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The UI sees exactly what the command layer produced.
        #[test]
        fn prop_api_result_serialization_round_trip(
            success in any::<bool>(),
            error in optional_string(),
            message in optional_string(),
            content in optional_string(),
            file_name in optional_string(),
        ) {
            let result = ApiResult { success, error, message, content, file_name, ..Default::default() };
            let serialized = serde_json::to_string(&result).expect("Failed to serialize ApiResult");
            let deserialized: ApiResult = serde_json::from_str(&serialized).expect("Failed to deserialize ApiResult");
            prop_assert_eq!(result, deserialized);
        }
    }
}
