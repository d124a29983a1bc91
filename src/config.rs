use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::models::{Config, ConnectionConfig, StorageType, MAX_FONT_SIZE, MIN_FONT_SIZE};
use crate::panes::{clamp_split_ratio, PaneState};

/// Debounce delay for config saves (1 second)
const SAVE_DEBOUNCE_MS: u64 = 1000;

/// ConfigManager handles loading, saving, and updating the locally persisted
/// settings and pane layout.
///
/// Features:
/// - Thread-safe access via RwLock
/// - Debounced saving so dragging a split divider doesn't hammer the disk
/// - Merges saved config with defaults for missing or malformed fields
pub struct ConfigManager {
    /// The current configuration, shared with the debounced save task
    config: Arc<RwLock<Config>>,
    /// Path to the configuration file
    config_path: Arc<PathBuf>,
    /// Handle to the debounced save task
    save_handle: Mutex<Option<JoinHandle<()>>>,
}

impl ConfigManager {
    /// Creates a new ConfigManager with the given config file path.
    ///
    /// Loads existing configuration from disk, merging with defaults for any
    /// missing fields.
    pub fn new(config_path: PathBuf) -> Result<Self, String> {
        let config = Self::load_from_file(&config_path)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path: Arc::new(config_path),
            save_handle: Mutex::new(None),
        })
    }

    /// Loads configuration from file, merging with defaults.
    ///
    /// If the file doesn't exist, returns default configuration.
    fn load_from_file(path: &Path) -> Result<Config, String> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        merge_config_with_defaults(&content)
    }

    /// Gets a clone of the current configuration.
    pub fn get(&self) -> Config {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Updates the configuration using a closure.
    ///
    /// Nothing is written to disk; call `schedule_save` or `save_sync` after.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Config),
    {
        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut config);
    }

    /// Schedules a debounced save operation.
    ///
    /// If a save is already scheduled, it will be cancelled and a new one
    /// will be scheduled. The save will occur after SAVE_DEBOUNCE_MS milliseconds.
    pub async fn schedule_save(&self) {
        let mut handle_guard = self.save_handle.lock().await;

        if let Some(handle) = handle_guard.take() {
            handle.abort();
        }

        let config_ref = Arc::clone(&self.config);
        let path_ref = Arc::clone(&self.config_path);

        let handle = tokio::spawn(async move {
            sleep(Duration::from_millis(SAVE_DEBOUNCE_MS)).await;

            let config = config_ref
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            if let Err(e) = write_config(&path_ref, &config) {
                log::error!("Debounced config save failed: {}", e);
            }
        });

        *handle_guard = Some(handle);
    }

    /// Updates the configuration and schedules a debounced save.
    pub async fn update_and_save<F>(&self, f: F)
    where
        F: FnOnce(&mut Config),
    {
        self.update(f);
        self.schedule_save().await;
    }

    /// Saves the configuration to disk immediately.
    pub fn save_sync(&self) -> Result<(), String> {
        write_config(&self.config_path, &self.get())
    }

    pub fn get_layout(&self) -> PaneState {
        self.get().layout
    }

    pub fn set_layout(&self, layout: PaneState) {
        self.update(|config| config.layout = layout);
    }

    pub fn get_storage_type(&self) -> StorageType {
        self.get().storage_type
    }

    pub fn set_storage_type(&self, storage_type: StorageType) {
        self.update(|config| config.storage_type = storage_type);
    }

    pub fn get_connection(&self) -> ConnectionConfig {
        self.get().connection
    }

    pub fn set_connection(&self, connection: ConnectionConfig) {
        self.update(|config| config.connection = connection);
    }

    /// Sets the editor font size, clamped to the supported range.
    pub fn set_font_size(&self, size: u32) -> u32 {
        let size = size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        self.update(|config| config.font_size = size);
        size
    }

    pub fn set_theme(&self, theme: impl Into<String>) {
        let theme = theme.into();
        self.update(|config| config.theme = theme);
    }

    /// Compares against the stored shared password.
    pub fn verify_password(&self, attempt: &str) -> bool {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .password
            == attempt
    }

    pub fn set_password(&self, password: &str) -> Result<(), String> {
        if password.trim().is_empty() {
            return Err("Password cannot be empty".to_string());
        }
        let password = password.to_string();
        self.update(|config| config.password = password);
        Ok(())
    }

    /// Returns the config file path.
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

fn write_config(path: &Path, config: &Config) -> Result<(), String> {
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }

    fs::write(path, content).map_err(|e| format!("Failed to write config file: {}", e))
}

/// Merges a partial config JSON with defaults.
///
/// Every field is taken from `partial_json` only if present and well typed;
/// anything else keeps its default.
pub fn merge_config_with_defaults(partial_json: &str) -> Result<Config, String> {
    if partial_json.trim().is_empty() {
        return Ok(Config::default());
    }

    let json_value: serde_json::Value = serde_json::from_str(partial_json)
        .map_err(|e| format!("Failed to parse config: {}", e))?;

    let mut config = Config::default();

    if let Some(obj) = json_value.as_object() {
        if let Some(v) = obj.get("font_size").and_then(|v| v.as_u64()) {
            config.font_size = (v.min(u32::MAX as u64) as u32).clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        }
        if let Some(v) = obj.get("theme").and_then(|v| v.as_str()) {
            config.theme = v.to_string();
        }
        if let Some(v) = obj.get("storage_type") {
            if let Ok(storage_type) = serde_json::from_value(v.clone()) {
                config.storage_type = storage_type;
            }
        }
        if let Some(v) = obj.get("connection") {
            if let Ok(connection) = serde_json::from_value(v.clone()) {
                config.connection = connection;
            }
        }
        if let Some(v) = obj.get("password").and_then(|v| v.as_str()) {
            if !v.is_empty() {
                config.password = v.to_string();
            }
        }
        if let Some(v) = obj.get("layout") {
            if let Ok(layout) = serde_json::from_value::<PaneState>(v.clone()) {
                config.layout = PaneState {
                    split_ratio: clamp_split_ratio(layout.split_ratio),
                    ..layout
                };
            }
        }
    }

    Ok(config)
}
