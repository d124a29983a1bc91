use std::time::Duration;

use thiserror::Error;

/// Rejections raised locally before anything is mutated. These are always
/// shown to the user.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Name cannot be empty")]
    EmptyName,

    #[error("The root folder cannot be deleted or moved")]
    RootFolderProtected,

    #[error("Folder not found: {0}")]
    FolderNotFound(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Parent folder not found: {0}")]
    ParentNotFound(String),

    #[error("Cannot move folder {folder} into its own descendant {target}")]
    WouldCreateCycle { folder: String, target: String },

    #[error("Invalid import file: {0}")]
    InvalidImport(String),
}

/// Failures reported by a storage provider.
///
/// Everything except `Rejected` is transient from the engine's point of
/// view: it falls back to local persistence and carries on.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error ({status}): {message}")]
    Http { status: u16, message: String },

    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Server requested local storage: {0}")]
    UseLocalStorage(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// 4xx-class errors: the request itself is wrong, retrying won't help.
    pub fn is_permanent(&self) -> bool {
        matches!(self, StorageError::Rejected { .. })
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            StorageError::Network(format!("timeout: {}", e))
        } else if e.is_decode() {
            StorageError::MalformedResponse(e.to_string())
        } else {
            StorageError::Network(e.to_string())
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_rejections_are_permanent() {
        let rejected = StorageError::Rejected {
            status: 400,
            message: "bad".into(),
        };
        assert!(rejected.is_permanent());
        assert!(!StorageError::Timeout(Duration::from_secs(5)).is_permanent());
        assert!(!StorageError::Http {
            status: 503,
            message: "down".into()
        }
        .is_permanent());
        assert!(!StorageError::UseLocalStorage("no db".into()).is_permanent());
    }

    #[test]
    fn test_engine_error_messages() {
        assert_eq!(EngineError::EmptyName.to_string(), "Name cannot be empty");
        assert_eq!(
            EngineError::FolderNotFound("9".into()).to_string(),
            "Folder not found: 9"
        );
    }
}
