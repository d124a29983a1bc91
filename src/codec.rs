//! Whole-workspace backup files.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EngineError;
use crate::models::FileSystem;

pub const EXPORT_VERSION: &str = "1.0";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExportEnvelope {
    pub version: String,
    pub timestamp: String,
    pub data: FileSystem,
}

/// Serializes `fs` into a versioned backup payload stamped with `now`.
pub fn export_snapshot(fs: &FileSystem, now: DateTime<Utc>) -> serde_json::Result<String> {
    let envelope = ExportEnvelope {
        version: EXPORT_VERSION.to_string(),
        timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        data: fs.clone(),
    };
    serde_json::to_string_pretty(&envelope)
}

pub fn export_file_name(date: NaiveDate) -> String {
    format!("pingvim-backup-{}.json", date.format("%Y-%m-%d"))
}

/// Parses a backup payload.
///
/// Anything other than an object whose `data.folders` and `data.files` are
/// arrays of well-formed records, with exactly one folder lacking a parent,
/// is rejected as a whole. The version tag is informational only.
pub fn import_snapshot(payload: &str) -> Result<FileSystem, EngineError> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| EngineError::InvalidImport(format!("not valid JSON: {}", e)))?;

    let data = value
        .get("data")
        .ok_or_else(|| EngineError::InvalidImport("missing data".to_string()))?;
    for key in ["folders", "files"] {
        if !data.get(key).map(Value::is_array).unwrap_or(false) {
            return Err(EngineError::InvalidImport(format!(
                "data.{} must be an array",
                key
            )));
        }
    }

    if let Some(version) = value.get("version").and_then(Value::as_str) {
        if version != EXPORT_VERSION {
            log::warn!("Importing backup with unknown version {}", version);
        }
    }

    let fs: FileSystem = serde_json::from_value(data.clone())
        .map_err(|e| EngineError::InvalidImport(format!("malformed record: {}", e)))?;

    let roots = fs.folders.iter().filter(|f| f.is_root()).count();
    if roots != 1 {
        return Err(EngineError::InvalidImport(format!(
            "expected exactly one root folder, found {}",
            roots
        )));
    }
    Ok(fs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{File, Folder};
    use chrono::TimeZone;
    use regex::Regex;

    fn sample() -> FileSystem {
        FileSystem {
            folders: vec![
                Folder::new("1", "PingVim", None),
                Folder::new("5", "notes", Some("1".into())),
            ],
            files: vec![
                File::new("6", "todo.md", "5", "- [ ] buy milk\n"),
                File::new("7", "index.html", "1", "<p>\"quoted\"</p>"),
            ],
        }
    }

    #[test]
    fn test_export_then_import_reproduces_the_tree() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 12, 30, 0).unwrap();
        let payload = export_snapshot(&sample(), now).unwrap();
        assert_eq!(import_snapshot(&payload).unwrap(), sample());
    }

    #[test]
    fn test_export_envelope_shape() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 12, 30, 0).unwrap();
        let payload = export_snapshot(&sample(), now).unwrap();
        let value: Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["version"], "1.0");
        assert_eq!(value["timestamp"], "2024-03-09T12:30:00.000Z");
        assert_eq!(value["data"]["files"][0]["parentId"], "5");
        assert_eq!(value["data"]["folders"][0]["parentId"], Value::Null);
    }

    #[test]
    fn test_export_file_name_is_dated() {
        let name = export_file_name(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(name, "pingvim-backup-2024-01-05.json");
        let pattern = Regex::new(r"^pingvim-backup-\d{4}-\d{2}-\d{2}\.json$").unwrap();
        assert!(pattern.is_match(&export_file_name(Utc::now().date_naive())));
    }

    #[test]
    fn test_import_rejects_wrong_shapes() {
        let cases = [
            "not json",
            "[]",
            r#"{"version":"1.0"}"#,
            r#"{"data":{"folders":[]}}"#,
            r#"{"data":{"folders":{},"files":[]}}"#,
            r#"{"data":{"folders":[],"files":"nope"}}"#,
            r#"{"data":{"folders":[{"id":"1"}],"files":[]}}"#,
            r#"{"data":{"folders":[],"files":[]}}"#,
            r#"{"data":{"folders":[{"id":"1","name":"a","parentId":null},{"id":"2","name":"b","parentId":null}],"files":[]}}"#,
        ];
        for payload in cases {
            assert!(
                matches!(import_snapshot(payload), Err(EngineError::InvalidImport(_))),
                "accepted {}",
                payload
            );
        }
    }

    #[test]
    fn test_import_accepts_missing_version() {
        let payload = r#"{"data":{"folders":[{"id":"1","name":"r","isOpen":true,"parentId":null}],"files":[]}}"#;
        let fs = import_snapshot(payload).unwrap();
        assert_eq!(fs.folders.len(), 1);
        assert!(fs.folders[0].is_open);
    }
}
