// File storage - shared JSON persistence helpers
//
// All storage functions return `Result<T, String>` with human-readable error
// messages. Writes are atomic (temp file + rename) and serialized through an
// exclusive lock on a sidecar lock file, so concurrent writers cannot
// interleave; the last completed write wins.

pub mod structures;

use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

pub type FileResult<T> = Result<T, String>;

/// Create a directory (and parents) if it does not exist
pub fn ensure_dir(path: &Path) -> FileResult<()> {
    fs::create_dir_all(path)
        .map_err(|e| format!("Failed to create directory {}: {}", path.display(), e))
}

/// Read and deserialize a JSON file
pub fn read_json<T: DeserializeOwned>(path: &Path) -> FileResult<T> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&content).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
}

/// Serialize a value to pretty JSON and write it atomically.
///
/// Takes an exclusive lock on `<path>.lock`, writes to `<path>.tmp`, then
/// renames over the destination. Readers never see a half-written file.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> FileResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize {}: {}", path.display(), e))?;

    let lock_path = sibling(path, "lock");
    let lock_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|e| format!("Failed to open lock file {}: {}", lock_path.display(), e))?;
    lock_file
        .lock_exclusive()
        .map_err(|e| format!("Failed to lock {}: {}", lock_path.display(), e))?;

    let tmp_path = sibling(path, "tmp");
    let result = fs::write(&tmp_path, json)
        .map_err(|e| format!("Failed to write {}: {}", tmp_path.display(), e))
        .and_then(|_| {
            fs::rename(&tmp_path, path)
                .map_err(|e| format!("Failed to move {} into place: {}", tmp_path.display(), e))
        });

    if let Err(e) = fs2::FileExt::unlock(&lock_file) {
        log::warn!("Failed to release lock {}: {}", lock_path.display(), e);
    }
    result
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push('.');
    name.push_str(suffix);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_write_and_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");

        write_json(&path, &json!({"a": 1})).unwrap();
        let value: serde_json::Value = read_json(&path).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_read_missing_file_errors() {
        let dir = TempDir::new().unwrap();
        let err = read_json::<serde_json::Value>(&dir.path().join("gone.json")).unwrap_err();
        assert!(err.contains("Failed to read"));
    }

    #[test]
    fn test_write_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        write_json(&path, &json!({})).unwrap();
        assert!(!sibling(&path, "tmp").exists());
    }

    #[test]
    fn test_overwrite_replaces_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        write_json(&path, &json!({"v": 1})).unwrap();
        write_json(&path, &json!({"v": 2})).unwrap();
        let value: serde_json::Value = read_json(&path).unwrap();
        assert_eq!(value["v"], 2);
    }
}
