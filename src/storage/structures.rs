// Structure store - one JSON file per document under `<base>/structures/`
//
// Documents are keyed by id; the filename is `<id>.json`. Concurrency policy
// is last-writer-wins (writes are atomic, so a reader sees either the old or
// the new document, never a mix).

use std::fs;
use std::path::{Path, PathBuf};

use super::{ensure_dir, read_json, write_json, FileResult};
use crate::models::StructureDocument;

fn structures_dir(base: &Path) -> PathBuf {
    base.join("structures")
}

fn structure_path(base: &Path, id: &str) -> PathBuf {
    structures_dir(base).join(format!("{}.json", id))
}

/// Ids become filenames, so only filename-safe characters are accepted
fn is_safe_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Persist a document, replacing any previous version with the same id
pub fn save_structure(base: &Path, doc: &StructureDocument) -> FileResult<()> {
    if !is_safe_id(&doc.id) {
        return Err(format!("Invalid structure id: '{}'", doc.id));
    }
    ensure_dir(&structures_dir(base))?;
    write_json(&structure_path(base, &doc.id), doc)?;
    log::debug!("Saved structure {}", doc.id);
    Ok(())
}

/// Load a document by id; `Ok(None)` when no such document exists
pub fn load_structure(base: &Path, id: &str) -> FileResult<Option<StructureDocument>> {
    if !is_safe_id(id) {
        return Err(format!("Invalid structure id: '{}'", id));
    }
    let path = structure_path(base, id);
    if !path.exists() {
        return Ok(None);
    }
    read_json(&path).map(Some)
}

/// Ids of all stored documents, sorted
pub fn list_structure_ids(base: &Path) -> FileResult<Vec<String>> {
    let dir = structures_dir(base);
    if !dir.exists() {
        return Ok(vec![]);
    }

    let entries =
        fs::read_dir(&dir).map_err(|e| format!("Failed to read {}: {}", dir.display(), e))?;

    let mut ids = vec![];
    for entry in entries {
        let entry = entry.map_err(|e| format!("Failed to read entry in {}: {}", dir.display(), e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(id) = name.strip_suffix(".json") {
            ids.push(id.to_string());
        }
    }
    ids.sort();
    Ok(ids)
}

/// Remove a stored document; returns whether anything was deleted
pub fn delete_structure(base: &Path, id: &str) -> FileResult<bool> {
    if !is_safe_id(id) {
        return Err(format!("Invalid structure id: '{}'", id));
    }
    let path = structure_path(base, id);
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_file(&path).map_err(|e| format!("Failed to delete {}: {}", path.display(), e))?;
    log::debug!("Deleted structure {}", id);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let doc = StructureDocument::new("My App", "desc");

        save_structure(dir.path(), &doc).unwrap();
        let loaded = load_structure(dir.path(), &doc.id).unwrap().unwrap();
        assert_eq!(loaded.id, doc.id);
        assert_eq!(loaded.title, "My App");
    }

    #[test]
    fn test_load_missing_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(load_structure(dir.path(), "nope").unwrap().is_none());
    }

    #[test]
    fn test_list_ids_sorted() {
        let dir = TempDir::new().unwrap();
        for title in ["b", "a", "c"] {
            let mut doc = StructureDocument::new(title, "");
            doc.id = format!("doc-{}", title);
            save_structure(dir.path(), &doc).unwrap();
        }
        assert_eq!(
            list_structure_ids(dir.path()).unwrap(),
            vec!["doc-a", "doc-b", "doc-c"]
        );
    }

    #[test]
    fn test_list_on_fresh_base_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(list_structure_ids(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_save_overwrites() {
        let dir = TempDir::new().unwrap();
        let mut doc = StructureDocument::new("v1", "");
        save_structure(dir.path(), &doc).unwrap();

        doc.title = "v2".to_string();
        save_structure(dir.path(), &doc).unwrap();

        let loaded = load_structure(dir.path(), &doc.id).unwrap().unwrap();
        assert_eq!(loaded.title, "v2");
        assert_eq!(list_structure_ids(dir.path()).unwrap().len(), 1);
    }

    #[test]
    fn test_delete() {
        let dir = TempDir::new().unwrap();
        let doc = StructureDocument::new("App", "");
        save_structure(dir.path(), &doc).unwrap();

        assert!(delete_structure(dir.path(), &doc.id).unwrap());
        assert!(!delete_structure(dir.path(), &doc.id).unwrap());
        assert!(load_structure(dir.path(), &doc.id).unwrap().is_none());
    }

    #[test]
    fn test_unsafe_ids_rejected() {
        let dir = TempDir::new().unwrap();
        let mut doc = StructureDocument::new("App", "");
        doc.id = "../escape".to_string();
        assert!(save_structure(dir.path(), &doc).is_err());
        assert!(load_structure(dir.path(), "a/b").is_err());
    }
}
