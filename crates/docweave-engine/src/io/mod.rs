use crate::blocks::OpSource;
use crate::delta::{Delta, Registry};
use crate::document::Document;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid operation list in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Not a document: {0}")]
    NotADocument(PathBuf),
}

/// Read an operation list from a JSON file
pub fn load_ops(path: &Path) -> Result<Delta, IoError> {
    if !path.exists() {
        return Err(IoError::NotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|source| IoError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Write an operation list as pretty-printed JSON
pub fn save_ops(path: &Path, delta: &Delta) -> Result<(), IoError> {
    // Create parent directories if they don't exist
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(delta).map_err(|source| IoError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json)?;
    Ok(())
}

/// Load a document; the file must hold inserts only
pub fn load_document(path: &Path, registry: &Registry) -> Result<Document, IoError> {
    let delta = load_ops(path)?;
    if !delta.is_document() {
        return Err(IoError::NotADocument(path.to_path_buf()));
    }
    Ok(Document::from_ops(&delta, registry))
}

pub fn save_document(path: &Path, document: &Document) -> Result<(), IoError> {
    save_ops(path, &document.to_ops())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::Exportable;
    use crate::tests::fixtures::document_with_table;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn temp_dir() -> TempDir {
        TempDir::new().expect("Failed to create temp dir")
    }

    #[test]
    fn test_save_and_load_document() {
        let dir = temp_dir();
        let path = dir.path().join("doc.json");
        let document = document_with_table();

        save_document(&path, &document).unwrap();
        let loaded = load_document(&path, &Registry::default()).unwrap();

        assert_eq!(loaded.to_ops(), document.to_ops());
        assert_eq!(loaded.to_text(None), document.to_text(None));
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = temp_dir();
        let path = dir.path().join("nested").join("deeper").join("ops.json");
        let delta = Delta::new().insert("hi\n", None);

        save_ops(&path, &delta).unwrap();

        assert!(path.exists());
        assert_eq!(load_ops(&path).unwrap(), delta);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = temp_dir();
        let result = load_ops(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(IoError::NotFound(_))));
    }

    #[test]
    fn test_load_malformed_json() {
        let dir = temp_dir();
        let path = dir.path().join("bad.json");
        fs::write(&path, "[{\"insert\": ").unwrap();
        let result = load_ops(&path);
        assert!(matches!(result, Err(IoError::Json { .. })));
        assert!(result.unwrap_err().to_string().contains("bad.json"));
    }

    #[test]
    fn test_change_is_not_a_document() {
        let dir = temp_dir();
        let path = dir.path().join("change.json");
        save_ops(&path, &Delta::new().retain(3, None).insert("x", None)).unwrap();
        let result = load_document(&path, &Registry::default());
        assert!(matches!(result, Err(IoError::NotADocument(_))));
    }
}
