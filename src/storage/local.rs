//! Local filesystem storage backend.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use walkdir::{DirEntry, WalkDir};

use crate::corpus::{DocumentMetadata, document_id, title_from_id};
use crate::storage::{StorageBackend, StorageError};

/// Default document extension.
pub const DEFAULT_EXTENSION: &str = "md";

/// Storage backend for a corpus rooted in a local directory.
///
/// Every file below the root with the configured extension is a document.
/// Hidden files and directories (`.index`, `.git`, ...) are skipped.
pub struct LocalStorageBackend {
    root: PathBuf,
    extension: String,
}

impl LocalStorageBackend {
    /// Create a new local storage backend rooted at the given path.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self::with_extension(root, DEFAULT_EXTENSION)
    }

    #[must_use]
    pub fn with_extension(root: PathBuf, extension: &str) -> Self {
        Self {
            root,
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    /// Map a document ID to its path on disk, refusing IDs that escape the root.
    fn full_path(&self, id: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(id);
        if document_id(relative).is_none() {
            return Err(StorageError::InvalidPath(id.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn is_document(&self, entry: &DirEntry) -> bool {
        entry.file_type().is_file()
            && entry
                .path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension))
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

fn modified_at(path: &Path) -> Result<(DateTime<Utc>, u64), StorageError> {
    let metadata =
        fs::metadata(path).map_err(|e| StorageError::ReadError(format!("{}: {e}", path.display())))?;
    let modified = metadata
        .modified()
        .map_err(|e| StorageError::ReadError(format!("{}: {e}", path.display())))?;
    Ok((DateTime::<Utc>::from(modified), metadata.len()))
}

impl StorageBackend for LocalStorageBackend {
    fn exists(&self, id: &str) -> bool {
        self.full_path(id).is_ok_and(|path| path.is_file())
    }

    fn read_document(&self, id: &str) -> Result<(DocumentMetadata, String), StorageError> {
        let full_path = self.full_path(id)?;

        if !full_path.is_file() {
            return Err(StorageError::NotFound(id.to_string()));
        }

        let content = fs::read_to_string(&full_path)
            .map_err(|e| StorageError::ReadError(format!("{}: {e}", full_path.display())))?;
        let (modified, size_bytes) = modified_at(&full_path)?;

        let metadata = DocumentMetadata {
            id: id.to_string(),
            title: title_from_id(id),
            path: full_path,
            modified,
            size_bytes,
        };

        Ok((metadata, content))
    }

    fn modified_time(&self, id: &str) -> Result<DateTime<Utc>, StorageError> {
        let full_path = self.full_path(id)?;

        if !full_path.is_file() {
            return Err(StorageError::NotFound(id.to_string()));
        }

        modified_at(&full_path).map(|(modified, _)| modified)
    }

    fn list_documents(&self) -> Result<Vec<String>, StorageError> {
        if !self.root.is_dir() {
            return Err(StorageError::WalkError(format!(
                "{}: not a directory",
                self.root.display()
            )));
        }

        let mut ids = Vec::new();
        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden(e));

        for entry in walker {
            let entry = entry.map_err(|e| StorageError::WalkError(e.to_string()))?;
            if !self.is_document(&entry) {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            if let Some(id) = document_id(relative) {
                ids.push(id);
            }
        }

        Ok(ids)
    }

    fn root(&self) -> &Path {
        &self.root
    }
}
