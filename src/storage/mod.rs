//! Storage backend trait and implementations.
//!
//! This module provides the document source the link graph and the index
//! pipeline read from. Documents are addressed by their ID (path relative to
//! the corpus root, see [`crate::corpus`]).

pub mod local;

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::corpus::{DocumentMetadata, TitleIndex};

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("No document matches title: {0}")]
    Unresolved(String),

    #[error("Invalid document path: {0}")]
    InvalidPath(String),

    #[error("Failed to read: {0}")]
    ReadError(String),

    #[error("Failed to walk corpus: {0}")]
    WalkError(String),
}

/// Trait for document sources (local filesystem, remote stores, etc.).
pub trait StorageBackend: Send + Sync {
    /// Check if a document exists.
    fn exists(&self, id: &str) -> bool;

    /// Read a document's metadata and content.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the document doesn't exist, or
    /// `StorageError::ReadError` if it cannot be read.
    fn read_document(&self, id: &str) -> Result<(DocumentMetadata, String), StorageError>;

    /// Get a document's last modification time.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the document doesn't exist or has no
    /// readable metadata.
    fn modified_time(&self, id: &str) -> Result<DateTime<Utc>, StorageError>;

    /// List the IDs of every document in the corpus, in a stable order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::WalkError` if the corpus cannot be enumerated.
    fn list_documents(&self) -> Result<Vec<String>, StorageError>;

    /// Snapshot of title lookups for the whole corpus.
    ///
    /// Corpus-wide passes resolve every link against one snapshot instead of
    /// calling [`StorageBackend::resolve_title`] per link.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the corpus cannot be enumerated.
    fn title_index(&self) -> Result<TitleIndex, StorageError> {
        Ok(TitleIndex::build(self.list_documents()?))
    }

    /// Resolve a wikilink title to a document ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unresolved` if no document matches the title.
    fn resolve_title(&self, title: &str) -> Result<String, StorageError> {
        self.title_index()?
            .resolve(title)
            .map(str::to_string)
            .ok_or_else(|| StorageError::Unresolved(title.to_string()))
    }

    /// Get the root path/identifier for this storage backend.
    fn root(&self) -> &Path;
}
