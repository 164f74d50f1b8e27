//! Vector store contract and records.
//!
//! The index pipeline writes whole documents and excerpts into two logical
//! collections and reads them back by nearest-neighbour query. How a store
//! performs the search is its own business; [`local::LocalVectorStore`] is a
//! brute-force implementation persisted as JSON.

pub mod local;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during vector store operations.
#[derive(Debug, Error)]
pub enum VectorError {
    #[error("Embedding dimension mismatch in {collection}: expected {expected}, got {actual}")]
    DimensionMismatch {
        collection: Collection,
        expected: usize,
        actual: usize,
    },

    #[error("Failed to read vector store: {0}")]
    ReadError(String),

    #[error("Failed to write vector store: {0}")]
    WriteError(String),
}

/// The two logical collections maintained by the index pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// One record per document, keyed by document ID.
    Documents,
    /// One record per excerpt, keyed by content hash.
    Excerpts,
}

impl Collection {
    pub const ALL: [Self; 2] = [Self::Documents, Self::Excerpts];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Documents => "documents",
            Self::Excerpts => "excerpts",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Metadata attached to every stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub document_id: String,
    pub document_title: String,
}

/// A record as written to and read from a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorDocumentForStorage {
    pub id: String,
    pub content: String,
    pub metadata: RecordMetadata,
}

/// A query hit. Smaller distances are closer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub document: VectorDocumentForStorage,
    pub distance: f32,
}

/// Trait for vector stores (local, remote services, etc.).
pub trait VectorStore: Send + Sync {
    /// Insert or replace the record with `record.id`.
    ///
    /// # Errors
    ///
    /// Returns `VectorError` if the record cannot be stored.
    fn upsert(
        &mut self,
        collection: Collection,
        record: VectorDocumentForStorage,
        embedding: Vec<f32>,
    ) -> Result<(), VectorError>;

    /// Return up to `n_results` records ordered by ascending distance.
    ///
    /// No distance ceiling is applied.
    ///
    /// # Errors
    ///
    /// Returns `VectorError` if the query cannot be executed.
    fn query(
        &self,
        collection: Collection,
        embedding: &[f32],
        n_results: usize,
    ) -> Result<Vec<QueryResult>, VectorError>;

    /// Remove every record from a collection.
    ///
    /// # Errors
    ///
    /// Returns `VectorError` if the collection cannot be cleared.
    fn reset(&mut self, collection: Collection) -> Result<(), VectorError>;

    /// Make previous writes durable. Stores that write through can rely on
    /// the default.
    ///
    /// # Errors
    ///
    /// Returns `VectorError::WriteError` if persisting fails.
    fn flush(&mut self) -> Result<(), VectorError> {
        Ok(())
    }

    /// Number of records in a collection.
    fn count(&self, collection: Collection) -> usize;
}
