//! Document indexing pipeline: whole documents and token-window excerpts
//! are embedded and upserted into the vector store.
//!
//! A full reindex resets both collections first. An incremental update only
//! touches documents modified after a given time. Documents deleted from
//! the corpus are not removed from the collections.

mod checkpoint;

pub use checkpoint::{CheckpointError, IndexCheckpoint};

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::chunker;
use crate::embedding::{Embedder, EmbeddingError, Tokenizer};
use crate::storage::{StorageBackend, StorageError};
use crate::vector::{
    Collection, QueryResult, RecordMetadata, VectorDocumentForStorage, VectorError, VectorStore,
};

/// Default excerpt length in tokens.
pub const DEFAULT_EXCERPT_SIZE: usize = 500;

/// Default overlap between consecutive excerpts in tokens.
pub const DEFAULT_EXCERPT_OVERLAP: usize = 100;

/// Errors that can occur while indexing or querying.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Vector(#[from] VectorError),

    /// The whole-document record was stored but its excerpts were not, so
    /// the two collections disagree about `document`.
    #[error("Partially indexed {document}: {source}")]
    Partial {
        document: String,
        #[source]
        source: Box<IndexError>,
    },
}

/// Where the pipeline currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IndexState {
    Idle,
    Scanning { incremental: bool },
    Indexing,
}

impl fmt::Display for IndexState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Scanning { incremental: false } => f.write_str("scanning"),
            Self::Scanning { incremental: true } => f.write_str("scanning (incremental)"),
            Self::Indexing => f.write_str("indexing"),
        }
    }
}

/// Excerpt window configuration, in tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExcerptOptions {
    pub size: usize,
    pub overlap: usize,
}

impl Default for ExcerptOptions {
    fn default() -> Self {
        Self {
            size: DEFAULT_EXCERPT_SIZE,
            overlap: DEFAULT_EXCERPT_OVERLAP,
        }
    }
}

/// Counts reported after a reindex or update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexSummary {
    pub documents_indexed: usize,
    pub excerpts_indexed: usize,
    /// Documents stored for presence only because they had no content.
    pub empty_documents: usize,
}

/// A document-level query hit with the document's current content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentMatch {
    pub document: VectorDocumentForStorage,
    pub distance: f32,
}

/// Called once per document as `(document_id, processed, total)`, with
/// `processed` counting from 1.
pub type ProgressCallback<'a> = dyn FnMut(&str, usize, usize) + 'a;

/// Stable ID for an excerpt: SHA-256 of its text, hex encoded.
#[must_use]
pub fn content_hash(text: &str) -> String {
    Sha256::digest(text.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

pub struct IndexService {
    storage: Arc<dyn StorageBackend>,
    tokenizer: Box<dyn Tokenizer>,
    embedder: Box<dyn Embedder>,
    store: Box<dyn VectorStore>,
    state: IndexState,
}

impl IndexService {
    #[must_use]
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        tokenizer: Box<dyn Tokenizer>,
        embedder: Box<dyn Embedder>,
        store: Box<dyn VectorStore>,
    ) -> Self {
        Self {
            storage,
            tokenizer,
            embedder,
            store,
            state: IndexState::Idle,
        }
    }

    #[must_use]
    pub fn state(&self) -> IndexState {
        self.state
    }

    #[must_use]
    pub fn store(&self) -> &dyn VectorStore {
        self.store.as_ref()
    }

    fn transition(&mut self, next: IndexState) {
        debug!(from = %self.state, to = %next, "Index state change");
        self.state = next;
    }

    /// Reset both collections and index every document in the corpus.
    ///
    /// # Errors
    ///
    /// Returns `IndexError` on the first storage, tokenizer, embedding or
    /// vector store failure. Documents processed before the failure stay
    /// indexed.
    pub fn reindex_all(
        &mut self,
        options: ExcerptOptions,
        progress: &mut ProgressCallback<'_>,
    ) -> Result<IndexSummary, IndexError> {
        self.transition(IndexState::Scanning { incremental: false });
        let result = self.scan_all().and_then(|documents| {
            for collection in Collection::ALL {
                self.store.reset(collection)?;
            }
            self.index_documents(&documents, options, progress)
        });
        self.finish(result)
    }

    /// Index only documents modified strictly after `since`.
    ///
    /// # Errors
    ///
    /// Returns `IndexError` on the first storage, tokenizer, embedding or
    /// vector store failure.
    pub fn update_index(
        &mut self,
        since: DateTime<Utc>,
        options: ExcerptOptions,
        progress: &mut ProgressCallback<'_>,
    ) -> Result<IndexSummary, IndexError> {
        self.transition(IndexState::Scanning { incremental: true });
        let result = self
            .scan_modified_since(since)
            .and_then(|documents| self.index_documents(&documents, options, progress));
        self.finish(result)
    }

    /// Deleted documents are not removed from the collections; their records
    /// stay until the next full reindex.
    pub fn remove_document(&mut self, id: &str) {
        warn!(
            document = id,
            "Removing documents from the index is not supported; run a full reindex"
        );
    }

    fn finish(
        &mut self,
        result: Result<IndexSummary, IndexError>,
    ) -> Result<IndexSummary, IndexError> {
        let flushed = self.store.flush();
        self.transition(IndexState::Idle);
        let summary = result?;
        flushed?;
        info!(
            documents = summary.documents_indexed,
            excerpts = summary.excerpts_indexed,
            empty = summary.empty_documents,
            "Indexing finished"
        );
        Ok(summary)
    }

    fn scan_all(&self) -> Result<Vec<String>, IndexError> {
        Ok(self.storage.list_documents()?)
    }

    fn scan_modified_since(&self, since: DateTime<Utc>) -> Result<Vec<String>, IndexError> {
        let mut modified = Vec::new();
        for id in self.storage.list_documents()? {
            if self.storage.modified_time(&id)? > since {
                modified.push(id);
            }
        }
        debug!(count = modified.len(), %since, "Documents modified since last index");
        Ok(modified)
    }

    fn index_documents(
        &mut self,
        documents: &[String],
        options: ExcerptOptions,
        progress: &mut ProgressCallback<'_>,
    ) -> Result<IndexSummary, IndexError> {
        self.transition(IndexState::Indexing);
        let total = documents.len();
        let mut summary = IndexSummary::default();

        for (processed, id) in documents.iter().enumerate() {
            let excerpts = self.index_document(id, options)?;
            summary.documents_indexed += 1;
            summary.excerpts_indexed += excerpts;
            if excerpts == 0 {
                summary.empty_documents += 1;
            }
            progress(id, processed + 1, total);
        }

        Ok(summary)
    }

    /// Upsert one document and its excerpts, returning the excerpt count.
    fn index_document(&mut self, id: &str, options: ExcerptOptions) -> Result<usize, IndexError> {
        let (metadata, content) = self.storage.read_document(id)?;
        let record_metadata = RecordMetadata {
            document_id: metadata.id.clone(),
            document_title: metadata.title.clone(),
        };

        let embedding = self.embedder.embed(&content)?;
        self.store.upsert(
            Collection::Documents,
            VectorDocumentForStorage {
                id: metadata.id.clone(),
                content: content.clone(),
                metadata: record_metadata.clone(),
            },
            embedding,
        )?;

        if content.is_empty() {
            debug!(document = id, "Empty document, no excerpts");
            return Ok(0);
        }

        self.index_excerpts(&content, &record_metadata, options)
            .map_err(|e| IndexError::Partial {
                document: id.to_string(),
                source: Box::new(e),
            })
    }

    fn index_excerpts(
        &mut self,
        content: &str,
        metadata: &RecordMetadata,
        options: ExcerptOptions,
    ) -> Result<usize, IndexError> {
        let tokens = self.tokenizer.encode(content)?;
        let windows = chunker::split(&tokens, options.size, options.overlap);

        for window in &windows {
            let text = self.tokenizer.decode(window)?;
            let embedding = self.embedder.embed(&text)?;
            self.store.upsert(
                Collection::Excerpts,
                VectorDocumentForStorage {
                    id: content_hash(&text),
                    content: text,
                    metadata: metadata.clone(),
                },
                embedding,
            )?;
        }

        debug!(
            document = %metadata.document_id,
            tokens = tokens.len(),
            excerpts = windows.len(),
            "Indexed excerpts"
        );
        Ok(windows.len())
    }

    /// Excerpts closest to `query` with `distance <= max_distance`.
    ///
    /// # Errors
    ///
    /// Returns `IndexError` if embedding the query or querying the store fails.
    pub fn query_excerpts(
        &self,
        query: &str,
        n_results: usize,
        max_distance: f32,
    ) -> Result<Vec<QueryResult>, IndexError> {
        let embedding = self.embedder.embed(query)?;
        let results = self
            .store
            .query(Collection::Excerpts, &embedding, n_results)?
            .into_iter()
            .filter(|r| r.distance <= max_distance)
            .collect();
        Ok(results)
    }

    /// Documents closest to `query`, each re-read from storage.
    ///
    /// A `max_distance` of exactly `0.0` disables distance filtering.
    /// Documents that no longer exist are dropped from the results.
    ///
    /// # Errors
    ///
    /// Returns `IndexError` if embedding the query, querying the store or
    /// reading an existing document fails.
    pub fn query_documents(
        &self,
        query: &str,
        n_results: usize,
        max_distance: f32,
    ) -> Result<Vec<DocumentMatch>, IndexError> {
        let embedding = self.embedder.embed(query)?;
        let hits = self.store.query(Collection::Documents, &embedding, n_results)?;
        let unfiltered = max_distance == 0.0;

        let mut matches = Vec::new();
        for hit in hits {
            if !unfiltered && hit.distance > max_distance {
                continue;
            }

            let id = &hit.document.id;
            if !self.storage.exists(id) {
                warn!(document = %id, "Indexed document no longer exists, skipping");
                continue;
            }

            let (metadata, content) = self.storage.read_document(id)?;
            matches.push(DocumentMatch {
                document: VectorDocumentForStorage {
                    id: metadata.id.clone(),
                    content,
                    metadata: RecordMetadata {
                        document_id: metadata.id,
                        document_title: metadata.title,
                    },
                },
                distance: hit.distance,
            });
        }

        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use tempfile::TempDir;

    use crate::embedding::hashing::HashingEmbedder;
    use crate::storage::local::LocalStorageBackend;
    use crate::vector::local::LocalVectorStore;

    /// One token per character.
    struct CharTokenizer;

    impl Tokenizer for CharTokenizer {
        fn encode(&self, text: &str) -> Result<Vec<u32>, EmbeddingError> {
            Ok(text.chars().map(u32::from).collect())
        }

        fn decode(&self, tokens: &[u32]) -> Result<String, EmbeddingError> {
            tokens
                .iter()
                .map(|&t| char::from_u32(t).ok_or_else(|| EmbeddingError::Decoding(t.to_string())))
                .collect()
        }
    }

    /// Fails on anything shorter than a whole test document.
    struct ShortTextFails;

    impl Embedder for ShortTextFails {
        fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            if text.len() < 10 {
                return Err(EmbeddingError::Provider("too short".to_string()));
            }
            Ok(vec![1.0, 0.0])
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    /// Every text embeds to the same unit vector.
    struct ConstantEmbedder;

    impl Embedder for ConstantEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(vec![1.0, 0.0])
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    fn corpus(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    fn service(dir: &TempDir, embedder: Box<dyn Embedder>) -> IndexService {
        IndexService::new(
            Arc::new(LocalStorageBackend::new(dir.path().to_path_buf())),
            Box::new(CharTokenizer),
            embedder,
            Box::new(LocalVectorStore::in_memory()),
        )
    }

    const SMALL: ExcerptOptions = ExcerptOptions {
        size: 4,
        overlap: 2,
    };

    mod reindex_tests {
        use super::*;

        #[test]
        fn indexes_documents_and_excerpts() {
            let dir = corpus(&[("a.md", "abcdefghij"), ("b.md", "xyz")]);
            let mut service = service(&dir, Box::new(HashingEmbedder::new(16).unwrap()));

            let summary = service.reindex_all(SMALL, &mut |_, _, _| {}).unwrap();

            assert_eq!(summary.documents_indexed, 2);
            // "abcdefghij" -> abcd, cdef, efgh, ghij; "xyz" -> xyz
            assert_eq!(summary.excerpts_indexed, 5);
            assert_eq!(service.store().count(Collection::Documents), 2);
            assert_eq!(service.store().count(Collection::Excerpts), 5);
            assert_eq!(service.state(), IndexState::Idle);
        }

        #[test]
        fn empty_document_is_stored_without_excerpts() {
            let dir = corpus(&[("empty.md", "")]);
            let mut service = service(&dir, Box::new(HashingEmbedder::new(16).unwrap()));

            let summary = service.reindex_all(SMALL, &mut |_, _, _| {}).unwrap();

            assert_eq!(summary.empty_documents, 1);
            assert_eq!(service.store().count(Collection::Documents), 1);
            assert_eq!(service.store().count(Collection::Excerpts), 0);
        }

        #[test]
        fn progress_counts_from_one() {
            let dir = corpus(&[("a.md", "one"), ("b.md", "two"), ("c.md", "three")]);
            let mut service = service(&dir, Box::new(HashingEmbedder::new(16).unwrap()));

            let mut calls = Vec::new();
            service
                .reindex_all(SMALL, &mut |id, processed, total| {
                    calls.push((id.to_string(), processed, total));
                })
                .unwrap();

            assert_eq!(
                calls,
                vec![
                    ("a.md".to_string(), 1, 3),
                    ("b.md".to_string(), 2, 3),
                    ("c.md".to_string(), 3, 3),
                ]
            );
        }

        #[test]
        fn excerpt_ids_are_content_hashes() {
            let dir = corpus(&[("a.md", "xyz")]);
            let mut service = service(&dir, Box::new(HashingEmbedder::new(16).unwrap()));
            service.reindex_all(SMALL, &mut |_, _, _| {}).unwrap();

            let hits = service.query_excerpts("xyz", 10, MAX_DISTANCE).unwrap();
            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].document.id, content_hash("xyz"));
            assert_eq!(hits[0].document.metadata.document_id, "a.md");
            assert_eq!(hits[0].document.metadata.document_title, "a");
        }

        #[test]
        fn reindex_drops_stale_records() {
            let dir = corpus(&[("a.md", "first version"), ("b.md", "other")]);
            let mut service = service(&dir, Box::new(HashingEmbedder::new(16).unwrap()));
            service.reindex_all(SMALL, &mut |_, _, _| {}).unwrap();

            fs::remove_file(dir.path().join("b.md")).unwrap();
            service.reindex_all(SMALL, &mut |_, _, _| {}).unwrap();

            assert_eq!(service.store().count(Collection::Documents), 1);
        }

        #[test]
        fn excerpt_failure_is_partial() {
            let dir = corpus(&[("a.md", "abcdefghijkl")]);
            let mut service = service(&dir, Box::new(ShortTextFails));

            let err = service.reindex_all(SMALL, &mut |_, _, _| {}).unwrap_err();

            assert!(matches!(&err, IndexError::Partial { document, .. } if document == "a.md"));
            assert_eq!(service.store().count(Collection::Documents), 1);
            assert_eq!(service.state(), IndexState::Idle);
        }
    }

    mod query_tests {
        use super::*;

        fn indexed(files: &[(&str, &str)]) -> (TempDir, IndexService) {
            let dir = corpus(files);
            let mut service = service(&dir, Box::new(HashingEmbedder::default()));
            service
                .reindex_all(ExcerptOptions::default(), &mut |_, _, _| {})
                .unwrap();
            (dir, service)
        }

        #[test]
        fn excerpt_filter_is_inclusive() {
            let dir = corpus(&[("a.md", "abcdefghij")]);
            let mut service = service(&dir, Box::new(ConstantEmbedder));
            service.reindex_all(SMALL, &mut |_, _, _| {}).unwrap();

            let exact = service.query_excerpts("anything", 10, 0.0).unwrap();
            assert_eq!(exact.len(), 4);
            assert!(exact.iter().all(|hit| hit.distance == 0.0));
        }

        #[test]
        fn excerpt_filter_drops_distant_results() {
            let (_dir, service) = indexed(&[("a.md", "rust ownership"), ("b.md", "bread baking")]);

            let hits = service.query_excerpts("rust ownership", 10, 0.3).unwrap();
            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].document.metadata.document_id, "a.md");
        }

        #[test]
        fn zero_max_distance_disables_document_filter() {
            let (_dir, service) = indexed(&[("a.md", "rust ownership"), ("b.md", "bread baking")]);

            let all = service.query_documents("rust ownership", 10, 0.0).unwrap();
            assert_eq!(all.len(), 2);
            assert_eq!(all[0].document.id, "a.md");

            let close = service.query_documents("rust ownership", 10, 0.3).unwrap();
            assert_eq!(close.len(), 1);
        }

        #[test]
        fn document_results_are_reread() {
            let (dir, service) = indexed(&[("a.md", "rust ownership")]);
            fs::write(dir.path().join("a.md"), "rust ownership, revised").unwrap();

            let hits = service.query_documents("rust", 10, 0.0).unwrap();
            assert_eq!(hits[0].document.content, "rust ownership, revised");
        }

        #[test]
        fn vanished_documents_are_dropped() {
            let (dir, service) = indexed(&[("a.md", "rust ownership"), ("b.md", "rust traits")]);
            fs::remove_file(dir.path().join("a.md")).unwrap();

            let hits = service.query_documents("rust", 10, 0.0).unwrap();
            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].document.id, "b.md");
        }
    }

    /// Larger than any cosine distance.
    const MAX_DISTANCE: f32 = 2.0;

    #[test]
    fn content_hash_is_sha256_hex() {
        assert_eq!(
            content_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(content_hash("a").len(), 64);
        assert_ne!(content_hash("a"), content_hash("b"));
    }

    #[test]
    fn state_display() {
        assert_eq!(IndexState::Idle.to_string(), "idle");
        assert_eq!(
            IndexState::Scanning { incremental: true }.to_string(),
            "scanning (incremental)"
        );
    }

    #[test]
    fn remove_document_keeps_records() {
        let dir = corpus(&[("a.md", "content here")]);
        let mut service = service(&dir, Box::new(HashingEmbedder::new(16).unwrap()));
        service.reindex_all(SMALL, &mut |_, _, _| {}).unwrap();

        service.remove_document("a.md");
        assert_eq!(service.store().count(Collection::Documents), 1);
    }
}
