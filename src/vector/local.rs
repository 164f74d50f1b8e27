//! In-memory vector store with optional JSON persistence.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::vector::{Collection, QueryResult, VectorDocumentForStorage, VectorError, VectorStore};

/// File name of the persisted store inside the index directory.
const STORE_FILE: &str = "vectors.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    document: VectorDocumentForStorage,
    embedding: Vec<f32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Collections {
    #[serde(default)]
    documents: BTreeMap<String, StoredRecord>,
    #[serde(default)]
    excerpts: BTreeMap<String, StoredRecord>,
}

impl Collections {
    fn get(&self, collection: Collection) -> &BTreeMap<String, StoredRecord> {
        match collection {
            Collection::Documents => &self.documents,
            Collection::Excerpts => &self.excerpts,
        }
    }

    fn get_mut(&mut self, collection: Collection) -> &mut BTreeMap<String, StoredRecord> {
        match collection {
            Collection::Documents => &mut self.documents,
            Collection::Excerpts => &mut self.excerpts,
        }
    }
}

/// Brute-force cosine-distance store.
///
/// Records live in memory; [`VectorStore::flush`] writes them to
/// `vectors.json` in the store directory when one was given.
#[derive(Debug, Default)]
pub struct LocalVectorStore {
    collections: Collections,
    dir: Option<PathBuf>,
}

impl LocalVectorStore {
    /// A store that never touches disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the store persisted in `dir`, starting empty if none exists.
    ///
    /// # Errors
    ///
    /// Returns `VectorError::ReadError` if an existing store cannot be read or
    /// parsed.
    pub fn open(dir: &Path) -> Result<Self, VectorError> {
        let path = dir.join(STORE_FILE);

        let collections = if path.exists() {
            let contents = fs::read_to_string(&path)
                .map_err(|e| VectorError::ReadError(format!("{}: {e}", path.display())))?;
            serde_json::from_str(&contents)
                .map_err(|e| VectorError::ReadError(format!("{}: {e}", path.display())))?
        } else {
            Collections::default()
        };

        Ok(Self {
            collections,
            dir: Some(dir.to_path_buf()),
        })
    }

    fn expected_dimensions(&self, collection: Collection) -> Option<usize> {
        self.collections
            .get(collection)
            .values()
            .next()
            .map(|r| r.embedding.len())
    }
}

/// `1 - cosine similarity`; a zero vector is at distance 1 from everything.
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

impl VectorStore for LocalVectorStore {
    fn upsert(
        &mut self,
        collection: Collection,
        record: VectorDocumentForStorage,
        embedding: Vec<f32>,
    ) -> Result<(), VectorError> {
        if let Some(expected) = self.expected_dimensions(collection)
            && expected != embedding.len()
        {
            return Err(VectorError::DimensionMismatch {
                collection,
                expected,
                actual: embedding.len(),
            });
        }

        self.collections.get_mut(collection).insert(
            record.id.clone(),
            StoredRecord {
                document: record,
                embedding,
            },
        );
        Ok(())
    }

    fn query(
        &self,
        collection: Collection,
        embedding: &[f32],
        n_results: usize,
    ) -> Result<Vec<QueryResult>, VectorError> {
        if let Some(expected) = self.expected_dimensions(collection)
            && expected != embedding.len()
        {
            return Err(VectorError::DimensionMismatch {
                collection,
                expected,
                actual: embedding.len(),
            });
        }

        let mut results: Vec<QueryResult> = self
            .collections
            .get(collection)
            .values()
            .map(|stored| QueryResult {
                document: stored.document.clone(),
                distance: cosine_distance(embedding, &stored.embedding),
            })
            .collect();

        // Stable sort: equal distances stay in ID order.
        results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        results.truncate(n_results);
        Ok(results)
    }

    fn reset(&mut self, collection: Collection) -> Result<(), VectorError> {
        debug!(%collection, "Resetting collection");
        self.collections.get_mut(collection).clear();
        Ok(())
    }

    fn flush(&mut self) -> Result<(), VectorError> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };

        fs::create_dir_all(dir)
            .map_err(|e| VectorError::WriteError(format!("create dir {}: {e}", dir.display())))?;

        let path = dir.join(STORE_FILE);
        let contents = serde_json::to_string(&self.collections)
            .map_err(|e| VectorError::WriteError(e.to_string()))?;

        fs::write(&path, contents)
            .map_err(|e| VectorError::WriteError(format!("{}: {e}", path.display())))
    }

    fn count(&self, collection: Collection) -> usize {
        self.collections.get(collection).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::RecordMetadata;

    fn record(id: &str, content: &str) -> VectorDocumentForStorage {
        VectorDocumentForStorage {
            id: id.to_string(),
            content: content.to_string(),
            metadata: RecordMetadata {
                document_id: format!("{id}.md"),
                document_title: id.to_string(),
            },
        }
    }

    #[test]
    fn query_orders_by_distance() {
        let mut store = LocalVectorStore::in_memory();
        store
            .upsert(Collection::Excerpts, record("far", "x"), vec![0.0, 1.0])
            .unwrap();
        store
            .upsert(Collection::Excerpts, record("near", "y"), vec![1.0, 0.1])
            .unwrap();

        let results = store.query(Collection::Excerpts, &[1.0, 0.0], 10).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document.id, "near");
        assert!(results[0].distance < results[1].distance);
    }

    #[test]
    fn query_truncates_to_n_results() {
        let mut store = LocalVectorStore::in_memory();
        for i in 0..5 {
            store
                .upsert(Collection::Documents, record(&format!("d{i}"), "c"), vec![1.0, 0.0])
                .unwrap();
        }
        assert_eq!(store.query(Collection::Documents, &[1.0, 0.0], 3).unwrap().len(), 3);
    }

    #[test]
    fn upsert_replaces_same_id() {
        let mut store = LocalVectorStore::in_memory();
        store
            .upsert(Collection::Documents, record("a", "old"), vec![1.0])
            .unwrap();
        store
            .upsert(Collection::Documents, record("a", "new"), vec![1.0])
            .unwrap();

        assert_eq!(store.count(Collection::Documents), 1);
        let results = store.query(Collection::Documents, &[1.0], 1).unwrap();
        assert_eq!(results[0].document.content, "new");
    }

    #[test]
    fn collections_are_independent() {
        let mut store = LocalVectorStore::in_memory();
        store
            .upsert(Collection::Documents, record("a", "doc"), vec![1.0])
            .unwrap();
        store
            .upsert(Collection::Excerpts, record("b", "excerpt"), vec![1.0])
            .unwrap();
        store.reset(Collection::Excerpts).unwrap();

        assert_eq!(store.count(Collection::Documents), 1);
        assert_eq!(store.count(Collection::Excerpts), 0);
    }

    #[test]
    fn rejects_dimension_mismatch() {
        let mut store = LocalVectorStore::in_memory();
        store
            .upsert(Collection::Excerpts, record("a", "x"), vec![1.0, 0.0])
            .unwrap();

        let result = store.upsert(Collection::Excerpts, record("b", "y"), vec![1.0]);
        assert!(matches!(result, Err(VectorError::DimensionMismatch { .. })));
        assert!(store.query(Collection::Excerpts, &[1.0], 1).is_err());
    }

    #[test]
    fn zero_vectors_are_maximally_distant() {
        assert!((cosine_distance(&[0.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < f32::EPSILON);
        assert!(cosine_distance(&[2.0, 0.0], &[1.0, 0.0]).abs() < 1e-6);
    }

    #[test]
    fn flush_and_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut store = LocalVectorStore::open(dir.path()).unwrap();
        store
            .upsert(Collection::Excerpts, record("a", "persisted"), vec![0.5, 0.5])
            .unwrap();
        store.flush().unwrap();

        let reopened = LocalVectorStore::open(dir.path()).unwrap();
        assert_eq!(reopened.count(Collection::Excerpts), 1);
        assert_eq!(reopened.count(Collection::Documents), 0);
    }

    #[test]
    fn in_memory_flush_is_noop() {
        let mut store = LocalVectorStore::in_memory();
        assert!(store.flush().is_ok());
    }
}
