//! Deterministic local embeddings via feature hashing.
//!
//! Each lower-cased alphanumeric term is hashed with SHA-256 into one of
//! `dimensions` buckets with a sign taken from the digest, and the resulting
//! vector is L2-normalised. Texts sharing vocabulary end up close in cosine
//! distance; there is no notion of synonyms.

use sha2::{Digest, Sha256};

use crate::embedding::{Embedder, EmbeddingError};

/// Vector length used when none is configured.
pub const DEFAULT_DIMENSIONS: usize = 384;

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    /// # Errors
    ///
    /// Returns `EmbeddingError::ModelInit` if `dimensions` is zero.
    pub fn new(dimensions: usize) -> Result<Self, EmbeddingError> {
        if dimensions == 0 {
            return Err(EmbeddingError::ModelInit(
                "embedding dimensions must be positive".to_string(),
            ));
        }
        Ok(Self { dimensions })
    }

    fn bucket(&self, term: &str) -> (usize, f32) {
        let digest = Sha256::digest(term.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        let hash = u64::from_le_bytes(bytes);

        #[expect(clippy::cast_possible_truncation)]
        let bucket = (hash % self.dimensions as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        (bucket, sign)
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_DIMENSIONS,
        }
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vector = vec![0.0f32; self.dimensions];

        let terms = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);
        for term in terms {
            let (bucket, sign) = self.bucket(&term);
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }

        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
