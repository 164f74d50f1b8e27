//! Tokenizer and embedding gateways.
//!
//! The index pipeline only depends on the [`Tokenizer`] and [`Embedder`]
//! traits. [`tiktoken::TiktokenTokenizer`] and [`hashing::HashingEmbedder`]
//! are the local implementations used by the CLI.

pub mod hashing;
pub mod tiktoken;

use thiserror::Error;

/// Errors raised by tokenizer or embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Tokenization model initialization failed: {0}")]
    ModelInit(String),

    #[error("Token decoding failed: {0}")]
    Decoding(String),

    #[error("Embedding provider failed: {0}")]
    Provider(String),
}

/// Converts text to token IDs and back.
///
/// Excerpt boundaries are computed in token space, so `decode(encode(x))`
/// must preserve the meaning of `x` even if it is not byte-identical.
pub trait Tokenizer: Send + Sync {
    /// Encode text into token IDs.
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingError` if the text cannot be tokenized.
    fn encode(&self, text: &str) -> Result<Vec<u32>, EmbeddingError>;

    /// Decode token IDs back into text.
    ///
    /// `tokens` may start or end inside a multi-byte character; such partial
    /// characters decode to U+FFFD rather than failing.
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingError::Decoding` if a token is not in the vocabulary.
    fn decode(&self, tokens: &[u32]) -> Result<String, EmbeddingError>;
}

/// Computes fixed-length embedding vectors.
pub trait Embedder: Send + Sync {
    /// Embed a piece of text.
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingError::Provider` if the provider fails. Callers do
    /// not retry.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Length of every vector returned by [`Embedder::embed`].
    fn dimensions(&self) -> usize;
}
