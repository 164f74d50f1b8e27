//! BPE tokenizer backed by `tiktoken-rs`.

use tiktoken_rs::CoreBPE;

use crate::embedding::{EmbeddingError, Tokenizer};

/// Encoding used when none is configured.
pub const DEFAULT_ENCODING: &str = "cl100k_base";

/// Prefix of the error `CoreBPE::decode` returns when every token is known
/// but the bytes are not valid UTF-8.
const INVALID_UTF8_ERROR: &str = "Unable to decode into a valid UTF-8 string";

pub struct TiktokenTokenizer {
    bpe: CoreBPE,
    encoding: String,
}

impl TiktokenTokenizer {
    /// Load a named encoding.
    ///
    /// Supported encodings:
    /// - "`cl100k_base`" - GPT-4 / GPT-3.5 Turbo
    /// - "`o200k_base`"  - GPT-4o
    /// - "`p50k_base`"   - GPT-3 (Codex)
    /// - "`r50k_base`"   - GPT-2
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingError::ModelInit` for an unknown encoding or if the
    /// BPE tables fail to load.
    pub fn new(encoding: &str) -> Result<Self, EmbeddingError> {
        let bpe = match encoding {
            "cl100k_base" => tiktoken_rs::cl100k_base(),
            "o200k_base" => tiktoken_rs::o200k_base(),
            "p50k_base" => tiktoken_rs::p50k_base(),
            "r50k_base" => tiktoken_rs::r50k_base(),
            _ => {
                return Err(EmbeddingError::ModelInit(format!(
                    "unknown encoding: {encoding}"
                )));
            }
        }
        .map_err(|e| EmbeddingError::ModelInit(e.to_string()))?;

        Ok(Self {
            bpe,
            encoding: encoding.to_string(),
        })
    }

    #[must_use]
    pub fn encoding(&self) -> &str {
        &self.encoding
    }
}

impl Tokenizer for TiktokenTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>, EmbeddingError> {
        Ok(self.bpe.encode_with_special_tokens(text))
    }

    /// Decode tokens, replacing bytes of characters cut off at either end of
    /// `tokens` with U+FFFD.
    ///
    /// Token windows are cut without regard to character boundaries, so a
    /// window often starts or ends inside a multi-byte character.
    #[expect(clippy::used_underscore_items)]
    fn decode(&self, tokens: &[u32]) -> Result<String, EmbeddingError> {
        match self.bpe.decode(tokens.to_vec()) {
            Ok(text) => Ok(text),
            Err(e) if e.to_string().starts_with(INVALID_UTF8_ERROR) => {
                // Every token is known here, so per-token lookup cannot fail.
                let bytes: Vec<u8> = self
                    .bpe
                    ._decode_native_and_split(tokens.to_vec())
                    .flatten()
                    .collect();
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
            Err(e) => Err(EmbeddingError::Decoding(e.to_string())),
        }
    }
}
