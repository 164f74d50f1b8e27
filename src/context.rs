//! Services wired together from configuration.
//!
//! [`AppContext`] is built once at startup and handed to every command and
//! tool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::debug;

use crate::config::Config;
use crate::embedding::hashing::HashingEmbedder;
use crate::embedding::tiktoken::TiktokenTokenizer;
use crate::index::IndexService;
use crate::links::LinkTraversalService;
use crate::storage::StorageBackend;
use crate::storage::local::LocalStorageBackend;
use crate::vector::local::LocalVectorStore;

pub struct AppContext {
    pub config: Config,
    pub storage: Arc<dyn StorageBackend>,
    pub links: LinkTraversalService,
    pub index: IndexService,
    index_dir: PathBuf,
}

impl AppContext {
    /// Wire the local storage, tokenizer, embedder and vector store described
    /// by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tokenizer or embedder cannot be initialised or
    /// the persisted vector store cannot be read.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let root = config.corpus_root();
        let index_dir = config.index_dir();
        debug!(root = %root.display(), index_dir = %index_dir.display(), "Building context");

        let storage: Arc<dyn StorageBackend> = Arc::new(LocalStorageBackend::with_extension(
            root,
            &config.corpus.extension,
        ));
        let tokenizer = TiktokenTokenizer::new(&config.index.encoding)
            .context("Failed to load tokenizer")?;
        let embedder = HashingEmbedder::new(config.embedding.dimensions)
            .context("Failed to create embedder")?;
        let store = LocalVectorStore::open(&index_dir).context("Failed to open vector store")?;

        let index = IndexService::new(
            Arc::clone(&storage),
            Box::new(tokenizer),
            Box::new(embedder),
            Box::new(store),
        );
        Ok(Self::new(config, storage, index, index_dir))
    }

    /// Assemble a context from already constructed services.
    #[must_use]
    pub fn new(
        config: Config,
        storage: Arc<dyn StorageBackend>,
        index: IndexService,
        index_dir: PathBuf,
    ) -> Self {
        Self {
            config,
            links: LinkTraversalService::new(Arc::clone(&storage)),
            storage,
            index,
            index_dir,
        }
    }

    /// Directory holding the vector store and index checkpoint.
    #[must_use]
    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }
}
