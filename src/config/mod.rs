//! Configuration loading for wikivault.

use std::path::{Path, PathBuf};

use directories::{BaseDirs, ProjectDirs};
use serde::Deserialize;
use thiserror::Error;

use crate::embedding::hashing::DEFAULT_DIMENSIONS;
use crate::embedding::tiktoken::DEFAULT_ENCODING;
use crate::index::{DEFAULT_EXCERPT_OVERLAP, DEFAULT_EXCERPT_SIZE, ExcerptOptions};
use crate::storage::local::DEFAULT_EXTENSION;

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV: &str = "WIKIVAULT_CONFIG";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration loaded from config.toml.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub corpus: CorpusConfig,
    pub index: IndexConfig,
    pub embedding: EmbeddingConfig,
    pub search: SearchConfig,
    pub links: LinksConfig,
}

/// Where the documents live.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    pub root: String,
    pub extension: String,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            root: "~/knowledge".to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Relative to the corpus root unless absolute.
    pub dir: String,
    pub excerpt_size: usize,
    pub excerpt_overlap: usize,
    pub encoding: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dir: ".index".to_string(),
            excerpt_size: DEFAULT_EXCERPT_SIZE,
            excerpt_overlap: DEFAULT_EXCERPT_OVERLAP,
            encoding: DEFAULT_ENCODING.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_DIMENSIONS,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub n_results: usize,
    /// `0.0` disables distance filtering for document queries.
    pub max_distance: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            n_results: 10,
            max_distance: 0.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LinksConfig {
    pub max_hops: usize,
    pub hub_count: usize,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            max_hops: 6,
            hub_count: 10,
        }
    }
}

impl Config {
    /// Load config from `$WIKIVAULT_CONFIG` or ~/.config/wikivault/config.toml,
    /// or return defaults when no file exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, parsed or validated.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, parsed or validated.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        ProjectDirs::from("", "", "wikivault").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` describing the first bad setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.index.excerpt_size == 0 {
            return Err(ConfigError::Invalid(
                "index.excerpt_size must be positive".to_string(),
            ));
        }
        if self.index.excerpt_overlap >= self.index.excerpt_size {
            return Err(ConfigError::Invalid(format!(
                "index.excerpt_overlap ({}) must be smaller than index.excerpt_size ({})",
                self.index.excerpt_overlap, self.index.excerpt_size
            )));
        }
        if self.embedding.dimensions == 0 {
            return Err(ConfigError::Invalid(
                "embedding.dimensions must be positive".to_string(),
            ));
        }
        if self.search.max_distance < 0.0 {
            return Err(ConfigError::Invalid(
                "search.max_distance must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn corpus_root(&self) -> PathBuf {
        expand_tilde(&self.corpus.root)
    }

    /// The index directory, resolved against the corpus root.
    #[must_use]
    pub fn index_dir(&self) -> PathBuf {
        let dir = expand_tilde(&self.index.dir);
        if dir.is_absolute() {
            dir
        } else {
            self.corpus_root().join(dir)
        }
    }

    #[must_use]
    pub fn excerpt_options(&self) -> ExcerptOptions {
        ExcerptOptions {
            size: self.index.excerpt_size,
            overlap: self.index.excerpt_overlap,
        }
    }
}

/// Expand ~ to the user's home directory.
#[must_use]
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(base_dirs) = BaseDirs::new()
    {
        return base_dirs.home_dir().join(rest);
    }
    PathBuf::from(path)
}
