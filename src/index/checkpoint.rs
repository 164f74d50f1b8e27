//! When the index was last brought up to date.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const CHECKPOINT_FILE: &str = "state.json";

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Failed to read index checkpoint {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse index checkpoint {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write index checkpoint {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexCheckpoint {
    pub last_indexed: Option<DateTime<Utc>>,
}

impl IndexCheckpoint {
    /// Read the checkpoint from `dir`. A missing file means the corpus has
    /// never been indexed.
    ///
    /// # Errors
    ///
    /// Returns `CheckpointError::Read` or `CheckpointError::Parse` if the file
    /// exists but cannot be read or parsed.
    pub fn load(dir: &Path) -> Result<Self, CheckpointError> {
        let path = dir.join(CHECKPOINT_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(source) => return Err(CheckpointError::Read { path, source }),
        };
        serde_json::from_str(&contents).map_err(|source| CheckpointError::Parse { path, source })
    }

    /// # Errors
    ///
    /// Returns `CheckpointError::Write` if the directory or file cannot be
    /// written.
    pub fn save(&self, dir: &Path) -> Result<(), CheckpointError> {
        fs::create_dir_all(dir).map_err(|source| CheckpointError::Write {
            path: dir.to_path_buf(),
            source,
        })?;

        let path = dir.join(CHECKPOINT_FILE);
        let contents = serde_json::to_string_pretty(self).map_err(|source| {
            CheckpointError::Write {
                path: path.clone(),
                source: source.into(),
            }
        })?;
        fs::write(&path, contents).map_err(|source| CheckpointError::Write { path, source })
    }
}
