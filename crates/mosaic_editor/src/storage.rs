//! Document storage for editor snapshots.
//!
//! Documents are stored as JSON files, one per key, under a storage
//! directory. The default directory is `<data_dir>/mosaic`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage json: {0}")]
    Json(#[from] serde_json::Error),
}

/// File-backed JSON document store.
#[derive(Clone, Debug)]
pub struct Storage {
    dir: PathBuf,
    key: String,
    /// Log operation timings
    debug: bool,
}

impl Storage {
    pub const DEFAULT_KEY: &'static str = "state";

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            key: Self::DEFAULT_KEY.to_string(),
            debug: false,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Get the default storage directory.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|mut p| {
            p.push("mosaic");
            p
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn file(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.key))
    }

    /// Store a document, replacing the previous one.
    pub fn set<T: Serialize>(&self, document: &T) -> Result<(), StorageError> {
        let start = Instant::now();
        std::fs::create_dir_all(&self.dir)?;
        let content = serde_json::to_string(document)?;
        std::fs::write(self.file(), content)?;

        if self.debug {
            log::debug!("[Storage] Saved '{}' in {:?}", self.key, start.elapsed());
        }
        Ok(())
    }

    /// Read the stored document, `None` when nothing was stored yet.
    pub fn get<T: DeserializeOwned>(&self) -> Result<Option<T>, StorageError> {
        let start = Instant::now();
        let path = self.file();
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        let document = serde_json::from_str(&content)?;

        if self.debug {
            log::debug!("[Storage] Loaded '{}' in {:?}", self.key, start.elapsed());
        }
        Ok(Some(document))
    }

    /// Delete the stored document.
    pub fn clear(&self) -> Result<(), StorageError> {
        let path = self.file();
        if path.exists() {
            std::fs::remove_file(&path)?;
            log::info!("[Storage] Cleared '{}'", self.key);
        }
        Ok(())
    }
}
