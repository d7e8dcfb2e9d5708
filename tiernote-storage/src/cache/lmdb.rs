//! LMDB-backed cache tier.
//!
//! Uses the heed crate (Rust bindings for LMDB). The whole bounded collection
//! is stored as one JSON array under a single key, so every write replaces the
//! collection in one write transaction.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use heed::types::{Bytes, Str};
use heed::{Database, Env, EnvOpenOptions};
use tiernote_core::{NoteError, NoteRecord, NoteResult};

use crate::tier::CacheTier;

/// Key used when none is configured.
pub const DEFAULT_CACHE_KEY: &str = "FULLSTACK_TASK_SIDDHARTHA";

const NOTES_DB: &str = "notes";

/// Error type for LMDB cache operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbCacheError> for NoteError {
    fn from(e: LmdbCacheError) -> Self {
        NoteError::cache_unavailable(e.to_string())
    }
}

/// LMDB cache tier holding the bounded note list under one key.
///
/// # Example
///
/// ```ignore
/// let cache = LmdbCacheTier::open("./data/cache", DEFAULT_CACHE_KEY, 64)?;
/// cache.append(NoteRecord::new("buy milk")).await?;
/// let notes = cache.load().await?;
/// ```
pub struct LmdbCacheTier {
    env: Env,
    db: Database<Str, Bytes>,
    key: String,
    path: PathBuf,
}

impl LmdbCacheTier {
    /// Open (or create) the environment at `path`.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `key` - Key holding the serialized collection
    /// * `max_size_mb` - Maximum size of the memory map in megabytes
    pub fn open<P: AsRef<Path>>(
        path: P,
        key: impl Into<String>,
        max_size_mb: usize,
    ) -> Result<Self, LmdbCacheError> {
        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let db: Database<Str, Bytes> = env
            .create_database(&mut wtxn, Some(NOTES_DB))
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        Ok(Self {
            env,
            db,
            key: key.into(),
            path: path.as_ref().to_path_buf(),
        })
    }

    /// The key holding the collection.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Directory of the LMDB environment.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the environment and wait until LMDB has released it, so the same
    /// path can be opened again.
    pub fn close(self) {
        self.env.prepare_for_closing().wait();
    }

    fn read_raw(&self) -> Result<Vec<NoteRecord>, LmdbCacheError> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        match self.db.get(&rtxn, self.key.as_str()) {
            Ok(Some(bytes)) => serde_json::from_slice(bytes)
                .map_err(|e| LmdbCacheError::Deserialization(e.to_string())),
            Ok(None) => Ok(Vec::new()),
            Err(e) => Err(LmdbCacheError::Transaction(e.to_string())),
        }
    }

    fn write_raw(&self, records: &[NoteRecord]) -> Result<(), LmdbCacheError> {
        let bytes = serde_json::to_vec(records)
            .map_err(|e| LmdbCacheError::Serialization(e.to_string()))?;

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        self.db
            .put(&mut wtxn, self.key.as_str(), &bytes)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))
    }
}

#[async_trait]
impl CacheTier for LmdbCacheTier {
    async fn load(&self) -> NoteResult<Vec<NoteRecord>> {
        Ok(self.read_raw()?)
    }

    async fn store(&self, records: &[NoteRecord]) -> NoteResult<()> {
        Ok(self.write_raw(records)?)
    }
}
