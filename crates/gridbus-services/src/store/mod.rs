//! Chunk store gateway.
//!
//! The request handler only ever talks to storage through [`ChunkStore`].
//! Backends decide how keys are laid out; the contract is an idempotent
//! upsert keyed by `(bucket, files_id, n)` and a fetch that reports absent
//! keys as [`StoreError::NotFound`].

mod fs;
mod memory;
mod sqlite;

pub use fs::FsChunkStore;
pub use memory::MemoryChunkStore;
pub use sqlite::SqliteChunkStore;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

use gridbus_core::config::{StorageBackend, StorageConfig};
use gridbus_core::{Chunk, ChunkKey, FileInfo};

#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Insert or replace the chunk at `chunk.key`.
    async fn save(&self, chunk: Chunk) -> Result<(), StoreError>;

    /// Payload stored at `key`.
    async fn fetch(&self, key: &ChunkKey) -> Result<Bytes, StoreError>;

    /// Insert or replace a file document.
    async fn save_file(&self, info: FileInfo) -> Result<(), StoreError>;

    async fn fetch_file(&self, bucket: &str, id: &str) -> Result<FileInfo, StoreError>;

    /// Totals across all buckets.
    async fn stats(&self) -> Result<StoreStats, StoreError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub chunks: u64,
    pub bytes: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("stored record is corrupt: {0}")]
    Corrupt(String),

    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Build the backend named in `config`.
pub fn open_store(config: &StorageConfig) -> anyhow::Result<Arc<dyn ChunkStore>> {
    use anyhow::Context;

    let store: Arc<dyn ChunkStore> = match config.backend {
        StorageBackend::Memory => Arc::new(MemoryChunkStore::new()),
        StorageBackend::Fs => Arc::new(
            FsChunkStore::new(&config.path)
                .with_context(|| format!("failed to open fs store at {}", config.path.display()))?,
        ),
        StorageBackend::Sqlite => Arc::new(
            SqliteChunkStore::open(&config.path).with_context(|| {
                format!("failed to open sqlite store at {}", config.path.display())
            })?,
        ),
    };
    tracing::info!(
        backend = config.backend.as_str(),
        path = %config.path.display(),
        "chunk store opened"
    );
    Ok(store)
}
