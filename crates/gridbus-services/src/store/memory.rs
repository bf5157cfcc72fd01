use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use gridbus_core::{Chunk, ChunkKey, FileInfo};

use super::{ChunkStore, StoreError, StoreStats};

/// In-memory chunk store
#[derive(Clone, Default)]
pub struct MemoryChunkStore {
    chunks: Arc<DashMap<ChunkKey, Bytes>>,
    /// (bucket, id) -> file document
    files: Arc<DashMap<(String, String), FileInfo>>,
}

impl MemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chunks held
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Drop everything
    pub fn clear(&self) {
        self.chunks.clear();
        self.files.clear();
    }
}

#[async_trait]
impl ChunkStore for MemoryChunkStore {
    async fn save(&self, chunk: Chunk) -> Result<(), StoreError> {
        self.chunks.insert(chunk.key, chunk.data);
        Ok(())
    }

    async fn fetch(&self, key: &ChunkKey) -> Result<Bytes, StoreError> {
        self.chunks
            .get(key)
            .map(|data| data.clone())
            .ok_or_else(|| StoreError::NotFound(format!("chunk {key}")))
    }

    async fn save_file(&self, info: FileInfo) -> Result<(), StoreError> {
        self.files
            .insert((info.bucket.clone(), info.id.clone()), info);
        Ok(())
    }

    async fn fetch_file(&self, bucket: &str, id: &str) -> Result<FileInfo, StoreError> {
        self.files
            .get(&(bucket.to_string(), id.to_string()))
            .map(|info| info.clone())
            .ok_or_else(|| StoreError::NotFound(format!("file {bucket}/{id}")))
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let bytes = self.chunks.iter().map(|e| e.value().len() as u64).sum();
        Ok(StoreStats {
            chunks: self.chunks.len() as u64,
            bytes,
        })
    }
}
