//! Filesystem chunk store.
//!
//! One file per chunk:
//!   {root}/chunks/{h(bucket)}/{h(files_id)}/{n}
//! with the original key recorded once per file directory:
//!   {root}/chunks/{h(bucket)}/{h(files_id)}/key.json
//! File documents live beside them as JSON:
//!   {root}/files/{h(bucket)}/{h(id)}.json
//!
//! `h` is the hex BLAKE3 digest of the field, so every path component has a
//! fixed length whatever the key, and no request field can name a path
//! outside the root. Writes go to a per-writer temp file and are renamed
//! into place, so a reader never sees a partial chunk and concurrent saves
//! of one key leave exactly one complete payload.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use gridbus_core::{Chunk, ChunkKey, FileInfo};

use super::{ChunkStore, StoreError, StoreStats};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

const KEY_RECORD: &str = "key.json";

#[derive(Clone)]
pub struct FsChunkStore {
    root: Arc<PathBuf>,
}

impl FsChunkStore {
    /// Create a store rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join("chunks"))?;
        fs::create_dir_all(root.join("files"))?;
        Ok(Self {
            root: Arc::new(root),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fixed-length directory name for a key field.
    fn component(field: &str) -> String {
        blake3::hash(field.as_bytes()).to_hex().to_string()
    }

    fn file_dir(root: &Path, key: &ChunkKey) -> PathBuf {
        root.join("chunks")
            .join(Self::component(&key.bucket))
            .join(Self::component(&key.files_id))
    }

    fn chunk_path(root: &Path, key: &ChunkKey) -> PathBuf {
        Self::file_dir(root, key).join(key.n.to_string())
    }

    fn file_path(root: &Path, bucket: &str, id: &str) -> PathBuf {
        root.join("files")
            .join(Self::component(bucket))
            .join(format!("{}.json", Self::component(id)))
    }

    /// Record `{bucket, files_id}` next to the chunks the first time a file
    /// directory is used.
    fn write_key_record(root: &Path, key: &ChunkKey) -> Result<(), StoreError> {
        let path = Self::file_dir(root, key).join(KEY_RECORD);
        if path.exists() {
            return Ok(());
        }
        let record = serde_json::json!({"bucket": key.bucket, "files_id": key.files_id});
        let text = serde_json::to_vec(&record).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        Self::write_atomic(&path, &text)?;
        Ok(())
    }

    /// Write via temp file + rename.
    fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let seq = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp_path = path.with_extension(format!("tmp-{}-{}", std::process::id(), seq));
        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(data)?;
            file.sync_all()?;
        }

        if let Err(e) = fs::rename(&tmp_path, path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }
        Ok(())
    }

    fn read_or_not_found(path: &Path, what: String) -> Result<Vec<u8>, StoreError> {
        match fs::read(path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(what)),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    /// Walk `chunks/{bucket}/{file}/{n}` and total the finished chunk files.
    fn scan(root: &Path) -> StoreStats {
        let mut stats = StoreStats::default();
        let Ok(buckets) = fs::read_dir(root.join("chunks")) else {
            return stats;
        };
        for bucket in buckets.flatten() {
            let Ok(files) = fs::read_dir(bucket.path()) else {
                continue;
            };
            for file in files.flatten() {
                let Ok(chunks) = fs::read_dir(file.path()) else {
                    continue;
                };
                for chunk in chunks.flatten() {
                    // skip key records and in-flight temp files
                    if chunk.path().extension().is_some() {
                        continue;
                    }
                    if let Ok(meta) = chunk.metadata() {
                        stats.chunks += 1;
                        stats.bytes += meta.len();
                    }
                }
            }
        }
        stats
    }
}

#[async_trait]
impl ChunkStore for FsChunkStore {
    async fn save(&self, chunk: Chunk) -> Result<(), StoreError> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let path = Self::chunk_path(&root, &chunk.key);
            Self::write_atomic(&path, &chunk.data)?;
            Self::write_key_record(&root, &chunk.key)?;
            tracing::trace!(key = %chunk.key, bytes = chunk.data.len(), "chunk written");
            Ok(())
        })
        .await?
    }

    async fn fetch(&self, key: &ChunkKey) -> Result<Bytes, StoreError> {
        let root = self.root.clone();
        let key = key.clone();
        tokio::task::spawn_blocking(move || -> Result<Bytes, StoreError> {
            let path = Self::chunk_path(&root, &key);
            Self::read_or_not_found(&path, format!("chunk {key}")).map(Bytes::from)
        })
        .await?
    }

    async fn save_file(&self, info: FileInfo) -> Result<(), StoreError> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let text =
                serde_json::to_vec(&info).map_err(|e| StoreError::Corrupt(e.to_string()))?;
            let path = Self::file_path(&root, &info.bucket, &info.id);
            Self::write_atomic(&path, &text)?;
            Ok(())
        })
        .await?
    }

    async fn fetch_file(&self, bucket: &str, id: &str) -> Result<FileInfo, StoreError> {
        let root = self.root.clone();
        let bucket = bucket.to_string();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || -> Result<FileInfo, StoreError> {
            let path = Self::file_path(&root, &bucket, &id);
            let text = Self::read_or_not_found(&path, format!("file {bucket}/{id}"))?;
            serde_json::from_slice(&text).map_err(|e| StoreError::Corrupt(e.to_string()))
        })
        .await?
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let root = self.root.clone();
        Ok(tokio::task::spawn_blocking(move || Self::scan(&root)).await?)
    }
}
