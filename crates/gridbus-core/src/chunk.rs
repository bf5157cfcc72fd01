//! Chunk model: the identity and payload every request operates on.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Bucket used when a request does not name one.
pub const DEFAULT_BUCKET: &str = "fs";

/// Composite identity of a chunk.
///
/// `(bucket, files_id, n)` addresses exactly one chunk. Saving twice under
/// the same key replaces the earlier payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkKey {
    /// Namespace grouping a family of files and their chunks.
    pub bucket: String,
    /// Identity of the parent file, usually a hex ObjectId.
    pub files_id: String,
    /// Zero-based position of the chunk within the file.
    pub n: u32,
}

impl ChunkKey {
    pub fn new(bucket: impl Into<String>, files_id: impl Into<String>, n: u32) -> Self {
        Self {
            bucket: bucket.into(),
            files_id: files_id.into(),
            n,
        }
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.bucket, self.files_id, self.n)
    }
}

/// A validated chunk ready for the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub key: ChunkKey,
    pub data: Bytes,
}

impl Chunk {
    pub fn new(key: ChunkKey, data: impl Into<Bytes>) -> Self {
        Self {
            key,
            data: data.into(),
        }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// The "files" document describing a chunked file.
///
/// Field names on the wire follow the GridFS convention (`chunkSize`,
/// `uploadDate`, `contentType`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub id: String,
    pub bucket: String,
    /// Total file length in bytes.
    pub length: u64,
    /// Size of every chunk except possibly the last.
    pub chunk_size: u32,
    /// Unix timestamp in milliseconds.
    pub upload_date: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl FileInfo {
    /// Number of chunks needed to hold `length` bytes.
    pub fn chunk_count(&self) -> u32 {
        if self.chunk_size == 0 {
            return 0;
        }
        self.length.div_ceil(self.chunk_size as u64) as u32
    }
}
