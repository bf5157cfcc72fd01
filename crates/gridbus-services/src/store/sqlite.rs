//! SQLite chunk store: one table keyed by `(bucket, files_id, n)`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension};

use gridbus_core::{Chunk, ChunkKey, FileInfo};

use super::{ChunkStore, StoreError, StoreStats};

#[derive(Clone)]
pub struct SqliteChunkStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteChunkStore {
    /// Open (or create) the database file at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::with_connection(Connection::open(path)?)
    }

    /// A private database that lives as long as the store.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS chunks (
                bucket   TEXT    NOT NULL,
                files_id TEXT    NOT NULL,
                n        INTEGER NOT NULL,
                data     BLOB    NOT NULL,
                PRIMARY KEY (bucket, files_id, n)
            );
            CREATE TABLE IF NOT EXISTS files (
                bucket TEXT NOT NULL,
                id     TEXT NOT NULL,
                doc    TEXT NOT NULL,
                PRIMARY KEY (bucket, id)
            );",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<T, StoreError> {
            let guard = conn
                .lock()
                .map_err(|_| StoreError::Corrupt("sqlite connection lock poisoned".into()))?;
            f(&guard)
        })
        .await?
    }
}

#[async_trait]
impl ChunkStore for SqliteChunkStore {
    async fn save(&self, chunk: Chunk) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO chunks (bucket, files_id, n, data)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    chunk.key.bucket,
                    chunk.key.files_id,
                    chunk.key.n,
                    &chunk.data[..]
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn fetch(&self, key: &ChunkKey) -> Result<Bytes, StoreError> {
        let key = key.clone();
        self.with_conn(move |conn| {
            let data: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT data FROM chunks WHERE bucket = ?1 AND files_id = ?2 AND n = ?3",
                    params![key.bucket, key.files_id, key.n],
                    |row| row.get(0),
                )
                .optional()?;
            data.map(Bytes::from)
                .ok_or_else(|| StoreError::NotFound(format!("chunk {key}")))
        })
        .await
    }

    async fn save_file(&self, info: FileInfo) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            let doc = serde_json::to_string(&info).map_err(|e| StoreError::Corrupt(e.to_string()))?;
            conn.execute(
                "INSERT OR REPLACE INTO files (bucket, id, doc) VALUES (?1, ?2, ?3)",
                params![info.bucket, info.id, doc],
            )?;
            Ok(())
        })
        .await
    }

    async fn fetch_file(&self, bucket: &str, id: &str) -> Result<FileInfo, StoreError> {
        let bucket = bucket.to_string();
        let id = id.to_string();
        self.with_conn(move |conn| {
            let doc: Option<String> = conn
                .query_row(
                    "SELECT doc FROM files WHERE bucket = ?1 AND id = ?2",
                    params![bucket, id],
                    |row| row.get(0),
                )
                .optional()?;
            let doc = doc.ok_or_else(|| StoreError::NotFound(format!("file {bucket}/{id}")))?;
            serde_json::from_str(&doc).map_err(|e| StoreError::Corrupt(e.to_string()))
        })
        .await
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        self.with_conn(|conn| {
            let (chunks, bytes): (i64, i64) = conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(LENGTH(data)), 0) FROM chunks",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            Ok(StoreStats {
                chunks: chunks as u64,
                bytes: bytes as u64,
            })
        })
        .await
    }
}
