//! Request handling for chunk and file actions.
//!
//! A save request moves through
//!
//! ```text
//! Received → Decoding → Validating → Storing → Replied
//!                ↓           ↓           ↓
//!             Errored     Errored     Errored
//! ```
//!
//! There are no retries and no loops: every request reaches exactly one
//! terminal state and produces exactly one reply. The handler itself holds
//! no mutable state, so any number of requests may run at once.

use std::sync::Arc;

use bytes::Bytes;
use serde_json::{Map, Value};

use gridbus_core::frame;
use gridbus_core::{ChunkValidator, FileInfo, ObjectId};

use crate::reply::{ErrorKind, Reply};
use crate::store::{ChunkStore, StoreError};

pub const SAVE_CHUNK_FAILED: &str = "error saving chunk";
pub const READ_CHUNK_FAILED: &str = "error reading chunk";
pub const CHUNK_NOT_FOUND: &str = "chunk not found";
pub const SAVE_FILE_FAILED: &str = "error saving file";
pub const READ_FILE_FAILED: &str = "error reading file";
pub const FILE_NOT_FOUND: &str = "file not found";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Received,
    Decoding,
    Validating,
    Storing,
    Replied,
    Errored,
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestState::Replied | RequestState::Errored)
    }

    fn can_advance_to(self, next: RequestState) -> bool {
        use RequestState::*;
        matches!(
            (self, next),
            (Received, Decoding)
                | (Decoding, Validating)
                | (Validating, Storing)
                | (Storing, Replied)
                | (Decoding | Validating | Storing, Errored)
        )
    }
}

/// The states a request passed through, and its reply.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub states: Vec<RequestState>,
    pub reply: Reply,
}

impl Outcome {
    pub fn final_state(&self) -> RequestState {
        self.states
            .last()
            .copied()
            .unwrap_or(RequestState::Received)
    }
}

/// Tracks one save request through the state machine.
struct Progress {
    states: Vec<RequestState>,
}

impl Progress {
    fn new() -> Self {
        Self {
            states: vec![RequestState::Received],
        }
    }

    fn current(&self) -> RequestState {
        self.states
            .last()
            .copied()
            .unwrap_or(RequestState::Received)
    }

    fn advance(&mut self, next: RequestState) {
        let from = self.current();
        debug_assert!(
            from.can_advance_to(next),
            "illegal transition {from:?} -> {next:?}"
        );
        tracing::debug!(?from, to = ?next, "save request transition");
        self.states.push(next);
    }

    fn finish(mut self, reply: Reply) -> Outcome {
        let terminal = if reply.is_ok() {
            RequestState::Replied
        } else {
            RequestState::Errored
        };
        self.advance(terminal);
        Outcome {
            states: self.states,
            reply,
        }
    }
}

/// Protocol logic shared by every transport.
#[derive(Clone)]
pub struct RequestHandler {
    validator: ChunkValidator,
    store: Arc<dyn ChunkStore>,
}

impl RequestHandler {
    pub fn new(validator: ChunkValidator, store: Arc<dyn ChunkStore>) -> Self {
        Self { validator, store }
    }

    pub fn validator(&self) -> &ChunkValidator {
        &self.validator
    }

    pub fn store(&self) -> &Arc<dyn ChunkStore> {
        &self.store
    }

    // ── saveChunk ─────────────────────────────────────────────────────────────

    /// Handle a binary saveChunk frame.
    pub async fn save_chunk(&self, raw: Bytes) -> Reply {
        self.save_chunk_outcome(raw).await.reply
    }

    /// Like [`save_chunk`](Self::save_chunk) but also reports the states visited.
    pub async fn save_chunk_outcome(&self, raw: Bytes) -> Outcome {
        let mut progress = Progress::new();

        progress.advance(RequestState::Decoding);
        let decoded = match frame::decode(&raw) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(error = %e, bytes = raw.len(), "rejecting malformed chunk frame");
                return progress.finish(Reply::error(ErrorKind::Decode, e.user_message()));
            }
        };

        progress.advance(RequestState::Validating);
        let chunk = match self.validator.validate(&decoded.metadata, decoded.payload) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "rejecting invalid chunk request");
                return progress.finish(Reply::error(ErrorKind::Validation, e.to_string()));
            }
        };

        progress.advance(RequestState::Storing);
        let key = chunk.key.clone();
        let bytes = chunk.len();
        match self.store.save(chunk).await {
            Ok(()) => {
                tracing::debug!(%key, bytes, "chunk saved");
                progress.finish(Reply::ok())
            }
            Err(e) => {
                tracing::error!(%key, error = %e, "chunk store rejected save");
                progress.finish(Reply::error(ErrorKind::Store, SAVE_CHUNK_FAILED))
            }
        }
    }

    // ── getChunk ──────────────────────────────────────────────────────────────

    /// Fetch the payload addressed by `files_id`, `n` and `bucket`.
    pub async fn get_chunk(&self, request: &Map<String, Value>) -> Reply {
        let key = match self.validator.validate_key(request) {
            Ok(k) => k,
            Err(e) => return Reply::error(ErrorKind::Validation, e.to_string()),
        };

        match self.store.fetch(&key).await {
            Ok(data) => Reply::Binary(data),
            Err(StoreError::NotFound(_)) => {
                tracing::debug!(%key, "chunk not found");
                Reply::error(ErrorKind::NotFound, CHUNK_NOT_FOUND)
            }
            Err(e) => {
                tracing::error!(%key, error = %e, "chunk store fetch failed");
                Reply::error(ErrorKind::Store, READ_CHUNK_FAILED)
            }
        }
    }

    // ── saveFile / getFile ────────────────────────────────────────────────────

    /// Store a file document. Generates an id when the request has none.
    pub async fn save_file(&self, request: &Map<String, Value>) -> Reply {
        let info = match self.parse_file_info(request) {
            Ok(info) => info,
            Err(message) => return Reply::error(ErrorKind::Validation, message),
        };

        let id = info.id.clone();
        let bucket = info.bucket.clone();
        match self.store.save_file(info).await {
            Ok(()) => {
                tracing::info!(id, bucket, "file document saved");
                let mut fields = Map::new();
                fields.insert("id".into(), Value::from(id));
                Reply::ok_with(fields)
            }
            Err(e) => {
                tracing::error!(id, bucket, error = %e, "file store rejected save");
                Reply::error(ErrorKind::Store, SAVE_FILE_FAILED)
            }
        }
    }

    /// Look up a file document by `id` and `bucket`.
    pub async fn get_file(&self, request: &Map<String, Value>) -> Reply {
        let id = match request.get("id") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => return Reply::error(ErrorKind::Validation, "id must be specified"),
        };
        let bucket = match self.validator.bucket(request) {
            Ok(b) => b,
            Err(e) => return Reply::error(ErrorKind::Validation, e.to_string()),
        };

        match self.store.fetch_file(&bucket, &id).await {
            Ok(info) => match serde_json::to_value(&info) {
                Ok(Value::Object(fields)) => Reply::ok_with(fields),
                _ => Reply::error(ErrorKind::Store, READ_FILE_FAILED),
            },
            Err(StoreError::NotFound(_)) => Reply::error(ErrorKind::NotFound, FILE_NOT_FOUND),
            Err(e) => {
                tracing::error!(id, bucket, error = %e, "file store fetch failed");
                Reply::error(ErrorKind::Store, READ_FILE_FAILED)
            }
        }
    }

    fn parse_file_info(&self, request: &Map<String, Value>) -> Result<FileInfo, String> {
        let length = request
            .get("length")
            .and_then(Value::as_u64)
            .ok_or("length must be specified")?;
        let chunk_size = request
            .get("chunkSize")
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .filter(|v| *v > 0)
            .ok_or("chunkSize must be specified")?;

        let id = match optional_string(request, "id")? {
            Some(id) if !id.is_empty() => id,
            _ => ObjectId::new().to_hex(),
        };
        let bucket = self.validator.bucket(request).map_err(|e| e.to_string())?;

        let metadata = match request.get("metadata") {
            None | Some(Value::Null) => None,
            Some(Value::Object(m)) => Some(m.clone()),
            Some(_) => return Err("metadata must be an object".into()),
        };

        Ok(FileInfo {
            id,
            bucket,
            length,
            chunk_size,
            upload_date: now_millis(),
            filename: optional_string(request, "filename")?,
            content_type: optional_string(request, "contentType")?,
            metadata,
        })
    }
}

fn optional_string(request: &Map<String, Value>, field: &str) -> Result<Option<String>, String> {
    match request.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(format!("{field} must be a string")),
    }
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
