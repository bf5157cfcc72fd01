//! Metadata validation for chunk requests.
//!
//! Rules run in a fixed order and the first failure is the one reported:
//! payload, then `files_id`, then `n`, then `bucket`. Callers assert on the
//! exact messages, so they are part of the protocol.

use bytes::Bytes;
use serde_json::{Map, Value};

use crate::chunk::{Chunk, ChunkKey, DEFAULT_BUCKET};

pub const FIELD_FILES_ID: &str = "files_id";
pub const FIELD_N: &str = "n";
pub const FIELD_BUCKET: &str = "bucket";

/// Turns decoded metadata into a chunk key.
#[derive(Debug, Clone)]
pub struct ChunkValidator {
    default_bucket: String,
}

impl Default for ChunkValidator {
    fn default() -> Self {
        Self::new(DEFAULT_BUCKET)
    }
}

impl ChunkValidator {
    pub fn new(default_bucket: impl Into<String>) -> Self {
        Self {
            default_bucket: default_bucket.into(),
        }
    }

    pub fn default_bucket(&self) -> &str {
        &self.default_bucket
    }

    /// Validate a save request. An empty payload is rejected before any
    /// metadata field is looked at.
    pub fn validate(
        &self,
        metadata: &Map<String, Value>,
        payload: Bytes,
    ) -> Result<Chunk, ValidationError> {
        if payload.is_empty() {
            return Err(ValidationError::MissingData);
        }
        let key = self.validate_key(metadata)?;
        Ok(Chunk { key, data: payload })
    }

    /// Validate the key fields only, as used by the retrieval path.
    pub fn validate_key(&self, metadata: &Map<String, Value>) -> Result<ChunkKey, ValidationError> {
        let files_id = match metadata.get(FIELD_FILES_ID) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => return Err(ValidationError::MissingFilesId),
        };

        let n = match metadata.get(FIELD_N) {
            Some(Value::Number(num)) => num
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .ok_or(ValidationError::InvalidN)?,
            _ => return Err(ValidationError::MissingN),
        };

        Ok(ChunkKey {
            bucket: self.bucket(metadata)?,
            files_id,
            n,
        })
    }

    /// The `bucket` field, or the default bucket when it is absent or null.
    pub fn bucket(&self, metadata: &Map<String, Value>) -> Result<String, ValidationError> {
        match metadata.get(FIELD_BUCKET) {
            None | Some(Value::Null) => Ok(self.default_bucket.clone()),
            Some(Value::String(s)) if s.is_empty() => Err(ValidationError::EmptyBucket),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(ValidationError::InvalidBucket),
        }
    }
}

/// A metadata rule that did not hold. `Display` is the user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("chunk data is missing")]
    MissingData,

    #[error("files_id must be specified")]
    MissingFilesId,

    #[error("n must be specified")]
    MissingN,

    #[error("n must be a non-negative integer")]
    InvalidN,

    #[error("bucket must be a string")]
    InvalidBucket,

    #[error("bucket must not be empty")]
    EmptyBucket,
}
