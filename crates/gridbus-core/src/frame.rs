//! Chunk frame format: the binary body of a saveChunk request.
//!
//! ```text
//! +----------------------+---------------------------+------------------+
//! | metadata_len (u32)   | metadata (metadata_len B) | payload          |
//! | big-endian           | UTF-8 JSON object         | raw chunk bytes  |
//! +----------------------+---------------------------+------------------+
//!        4 bytes                  variable              rest of frame
//! ```
//!
//! The payload has no length of its own: it runs to the end of the frame and
//! may be empty. Every decode failure is reported to the caller with the same
//! fixed message; the variant is kept for logging only.

use bytes::{BufMut, Bytes, BytesMut};
use serde_json::{Map, Value};

/// Size of the length prefix.
pub const LENGTH_PREFIX_LEN: usize = 4;

/// The message sent back for any malformed frame.
///
/// Clients match on this text, so it keeps the two spaces after "message.".
pub const PARSE_ERROR_MESSAGE: &str =
    "error parsing byte[] message.  see the documentation for the correct format";

/// A decoded frame: the metadata document and the raw payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub metadata: Map<String, Value>,
    pub payload: Bytes,
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Split a raw frame into metadata and payload.
///
/// The payload is a zero-copy slice of `raw`.
pub fn decode(raw: &Bytes) -> Result<Frame, FrameError> {
    if raw.len() < LENGTH_PREFIX_LEN {
        return Err(FrameError::TooShort(raw.len()));
    }

    let mut prefix = [0u8; LENGTH_PREFIX_LEN];
    prefix.copy_from_slice(&raw[..LENGTH_PREFIX_LEN]);
    let declared = u32::from_be_bytes(prefix) as usize;

    let available = raw.len() - LENGTH_PREFIX_LEN;
    if declared > available {
        return Err(FrameError::Truncated {
            declared,
            available,
        });
    }

    let metadata_end = LENGTH_PREFIX_LEN + declared;
    let text = std::str::from_utf8(&raw[LENGTH_PREFIX_LEN..metadata_end])
        .map_err(|_| FrameError::InvalidUtf8)?;

    let metadata = match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => map,
        Ok(_) => return Err(FrameError::NotAnObject),
        Err(e) => return Err(FrameError::InvalidMetadata(e.to_string())),
    };

    Ok(Frame {
        metadata,
        payload: raw.slice(metadata_end..),
    })
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Build a frame from a metadata document and a payload.
pub fn encode(metadata: &Map<String, Value>, payload: &[u8]) -> Result<Bytes, FrameError> {
    let text = serde_json::to_vec(metadata).map_err(|e| FrameError::InvalidMetadata(e.to_string()))?;
    let len = u32::try_from(text.len()).map_err(|_| FrameError::MetadataTooLarge(text.len()))?;

    let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_LEN + text.len() + payload.len());
    buf.put_u32(len);
    buf.put_slice(&text);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Reasons a frame could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("frame of {0} bytes is shorter than the length prefix")]
    TooShort(usize),

    #[error("metadata length {declared} exceeds the {available} bytes that follow the prefix")]
    Truncated { declared: usize, available: usize },

    #[error("metadata is not valid UTF-8")]
    InvalidUtf8,

    #[error("metadata is not valid JSON: {0}")]
    InvalidMetadata(String),

    #[error("metadata is not a JSON object")]
    NotAnObject,

    #[error("metadata of {0} bytes does not fit the length prefix")]
    MetadataTooLarge(usize),
}

impl FrameError {
    /// The text returned to the requester. Identical for every variant.
    pub fn user_message(&self) -> &'static str {
        PARSE_ERROR_MESSAGE
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
