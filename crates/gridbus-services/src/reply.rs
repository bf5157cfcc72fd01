//! Replies sent back to the requester.
//!
//! Every request ends in exactly one `Reply`. JSON replies carry a `status`
//! field (`"ok"` or `"error"`); binary replies carry a chunk payload.

use bytes::Bytes;
use serde_json::{json, Map, Value};

/// Why a request failed. Adapters use this to pick a status code; it is not
/// part of the JSON body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed frame.
    Decode,
    /// A required field is missing or has the wrong shape.
    Validation,
    /// The requested key is absent.
    NotFound,
    /// The store reported a failure.
    Store,
    /// No handler or action matched the message.
    Routing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Json(Map<String, Value>),
    Binary(Bytes),
    Error { kind: ErrorKind, message: String },
}

impl Reply {
    /// `{"status":"ok"}`
    pub fn ok() -> Self {
        Self::ok_with(Map::new())
    }

    /// `{"status":"ok", ...fields}`
    pub fn ok_with(mut fields: Map<String, Value>) -> Self {
        fields.insert("status".into(), Value::from("ok"));
        Reply::Json(fields)
    }

    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Reply::Error {
            kind,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        !matches!(self, Reply::Error { .. })
    }

    /// The error message, if this is an error reply.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Reply::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    /// JSON body for this reply. Binary replies have none.
    pub fn to_json(&self) -> Option<Value> {
        match self {
            Reply::Json(fields) => Some(Value::Object(fields.clone())),
            Reply::Binary(_) => None,
            Reply::Error { message, .. } => Some(json!({
                "status": "error",
                "message": message,
            })),
        }
    }
}
