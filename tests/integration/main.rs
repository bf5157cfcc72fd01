//! Gridbus integration test harness.
//!
//! Tests drive the real bus, handler and stores in-process. The `http`
//! module additionally binds the API on an OS-assigned port on 127.0.0.1.
//!
//!   cargo test --test integration

mod backends;
mod files;
mod get_chunk;
mod http;
mod save_chunk;

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use serde_json::{Map, Value};

use gridbus_core::config::GridbusConfig;
use gridbus_services::{build_bus, ChunkStore, EventBus, MemoryChunkStore, Message};

// ── Harness ───────────────────────────────────────────────────────────────────

/// Base address used by every test bus.
pub const ADDRESS: &str = "gridfs";
pub const SAVE_CHUNK: &str = "gridfs/saveChunk";

/// A files_id in the usual 24-hex-digit form.
pub const FILES_ID: &str = "5f1d7c2e9a3b4c5d6e7f8091";

/// Bus with default config over the given store.
pub fn bus_with(store: Arc<dyn ChunkStore>) -> EventBus {
    build_bus(&GridbusConfig::default(), store)
}

/// Bus over a fresh in-memory store.
pub fn memory_bus() -> EventBus {
    bus_with(Arc::new(MemoryChunkStore::new()))
}

/// Object from a `json!` literal.
pub fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(m) => m,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// Encoded saveChunk frame.
pub fn frame(metadata: Value, payload: &[u8]) -> Bytes {
    gridbus_core::frame::encode(&object(metadata), payload).expect("encode frame")
}

pub fn json_message(value: Value) -> Message {
    Message::Json(object(value))
}

/// Fresh directory under the system temp dir, unique per call.
pub fn temp_dir(tag: &str) -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let id = COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!(
        "gridbus-it-{}-{}-{}",
        tag,
        std::process::id(),
        id
    ));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}
