//! HTTP API handlers: a thin transport in front of the event bus.

pub mod bus;
pub mod status;

use std::sync::Arc;

use axum::http::StatusCode;

use gridbus_core::config::GridbusConfig;
use gridbus_services::{ChunkStore, ErrorKind, EventBus};

#[derive(Clone)]
pub struct ApiState {
    pub bus: Arc<EventBus>,
    pub store: Arc<dyn ChunkStore>,
    /// Base bus address of the GridFS service.
    pub address: String,
    /// Storage backend name, e.g. "fs".
    pub backend: String,
    pub default_bucket: String,
    pub max_body_bytes: usize,
}

impl ApiState {
    pub fn new(config: &GridbusConfig, bus: Arc<EventBus>, store: Arc<dyn ChunkStore>) -> Self {
        Self {
            bus,
            store,
            address: config.bus.address.clone(),
            backend: config.storage.backend.as_str().to_string(),
            default_bucket: config.bus.default_bucket.clone(),
            max_body_bytes: config.api.max_body_bytes,
        }
    }
}

// ── Shared helpers ────────────────────────────────────────────────────────────

/// HTTP status for a failed reply.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Decode | ErrorKind::Validation | ErrorKind::Routing => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Store => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub use bus::handle_bus_send;
pub use status::handle_status;
