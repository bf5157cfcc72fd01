//! gridbus-services: request handling, the event bus and chunk stores.

pub mod bus;
pub mod gridfs;
pub mod handler;
pub mod reply;
pub mod store;

pub use bus::{BusHandler, EventBus, Message};
pub use gridfs::GridFsService;
pub use handler::{Outcome, RequestHandler, RequestState};
pub use reply::{ErrorKind, Reply};
pub use store::{
    open_store, ChunkStore, FsChunkStore, MemoryChunkStore, SqliteChunkStore, StoreError,
    StoreStats,
};

use std::sync::Arc;

use gridbus_core::config::GridbusConfig;
use gridbus_core::ChunkValidator;

/// Build a bus with the GridFS service registered, backed by `store`.
pub fn build_bus(config: &GridbusConfig, store: Arc<dyn ChunkStore>) -> EventBus {
    let validator = ChunkValidator::new(config.bus.default_bucket.clone());
    let handler = RequestHandler::new(validator, store);
    let mut bus = EventBus::new();
    Arc::new(GridFsService::new(config.bus.address.clone(), handler)).register(&mut bus);
    bus
}
