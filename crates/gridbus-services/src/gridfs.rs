//! GridFS bus service.
//!
//! Registers two addresses under a base address `A`:
//!   - `A/saveChunk` takes a binary chunk frame.
//!   - `A` takes a JSON message whose `action` field selects
//!     `getChunk`, `saveFile` or `getFile`.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::bus::{BusHandler, EventBus, Message};
use crate::handler::RequestHandler;
use crate::reply::{ErrorKind, Reply};

pub const SAVE_CHUNK_SUFFIX: &str = "/saveChunk";
pub const UNSUPPORTED_BODY: &str = "unsupported message body";

pub struct GridFsService {
    address: String,
    handler: RequestHandler,
}

impl GridFsService {
    pub fn new(address: impl Into<String>, handler: RequestHandler) -> Self {
        Self {
            address: address.into(),
            handler,
        }
    }

    /// Base address for JSON actions.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Address that accepts binary chunk frames.
    pub fn save_chunk_address(&self) -> String {
        format!("{}{}", self.address, SAVE_CHUNK_SUFFIX)
    }

    /// Register both addresses on `bus`.
    pub fn register(self: Arc<Self>, bus: &mut EventBus) {
        bus.register(self.save_chunk_address(), self.clone());
        bus.register(self.address.clone(), self);
    }

    async fn handle_action(&self, message: Message) -> Reply {
        let request = match message {
            Message::Json(request) => request,
            Message::Binary(_) => return Reply::error(ErrorKind::Routing, UNSUPPORTED_BODY),
        };

        let action = match request.get("action") {
            Some(Value::String(a)) => a.clone(),
            _ => return Reply::error(ErrorKind::Routing, "action must be specified"),
        };

        tracing::debug!(action, "gridfs action");
        match action.as_str() {
            "getChunk" => self.handler.get_chunk(&request).await,
            "saveFile" => self.handler.save_file(&request).await,
            "getFile" => self.handler.get_file(&request).await,
            other => Reply::error(
                ErrorKind::Routing,
                format!("action {other} is not supported"),
            ),
        }
    }
}

#[async_trait]
impl BusHandler for GridFsService {
    async fn handle(&self, address: &str, message: Message) -> Reply {
        if address == self.address {
            return self.handle_action(message).await;
        }

        match message {
            Message::Binary(raw) => self.handler.save_chunk(raw).await,
            Message::Json(_) => Reply::error(ErrorKind::Routing, UNSUPPORTED_BODY),
        }
    }
}
