//! In-process event bus. Routes a message to the handler registered for its
//! address and returns that handler's reply.
//!
//! Transports (the HTTP API, tests) hand messages to [`EventBus::send`]; they
//! never call handlers directly.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Map, Value};

use crate::reply::{ErrorKind, Reply};

/// A message body as it arrives from the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Json(Map<String, Value>),
    Binary(Bytes),
}

/// Anything that can answer messages sent to an address.
#[async_trait]
pub trait BusHandler: Send + Sync {
    /// Handle one message sent to `address`. Always produces a reply.
    async fn handle(&self, address: &str, message: Message) -> Reply;
}

/// Maps addresses to handlers.
#[derive(Default)]
pub struct EventBus {
    handlers: HashMap<String, Arc<dyn BusHandler>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for an address, replacing any previous one.
    pub fn register(&mut self, address: impl Into<String>, handler: Arc<dyn BusHandler>) {
        let address = address.into();
        tracing::debug!(address, "bus handler registered");
        self.handlers.insert(address, handler);
    }

    pub fn has_handler(&self, address: &str) -> bool {
        self.handlers.contains_key(address)
    }

    /// Registered addresses, sorted.
    pub fn addresses(&self) -> Vec<String> {
        let mut addresses: Vec<String> = self.handlers.keys().cloned().collect();
        addresses.sort();
        addresses
    }

    /// Deliver a message and wait for the reply.
    pub async fn send(&self, address: &str, message: Message) -> Reply {
        match self.handlers.get(address) {
            Some(handler) => handler.handle(address, message).await,
            None => {
                tracing::warn!(address, "no handler for address");
                Reply::error(
                    ErrorKind::Routing,
                    format!("no handler registered for address {address}"),
                )
            }
        }
    }
}
