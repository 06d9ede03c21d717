//! Gremlin driver: parameter-bound traversals sent over one shared WebSocket.

mod client;
pub mod protocol;
mod traversal;

pub use client::{ConnectionSettings, GremlinClient};
pub use traversal::{escape_literal, Traversal};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Anything that can execute a traversal and hand back its result items.
#[async_trait]
pub trait GremlinTransport: Send + Sync {
    async fn submit(&self, traversal: &Traversal) -> Result<Vec<Value>>;
}
