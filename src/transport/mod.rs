//! Purpose: Transport seam between the bridge and the pub/sub broker.
//! Exports: `Publish`, `Inbound`, plus the `resp` codec and `broker` client.
//! Role: Keeps the relay testable against in-memory fakes.
//! Invariants: Publishing and subscribing never share a connection.

pub mod broker;
pub mod resp;

use async_trait::async_trait;
use bytes::Bytes;

use crate::core::error::Error;

/// Outbound publish handle. Shared by every in-flight call handler and the
/// event forwarder.
#[async_trait]
pub trait Publish: Send + Sync {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), Error>;
}

/// Inbound message source. Yields `(topic, payload)` pairs until the
/// underlying transport closes.
#[async_trait]
pub trait Inbound: Send {
    async fn next_message(&mut self) -> Result<Option<(String, Bytes)>, Error>;
}
