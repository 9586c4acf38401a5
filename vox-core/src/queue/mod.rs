//! Message queue transport between the front-end and the worker.
//!
//! Two named channels are used: requests (Jobs) and responses (JobResults).
//! Delivery is at-least-once from the consumer's point of view and no
//! ordering is promised across distinct jobs.

mod memory;
mod sqlite;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

pub use memory::MemoryQueue;
pub use sqlite::SqliteQueue;

/// One named channel of opaque string messages.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    async fn push(&self, body: String) -> Result<()>;

    /// Wait at most `wait` for a message. A received message is removed.
    async fn pull(&self, wait: Duration) -> Result<Option<String>>;

    /// Drop every pending message. Purging an empty queue succeeds.
    async fn purge(&self) -> Result<()>;
}

/// Serialize `value` as JSON and push it.
pub async fn push_json<T: Serialize + ?Sized>(queue: &dyn MessageQueue, value: &T) -> Result<()> {
    let body = serde_json::to_string(value)?;
    queue.push(body).await
}
