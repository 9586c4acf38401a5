//! Asynchronous job bridge between a voice front-end and generative AI
//! providers.
//!
//! The front-end side ([`Dispatcher`] + [`ResponseRetriever`]) and the
//! consumer side ([`JobWorker`]) only ever talk through a [`MessageQueue`];
//! the [`GenerationRouter`] picks the provider for a logical model name using
//! the [`Registry`].

pub mod dispatcher;
pub mod error;
pub mod providers;
pub mod queue;
pub mod registry;
pub mod render;
pub mod retriever;
pub mod router;
pub mod storage;
pub mod worker;

#[cfg(test)]
mod testing;

pub use dispatcher::{Dispatcher, SessionState};
pub use error::{BridgeError, Result};
pub use providers::{GenerationClient, Resources};
pub use queue::{MemoryQueue, MessageQueue, SqliteQueue};
pub use registry::{ModelConfig, ProviderAvailability, Registry};
pub use render::ImageRenderer;
pub use retriever::{CacheSlot, ResponseRetriever};
pub use router::GenerationRouter;
pub use storage::{BlobStore, LocalBlobStore};
pub use worker::JobWorker;
