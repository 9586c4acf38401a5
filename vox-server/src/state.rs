//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use vox_core::{Dispatcher, MessageQueue, Registry, ResponseRetriever};

use crate::config::Config;

/// State shared across all HTTP handlers.
///
/// One `serve` process is one voice session: the dispatcher holds the
/// session's model choices and the retriever's cache slot.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<Registry>,
        requests: Arc<dyn MessageQueue>,
        responses: Arc<dyn MessageQueue>,
    ) -> Self {
        let retriever = Arc::new(ResponseRetriever::new(responses, registry.clone()));
        let dispatcher = Dispatcher::new(registry, requests, retriever, config.poll_delay());
        Self {
            config,
            dispatcher: Arc::new(dispatcher),
        }
    }
}
