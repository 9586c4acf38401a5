//! Wiring of provider clients, registry, queues and worker from [`Config`].

use std::sync::Arc;

use tracing::info;
use vox_core::providers::{AnthropicClient, CloudflareClient, GeminiClient, OpenAiClient};
use vox_core::{
    GenerationRouter, ImageRenderer, JobWorker, LocalBlobStore, MemoryQueue, MessageQueue,
    Registry, Resources, SqliteQueue,
};

use crate::config::Config;

/// Request and response channels.
pub struct Queues {
    pub requests: Arc<dyn MessageQueue>,
    pub responses: Arc<dyn MessageQueue>,
}

/// One client per provider that has credentials.
pub fn build_resources(cfg: &Config) -> vox_core::Result<Resources> {
    let mut resources = Resources::new();
    if let Some(key) = &cfg.openai_api_key {
        resources = resources.with_client(Arc::new(OpenAiClient::new(key)?));
    }
    if let Some(key) = &cfg.gemini_api_key {
        resources = resources.with_client(Arc::new(GeminiClient::new(key)?));
    }
    if let Some(key) = &cfg.anthropic_api_key {
        resources = resources.with_client(Arc::new(AnthropicClient::new(key)?));
    }
    if let (Some(account), Some(key)) = (&cfg.cloudflare_account_id, &cfg.cloudflare_api_key) {
        resources = resources.with_client(Arc::new(CloudflareClient::new(account, key)?));
    }
    Ok(resources)
}

/// Registry over the built-in models with availability taken from `resources`.
pub fn build_registry(resources: &Resources) -> Arc<Registry> {
    let availability = resources.availability();
    let mut registry = Registry::new();
    registry.register(availability);
    info!(
        openai = availability.openai,
        gemini = availability.gemini,
        anthropic = availability.anthropic,
        cloudflare = availability.cloudflare,
        chat_default = registry.default_chat_model(),
        image_default = registry.default_image_model(),
        "model registry ready"
    );
    Arc::new(registry)
}

pub async fn open_queues(cfg: &Config) -> vox_core::Result<Queues> {
    if cfg.in_memory_queue() {
        info!("using in-process queues");
        return Ok(Queues {
            requests: Arc::new(MemoryQueue::new()),
            responses: Arc::new(MemoryQueue::new()),
        });
    }
    let requests = SqliteQueue::connect(&cfg.queue_url, &cfg.requests_queue).await?;
    let responses = requests.channel(&cfg.responses_queue);
    info!(queue_url = %cfg.queue_url, "queue database ready");
    Ok(Queues {
        requests: Arc::new(requests),
        responses: Arc::new(responses),
    })
}

pub fn blob_store(cfg: &Config) -> LocalBlobStore {
    LocalBlobStore::new(&cfg.blob_dir, &cfg.blob_host, &cfg.blob_bucket)
}

pub fn build_worker(
    cfg: &Config,
    registry: Arc<Registry>,
    resources: Resources,
    responses: Arc<dyn MessageQueue>,
) -> JobWorker {
    let router = GenerationRouter::new(registry, resources);
    let renderer = ImageRenderer::new(Arc::new(blob_store(cfg)));
    JobWorker::new(router, renderer, responses)
}
