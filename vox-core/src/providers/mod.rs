//! Provider clients.
//!
//! Each backend implements [`GenerationClient`]. The router never talks HTTP
//! itself; it looks the client up in [`Resources`] by [`Provider`] and calls
//! the capability it needs. Capabilities a provider lacks fall back to
//! [`BridgeError::Unsupported`].

mod anthropic;
mod cloudflare;
mod gemini;
mod openai;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;
use vox_types::Provider;

use crate::error::{BridgeError, Result};
use crate::registry::ProviderAvailability;

pub use anthropic::AnthropicClient;
pub use cloudflare::CloudflareClient;
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

/// Upper bound for a single provider call. Image models are slow.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Arguments of a translation call.
#[derive(Debug, Clone, Copy)]
pub struct TranslationRequest<'a> {
    pub text: &'a str,
    pub source_language: &'a str,
    pub target_language: &'a str,
}

/// A configured connection to one generative-AI provider.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    fn provider(&self) -> Provider;

    async fn generate_text(
        &self,
        model_id: &str,
        system_prompt: Option<&str>,
        prompt: &str,
    ) -> Result<String>;

    async fn generate_image(&self, _model_id: &str, _prompt: &str) -> Result<Vec<u8>> {
        Err(BridgeError::Unsupported {
            provider: self.provider(),
            capability: "image generation",
        })
    }

    async fn translate(&self, _model_id: &str, _request: TranslationRequest<'_>) -> Result<String> {
        Err(BridgeError::Unsupported {
            provider: self.provider(),
            capability: "translation",
        })
    }
}

/// Provider clients available to this process, keyed by provider.
///
/// A provider without an entry is "not configured".
#[derive(Clone, Default)]
pub struct Resources {
    clients: HashMap<Provider, Arc<dyn GenerationClient>>,
}

impl std::fmt::Debug for Resources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut providers: Vec<_> = self.clients.keys().map(|p| p.to_string()).collect();
        providers.sort();
        f.debug_struct("Resources").field("providers", &providers).finish()
    }
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the client for `client.provider()`.
    pub fn with_client(mut self, client: Arc<dyn GenerationClient>) -> Self {
        self.clients.insert(client.provider(), client);
        self
    }

    pub fn client(&self, provider: Provider) -> Option<&Arc<dyn GenerationClient>> {
        self.clients.get(&provider)
    }

    /// Availability flags derived from which clients are present.
    pub fn availability(&self) -> ProviderAvailability {
        ProviderAvailability {
            openai: self.clients.contains_key(&Provider::OpenAi),
            gemini: self.clients.contains_key(&Provider::Gemini),
            anthropic: self.clients.contains_key(&Provider::Anthropic),
            cloudflare: self.clients.contains_key(&Provider::Cloudflare),
        }
    }
}

// ── shared HTTP helpers ──────────────────────────────────────────────────────

fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?)
}

/// Turn a non-2xx answer into [`BridgeError::Provider`].
///
/// The body can echo credentials or prompt text, so it goes to the log only;
/// the error names the provider and status.
async fn ensure_success(
    provider: Provider,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!(%provider, status = status.as_u16(), body = %body, "provider request failed");
    Err(BridgeError::Provider(format!("{provider} returned http {status}")))
}

fn decode_base64(provider: Provider, data: &str) -> Result<Vec<u8>> {
    use base64::Engine as _;

    base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| BridgeError::Provider(format!("{provider} sent invalid base64 image: {e}")))
}

fn non_empty(text: Option<&str>, what: impl FnOnce() -> String) -> Result<String> {
    match text.map(str::trim) {
        Some(t) if !t.is_empty() => Ok(t.to_owned()),
        _ => Err(BridgeError::MissingContent(what())),
    }
}
