//! Generation router: logical model name → provider client call.

use std::sync::Arc;

use tracing::{debug, instrument};
use vox_types::ModelKind;

use crate::error::{BridgeError, Result};
use crate::providers::{GenerationClient, Resources, TranslationRequest};
use crate::registry::{ModelConfig, Registry, TRANSLATION_MODEL};

pub const DEFAULT_SOURCE_LANGUAGE: &str = "en";
pub const DEFAULT_TARGET_LANGUAGE: &str = "jp";

/// Dispatches generation calls to the provider that owns the requested model.
///
/// No retries happen here; a failed provider call is returned as is.
#[derive(Debug, Clone)]
pub struct GenerationRouter {
    registry: Arc<Registry>,
    resources: Resources,
}

impl GenerationRouter {
    pub fn new(registry: Arc<Registry>, resources: Resources) -> Self {
        Self { registry, resources }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub async fn generate_text(&self, prompt: &str, model: &str) -> Result<String> {
        self.text(None, prompt, model).await
    }

    pub async fn generate_text_with_system(
        &self,
        system_prompt: &str,
        prompt: &str,
        model: &str,
    ) -> Result<String> {
        self.text(Some(system_prompt), prompt, model).await
    }

    #[instrument(skip(self, prompt))]
    pub async fn generate_image(&self, prompt: &str, model: &str) -> Result<Vec<u8>> {
        let (config, client) = self.resolve(ModelKind::Image, model)?;
        let bytes = client
            .generate_image(&config.provider_model_id, prompt)
            .await?;
        debug!(bytes = bytes.len(), "image generated");
        Ok(bytes)
    }

    /// Missing languages default to English → Japanese and a missing model
    /// to the translation model.
    #[instrument(skip(self, prompt))]
    pub async fn translate(
        &self,
        prompt: &str,
        source_language: Option<&str>,
        target_language: Option<&str>,
        model: Option<&str>,
    ) -> Result<String> {
        let model = model.filter(|m| !m.trim().is_empty()).unwrap_or(TRANSLATION_MODEL);
        let (config, client) = self.resolve(ModelKind::Chat, model)?;
        let request = TranslationRequest {
            text: prompt,
            source_language: or_default(source_language, DEFAULT_SOURCE_LANGUAGE),
            target_language: or_default(target_language, DEFAULT_TARGET_LANGUAGE),
        };
        client.translate(&config.provider_model_id, request).await
    }

    #[instrument(skip(self, system_prompt, prompt), fields(system = system_prompt.is_some()))]
    async fn text(&self, system_prompt: Option<&str>, prompt: &str, model: &str) -> Result<String> {
        let (config, client) = self.resolve(ModelKind::Chat, model)?;
        client
            .generate_text(&config.provider_model_id, system_prompt, prompt)
            .await
    }

    fn resolve(
        &self,
        kind: ModelKind,
        model: &str,
    ) -> Result<(&ModelConfig, &Arc<dyn GenerationClient>)> {
        let config = self
            .registry
            .find(kind, model)
            .ok_or_else(|| BridgeError::UnknownModel {
                kind,
                name: model.to_owned(),
            })?;
        let client = self.resources.client(config.provider).ok_or_else(|| {
            BridgeError::ProviderNotConfigured {
                model: config.name.clone(),
                provider: config.provider,
            }
        })?;
        Ok((config, client))
    }
}

fn or_default<'a>(value: Option<&'a str>, default: &'a str) -> &'a str {
    value.map(str::trim).filter(|v| !v.is_empty()).unwrap_or(default)
}
