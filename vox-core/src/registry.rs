//! Model registry: the single source of truth for alias → provider → native
//! model id mapping.
//!
//! A [`Registry`] is built once at startup from a fixed master list, told which
//! providers have credentials via [`Registry::register_providers`], and then
//! shared read-only (usually behind an `Arc`) by the dispatcher, the router and
//! the retriever.
//!
//! Availability is provider-grained: a model is available iff its provider's
//! flag is set. Lookups that only need static facts (provider, native id) work
//! before registration by consulting the master list directly.

use std::collections::{BTreeMap, HashMap};

use vox_types::{ModelKind, Provider};

use crate::error::{BridgeError, Result};

/// Logical name of the translation model.
pub const TRANSLATION_MODEL: &str = "translate";

const FALLBACK_CHAT_MODEL: &str = "gpt";
const FALLBACK_IMAGE_MODEL: &str = "stable";

/// Registry entry binding voice aliases to one provider model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    /// Logical model name, carried in `Job.model` / `Job.image_model`.
    pub name: String,
    pub kind: ModelKind,
    pub provider: Provider,
    /// Identifier the provider's API expects, e.g. `"gpt-4o"`.
    pub provider_model_id: String,
    /// Voice-recognisable names; always contains `name`.
    pub aliases: Vec<String>,
    /// Spoken when the user selects this model but the provider is missing.
    pub unavailable_message: String,
}

impl ModelConfig {
    pub fn chat(
        name: &str,
        provider: Provider,
        provider_model_id: &str,
        unavailable_message: &str,
    ) -> Self {
        Self::new(name, ModelKind::Chat, provider, provider_model_id, unavailable_message)
    }

    pub fn image(
        name: &str,
        provider: Provider,
        provider_model_id: &str,
        unavailable_message: &str,
    ) -> Self {
        Self::new(name, ModelKind::Image, provider, provider_model_id, unavailable_message)
    }

    fn new(
        name: &str,
        kind: ModelKind,
        provider: Provider,
        provider_model_id: &str,
        unavailable_message: &str,
    ) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            provider,
            provider_model_id: provider_model_id.to_owned(),
            aliases: vec![name.to_owned()],
            unavailable_message: unavailable_message.to_owned(),
        }
    }

    /// Add another voice alias.
    pub fn with_alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_owned());
        self
    }

    fn answers_to(&self, name: &str) -> bool {
        self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

/// Which providers have a configured client. Set once at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderAvailability {
    pub openai: bool,
    pub gemini: bool,
    pub anthropic: bool,
    pub cloudflare: bool,
}

impl ProviderAvailability {
    pub fn all() -> Self {
        Self {
            openai: true,
            gemini: true,
            anthropic: true,
            cloudflare: true,
        }
    }

    pub fn is_available(&self, provider: Provider) -> bool {
        match provider {
            Provider::OpenAi => self.openai,
            Provider::Gemini => self.gemini,
            Provider::Anthropic => self.anthropic,
            Provider::Cloudflare => self.cloudflare,
        }
    }
}

/// Alias-indexed view over the master model list.
#[derive(Debug, Clone)]
pub struct Registry {
    configs: Vec<ModelConfig>,
    availability: ProviderAvailability,
    /// Lower-cased alias → index into `configs`; available models only.
    chat_by_alias: HashMap<String, usize>,
    image_by_alias: HashMap<String, usize>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Registry over the built-in model table with no provider registered.
    pub fn new() -> Self {
        Self {
            configs: builtin_models(),
            availability: ProviderAvailability::default(),
            chat_by_alias: HashMap::new(),
            image_by_alias: HashMap::new(),
        }
    }

    /// Registry over a custom master list.
    ///
    /// Aliases are unique across the chat and image namespaces combined;
    /// a collision returns [`BridgeError::DuplicateAlias`].
    pub fn with_models(configs: Vec<ModelConfig>) -> Result<Self> {
        let mut seen = HashMap::new();
        for config in &configs {
            for alias in &config.aliases {
                if seen.insert(alias.to_lowercase(), ()).is_some() {
                    return Err(BridgeError::DuplicateAlias(alias.clone()));
                }
            }
        }
        Ok(Self {
            configs,
            ..Self::new()
        })
    }

    /// Rebuild the alias maps, keeping only models whose provider is enabled.
    pub fn register_providers(
        &mut self,
        openai: bool,
        gemini: bool,
        anthropic: bool,
        cloudflare: bool,
    ) {
        self.register(ProviderAvailability {
            openai,
            gemini,
            anthropic,
            cloudflare,
        });
    }

    pub fn register(&mut self, availability: ProviderAvailability) {
        self.availability = availability;
        self.chat_by_alias.clear();
        self.image_by_alias.clear();

        for (idx, config) in self.configs.iter().enumerate() {
            if !availability.is_available(config.provider) {
                continue;
            }
            let map = match config.kind {
                ModelKind::Chat => &mut self.chat_by_alias,
                ModelKind::Image => &mut self.image_by_alias,
            };
            for alias in &config.aliases {
                map.insert(alias.to_lowercase(), idx);
            }
        }
    }

    pub fn availability(&self) -> ProviderAvailability {
        self.availability
    }

    /// Case-insensitive, exact alias lookup among available models.
    ///
    /// `None` is not an error: callers fall through to help text.
    pub fn resolve_by_alias(&self, kind: ModelKind, alias: &str) -> Option<&ModelConfig> {
        let map = match kind {
            ModelKind::Chat => &self.chat_by_alias,
            ModelKind::Image => &self.image_by_alias,
        };
        map.get(&alias.trim().to_lowercase())
            .map(|&idx| &self.configs[idx])
    }

    /// Master-list lookup, independent of provider registration.
    pub fn find(&self, kind: ModelKind, name: &str) -> Option<&ModelConfig> {
        let name = name.trim();
        self.configs
            .iter()
            .find(|c| c.kind == kind && c.answers_to(name))
    }

    pub fn is_available(&self, kind: ModelKind, name: &str) -> bool {
        self.find(kind, name)
            .is_some_and(|c| self.availability.is_available(c.provider))
    }

    pub fn provider_model_id(&self, kind: ModelKind, name: &str) -> Option<&str> {
        self.find(kind, name).map(|c| c.provider_model_id.as_str())
    }

    pub fn provider_of(&self, kind: ModelKind, name: &str) -> Option<Provider> {
        self.find(kind, name).map(|c| c.provider)
    }

    /// Namespace a model name belongs to, if it is known at all.
    pub fn kind_of(&self, name: &str) -> Option<ModelKind> {
        let name = name.trim();
        self.configs
            .iter()
            .find(|c| c.answers_to(name))
            .map(|c| c.kind)
    }

    pub fn is_translation(&self, name: &str) -> bool {
        self.find(ModelKind::Chat, name)
            .is_some_and(|c| c.name == TRANSLATION_MODEL)
    }

    /// Aliases of available models, in master-list order.
    pub fn list_available(&self, kind: ModelKind) -> Vec<String> {
        self.available(kind)
            .flat_map(|c| c.aliases.iter().cloned())
            .collect()
    }

    /// alias → provider model id, for the "what can I use" answer.
    pub fn list_available_with_provider_ids(&self, kind: ModelKind) -> BTreeMap<String, String> {
        self.available(kind)
            .flat_map(|c| {
                c.aliases
                    .iter()
                    .map(|a| (a.clone(), c.provider_model_id.clone()))
            })
            .collect()
    }

    /// Default chat model: OpenAI, then Gemini, Anthropic, Cloudflare.
    pub fn default_chat_model(&self) -> &str {
        let a = self.availability;
        if a.openai {
            "gpt"
        } else if a.gemini {
            "gemini"
        } else if a.anthropic {
            "opus"
        } else if a.cloudflare {
            "llama"
        } else {
            FALLBACK_CHAT_MODEL
        }
    }

    /// Default image model: Cloudflare, then OpenAI, Gemini.
    pub fn default_image_model(&self) -> &str {
        let a = self.availability;
        if a.cloudflare {
            "stable"
        } else if a.openai {
            "dallas"
        } else if a.gemini {
            "gemini image"
        } else {
            FALLBACK_IMAGE_MODEL
        }
    }

    fn available(&self, kind: ModelKind) -> impl Iterator<Item = &ModelConfig> {
        self.configs
            .iter()
            .filter(move |c| c.kind == kind && self.availability.is_available(c.provider))
    }
}

fn builtin_models() -> Vec<ModelConfig> {
    use Provider::*;

    vec![
        // OpenAI
        ModelConfig::chat(
            "gpt",
            OpenAi,
            "gpt-5.1-2025-11-13",
            "GPT model is not available - OpenAI API key not configured",
        ),
        ModelConfig::chat(
            "g. p. t. version number four",
            OpenAi,
            "gpt-4o",
            "GPT-4 model is not available - OpenAI API key not configured",
        ),
        ModelConfig::image(
            "dallas",
            OpenAi,
            "dall-e-3",
            "DALL-E 3 model is not available - OpenAI API key not configured",
        ),
        ModelConfig::image(
            "dallas v2",
            OpenAi,
            "dall-e-2",
            "DALL-E 2 model is not available - OpenAI API key not configured",
        ),
        ModelConfig::image(
            "gpt-image",
            OpenAi,
            "gpt-image-1",
            "GPT-Image model is not available - OpenAI API key not configured",
        ),
        // Gemini
        ModelConfig::chat(
            "gemini",
            Gemini,
            "gemini-3-pro-preview",
            "Gemini model is not available - Gemini API key not configured",
        ),
        ModelConfig::chat(
            "gemini flash",
            Gemini,
            "gemini-2.5-flash",
            "Gemini Flash model is not available - Gemini API key not configured",
        ),
        ModelConfig::image(
            "gemini image",
            Gemini,
            "imagen-4.0-generate-001",
            "Gemini imagen model is not available - Gemini API key not configured",
        ),
        ModelConfig::image(
            "banana nano",
            Gemini,
            "gemini-2.5-flash-image-preview",
            "Gemini banana nano image model is not available - Gemini API key not configured",
        ),
        // Anthropic
        ModelConfig::chat(
            "opus",
            Anthropic,
            "claude-opus-4-20250514",
            "Opus model is not available - Anthropic API key not configured",
        ),
        ModelConfig::chat(
            "sonnet",
            Anthropic,
            "claude-sonnet-4-20250514",
            "Sonnet model is not available - Anthropic API key not configured",
        ),
        // Cloudflare
        ModelConfig::chat(
            "llama",
            Cloudflare,
            "@cf/meta/llama-4-scout-17b-16e-instruct",
            "Meta model is not available - Cloudflare API key not configured",
        ),
        ModelConfig::chat(
            "qwen",
            Cloudflare,
            "@cf/deepseek-ai/deepseek-r1-distill-qwen-32b",
            "Qwen model is not available - Cloudflare API key not configured",
        ),
        ModelConfig::chat(
            "apache",
            Cloudflare,
            "@cf/openai/gpt-oss-120b",
            "GPT-OSS model is not available - Cloudflare API key not configured",
        ),
        ModelConfig::chat(
            TRANSLATION_MODEL,
            Cloudflare,
            "@cf/meta/m2m100-1.2b",
            "Translation model is not available - Cloudflare API key not configured",
        ),
        ModelConfig::image(
            "stable",
            Cloudflare,
            "@cf/stabilityai/stable-diffusion-xl-base-1.0",
            "Stable Diffusion model is not available - Cloudflare API key not configured",
        ),
    ]
}
