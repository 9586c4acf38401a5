//! Request dispatcher: the producer side of the bridge.
//!
//! Builds Jobs from voice input and the session's model/system-prompt state,
//! enqueues them and immediately gives the retriever a short window to
//! answer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{error, info, instrument};
use vox_types::{Job, ModelKind, RenderedAnswer};

use crate::error::Result;
use crate::queue::{MessageQueue, push_json};
use crate::registry::{Registry, TRANSLATION_MODEL};
use crate::retriever::ResponseRetriever;

pub const RANDOM_FACT_PROMPT: &str = "tell me a random fact";

const TITLE_CHAT_MODELS: &str = "Chat Models";
const TITLE_IMAGE_MODELS: &str = "Image Models";
const TITLE_MODELS: &str = "Models";
const TITLE_SYSTEM_PROMPT: &str = "System Prompt";
const OK: &str = "ok";

/// Per-session choices carried into every Job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub chat_model: String,
    pub image_model: String,
    pub system_prompt: Option<String>,
}

pub struct Dispatcher {
    registry: Arc<Registry>,
    requests: Arc<dyn MessageQueue>,
    retriever: Arc<ResponseRetriever>,
    poll_delay: Duration,
    session: RwLock<SessionState>,
}

impl Dispatcher {
    /// Session starts on the registry's default chat and image models.
    pub fn new(
        registry: Arc<Registry>,
        requests: Arc<dyn MessageQueue>,
        retriever: Arc<ResponseRetriever>,
        poll_delay: Duration,
    ) -> Self {
        let session = SessionState {
            chat_model: registry.default_chat_model().to_owned(),
            image_model: registry.default_image_model().to_owned(),
            system_prompt: None,
        };
        Self {
            registry,
            requests,
            retriever,
            poll_delay,
            session: RwLock::new(session),
        }
    }

    pub async fn session(&self) -> SessionState {
        self.session.read().await.clone()
    }

    // ── generation intents ──────────────────────────────────────────────────

    /// Enqueue a text prompt. With `illustrate`, an image Job for the same
    /// prompt follows it.
    #[instrument(skip(self, prompt))]
    pub async fn dispatch_prompt(
        &self,
        prompt: &str,
        illustrate: bool,
        trace_id: &str,
    ) -> Result<RenderedAnswer> {
        let session = self.session().await;
        let mut job = Job::text(prompt, &session.chat_model, trace_id);
        if let Some(system_prompt) = &session.system_prompt {
            job = job.with_system_prompt(system_prompt);
        }
        self.enqueue(&job).await?;

        if illustrate {
            let follow_up = Job::image(prompt, &session.image_model, &session.chat_model, trace_id);
            self.enqueue_follow_up(&follow_up).await;
        }
        self.poll().await
    }

    #[instrument(skip(self, prompt))]
    pub async fn dispatch_image(&self, prompt: &str, trace_id: &str) -> Result<RenderedAnswer> {
        let session = self.session().await;
        let job = Job::image(prompt, &session.image_model, &session.chat_model, trace_id);
        self.enqueue(&job).await?;
        self.poll().await
    }

    #[instrument(skip(self, prompt))]
    pub async fn dispatch_translation(
        &self,
        prompt: &str,
        source_language: Option<String>,
        target_language: Option<String>,
        trace_id: &str,
    ) -> Result<RenderedAnswer> {
        let job = Job::translation(
            prompt,
            TRANSLATION_MODEL,
            source_language,
            target_language,
            trace_id,
        );
        self.enqueue(&job).await?;
        self.poll().await
    }

    pub async fn random_fact(&self, trace_id: &str) -> Result<RenderedAnswer> {
        self.dispatch_prompt(RANDOM_FACT_PROMPT, false, trace_id).await
    }

    /// Enqueue a secondary Job. A failure is logged here and reported as
    /// `false`; it never fails the primary answer.
    pub async fn enqueue_follow_up(&self, job: &Job) -> bool {
        match push_json(self.requests.as_ref(), job).await {
            Ok(()) => {
                info!(trace_id = %job.trace_id, "follow-up job enqueued");
                true
            }
            Err(e) => {
                error!(trace_id = %job.trace_id, error = %e, "failed to enqueue follow-up job");
                false
            }
        }
    }

    /// Check for an answer to an earlier prompt, falling back to the cache.
    pub async fn last_response(&self) -> Result<RenderedAnswer> {
        self.retriever.fetch(self.poll_delay, true).await
    }

    /// Drop every pending Result. Idempotent.
    pub async fn purge(&self) -> Result<()> {
        self.retriever.responses().purge().await?;
        info!("response queue purged");
        Ok(())
    }

    // ── session intents ─────────────────────────────────────────────────────

    /// Switch the chat or image model by voice alias, report the current
    /// pair for `"which"`, or list what is available.
    pub async fn select_model(&self, alias: &str) -> RenderedAnswer {
        let alias = alias.trim();

        for kind in [ModelKind::Chat, ModelKind::Image] {
            let Some(config) = self.registry.find(kind, alias) else {
                continue;
            };
            let title = match kind {
                ModelKind::Chat => TITLE_CHAT_MODELS,
                ModelKind::Image => TITLE_IMAGE_MODELS,
            };
            if !self.registry.is_available(kind, &config.name) {
                return RenderedAnswer::new(title, &config.unavailable_message);
            }
            let mut session = self.session.write().await;
            match kind {
                ModelKind::Chat => session.chat_model = config.name.clone(),
                ModelKind::Image => session.image_model = config.name.clone(),
            }
            info!(kind = %kind, model = %config.name, "model selected");
            return RenderedAnswer::new(title, OK);
        }

        if alias.eq_ignore_ascii_case("which") {
            let session = self.session().await;
            return RenderedAnswer::new(
                TITLE_CHAT_MODELS,
                format!(
                    "I am using the text-model {} and image-model {}",
                    session.chat_model, session.image_model
                ),
            );
        }

        RenderedAnswer::new(TITLE_MODELS, self.models_help())
    }

    pub async fn set_system_prompt(&self, system_prompt: &str) -> RenderedAnswer {
        let system_prompt = system_prompt.trim();
        if system_prompt.is_empty() {
            return self.clear_system_prompt().await;
        }
        self.session.write().await.system_prompt = Some(system_prompt.to_owned());
        RenderedAnswer::new(TITLE_SYSTEM_PROMPT, OK)
    }

    pub async fn clear_system_prompt(&self) -> RenderedAnswer {
        self.session.write().await.system_prompt = None;
        RenderedAnswer::new(TITLE_SYSTEM_PROMPT, "system prompt cleared")
    }

    pub fn models_help(&self) -> String {
        let listing = |kind: ModelKind| {
            self.registry
                .list_available_with_provider_ids(kind)
                .into_iter()
                .map(|(alias, id)| format!("{alias} ({id})"))
                .collect::<Vec<_>>()
                .join("\n - ")
        };
        format!(
            "The available models are, TEXT MODELS: \n - {}\n\nIMAGE MODELS: \n - {}",
            listing(ModelKind::Chat),
            listing(ModelKind::Image)
        )
    }

    // ── internals ───────────────────────────────────────────────────────────

    async fn enqueue(&self, job: &Job) -> Result<()> {
        push_json(self.requests.as_ref(), job).await?;
        info!(
            trace_id = %job.trace_id,
            model = %job.model,
            image_model = job.image_model.as_deref().unwrap_or(""),
            "job enqueued"
        );
        Ok(())
    }

    async fn poll(&self) -> Result<RenderedAnswer> {
        self.retriever.fetch(self.poll_delay, false).await
    }
}
