//! Response retriever: bounded-wait poll of the response queue with a
//! single-slot cache as fallback.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, error, info};
use vox_types::{JobResult, ModelKind, RenderedAnswer};

use crate::error::{BridgeError, Result};
use crate::queue::MessageQueue;
use crate::registry::Registry;

const TITLE: &str = "Response";
pub const NOT_READY_SPEECH: &str = "your response will be available shortly";
pub const NO_ANSWER_SPEECH: &str = "I do not have an answer to your last prompt";

/// The most recent terminal Result seen by this handler.
///
/// Last writer wins when two results land concurrently.
#[derive(Debug, Default)]
pub struct CacheSlot {
    last: RwLock<Option<JobResult>>,
}

impl CacheSlot {
    pub async fn get(&self) -> Option<JobResult> {
        self.last.read().await.clone()
    }

    pub async fn store(&self, result: JobResult) {
        *self.last.write().await = Some(result);
    }
}

pub struct ResponseRetriever {
    responses: Arc<dyn MessageQueue>,
    registry: Arc<Registry>,
    cache: CacheSlot,
}

impl ResponseRetriever {
    pub fn new(responses: Arc<dyn MessageQueue>, registry: Arc<Registry>) -> Self {
        Self {
            responses,
            registry,
            cache: CacheSlot::default(),
        }
    }

    pub fn cache(&self) -> &CacheSlot {
        &self.cache
    }

    pub fn responses(&self) -> &Arc<dyn MessageQueue> {
        &self.responses
    }

    /// Wait at most `wait` for a Result and render it.
    ///
    /// With nothing new, `want_last_known` selects between the cached Result
    /// and the "available shortly" answer.
    pub async fn fetch(&self, wait: Duration, want_last_known: bool) -> Result<RenderedAnswer> {
        let Some(raw) = self.responses.pull(wait).await? else {
            if !want_last_known {
                debug!("no result yet");
                return Ok(RenderedAnswer::new(TITLE, NOT_READY_SPEECH));
            }
            return Ok(match self.cache.get().await {
                Some(cached) => self.render(&cached),
                None => RenderedAnswer::new(TITLE, NO_ANSWER_SPEECH),
            });
        };

        let result: JobResult = serde_json::from_str(&raw).map_err(|e| {
            error!(data = %raw, error = %e, "failed to parse job result");
            BridgeError::from(e)
        })?;
        info!(
            trace_id = %result.trace_id,
            model = %result.model,
            failed = result.is_error(),
            "result received"
        );

        let answer = self.render(&result);
        self.cache.store(result).await;
        Ok(answer)
    }

    /// Spoken form of a Result.
    pub fn render(&self, result: &JobResult) -> RenderedAnswer {
        if result.is_error() {
            return RenderedAnswer::new(
                TITLE,
                format!(
                    "I encountered an error processing your prompt, {}",
                    result.error_message
                ),
            );
        }

        if self.registry.kind_of(&result.model) == Some(ModelKind::Image) {
            let speech = format!(
                "your generated image took {} seconds to fetch",
                result.time_diff
            );
            return match result.images.as_slice() {
                [small, large, ..] => RenderedAnswer::with_images(TITLE, speech, small, large),
                [only] => RenderedAnswer::with_images(TITLE, speech, only, only),
                [] => RenderedAnswer::new(TITLE, speech),
            };
        }

        if self.registry.is_translation(&result.model) {
            return RenderedAnswer::new(
                TITLE,
                format!(
                    "your translated prompt is {}, this took {} seconds to fetch the answer",
                    result.response, result.time_diff
                ),
            );
        }

        RenderedAnswer::new(
            TITLE,
            format!(
                "{}, from the {} model, this took {} seconds to fetch the answer",
                result.response, result.model, result.time_diff
            ),
        )
    }
}
