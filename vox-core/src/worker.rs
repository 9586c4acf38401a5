//! Job worker: the consumer side of the bridge.
//!
//! Every Job handed to [`JobWorker::process`] produces exactly one
//! [`JobResult`] on the response queue, including when generation panics.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tracing::{Instrument, error, info, info_span, warn};
use vox_types::{Job, JobResult};

use crate::error::{BridgeError, Result};
use crate::queue::{MessageQueue, push_json};
use crate::render::ImageRenderer;
use crate::router::GenerationRouter;

/// Error text carried by the Result of a Job whose processing panicked.
pub const PANIC_ERROR_MESSAGE: &str = "an error occurred when processing the prompt";

/// Back-off after the request queue itself fails.
const QUEUE_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Terminal outcome of one Job before it is shaped into a [`JobResult`].
#[derive(Debug)]
enum Outcome {
    Success { response: String, images: Vec<String> },
    Failure(String),
}

pub struct JobWorker {
    router: GenerationRouter,
    renderer: ImageRenderer,
    responses: Arc<dyn MessageQueue>,
}

impl JobWorker {
    pub fn new(
        router: GenerationRouter,
        renderer: ImageRenderer,
        responses: Arc<dyn MessageQueue>,
    ) -> Self {
        Self {
            router,
            renderer,
            responses,
        }
    }

    // ── Public API ──────────────────────────────────────────────────────────

    /// Run `job` and push its Result. Never fails; the pushed Result is
    /// returned for the caller's convenience.
    pub async fn process(&self, job: Job) -> JobResult {
        let span = info_span!("process_job", trace_id = %job.trace_id);
        self.process_inner(job).instrument(span).await
    }

    /// Parse a raw request body and process it.
    ///
    /// A body that is not a Job cannot produce a Result, so this is the one
    /// path that reports an error instead.
    pub async fn handle_message(&self, raw: &str) -> Result<JobResult> {
        let job: Job = serde_json::from_str(raw).map_err(|e| {
            error!(data = raw, error = %e, "failed to parse queued job");
            BridgeError::from(e)
        })?;
        Ok(self.process(job).await)
    }

    /// Pull and process requests one at a time until `shutdown` resolves.
    ///
    /// A job that is already running is finished before the loop exits.
    pub async fn run(
        &self,
        requests: &dyn MessageQueue,
        wait: Duration,
        shutdown: impl Future<Output = ()>,
    ) {
        tokio::pin!(shutdown);
        info!(wait_secs = wait.as_secs(), "worker started");
        loop {
            let pulled = tokio::select! {
                _ = &mut shutdown => break,
                pulled = requests.pull(wait) => pulled,
            };
            match pulled {
                Ok(Some(raw)) => {
                    // Unparseable bodies are dropped; they were logged above.
                    let _ = self.handle_message(&raw).await;
                }
                Ok(None) => {}
                Err(e) => {
                    error!(error = %e, "request queue pull failed");
                    tokio::time::sleep(QUEUE_ERROR_BACKOFF).await;
                }
            }
        }
        info!("worker stopped");
    }

    // ── internals ───────────────────────────────────────────────────────────

    async fn process_inner(&self, job: Job) -> JobResult {
        info!(
            model = %job.model,
            image_model = job.image_model.as_deref().unwrap_or(""),
            "processing job"
        );
        let started = Instant::now();
        let model = self.effective_model(&job);

        let outcome = match AssertUnwindSafe(self.execute(&job, &model))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => {
                error!(
                    payload = %serde_json::to_string(&job).unwrap_or_default(),
                    panic = panic_message(panic.as_ref()),
                    "panic occurred during job processing"
                );
                Outcome::Failure(PANIC_ERROR_MESSAGE.to_owned())
            }
        };

        let elapsed = started.elapsed();
        let (response, images, error_message) = match outcome {
            Outcome::Success { response, images } => (response, images, String::new()),
            Outcome::Failure(message) => (String::new(), Vec::new(), message),
        };
        // The image model is what actually ran for image jobs.
        let model_used = match &job.image_model {
            Some(image_model) if job.is_image() => image_model.clone(),
            _ => model,
        };

        let result = JobResult {
            prompt: job.prompt,
            response,
            time_diff: format!("{:.0}", elapsed.as_secs_f64()),
            model: model_used,
            images,
            error_message,
            system_prompt: job.system_prompt,
            trace_id: job.trace_id,
        };

        info!(
            elapsed_secs = %result.time_diff,
            response_bytes = result.response.len(),
            images = result.images.len(),
            failed = result.is_error(),
            "pushing result"
        );
        if let Err(e) = push_json(self.responses.as_ref(), &result).await {
            error!(error = %e, "failed to publish result to response queue");
        }
        result
    }

    async fn execute(&self, job: &Job, model: &str) -> Outcome {
        let image_model = job.image_model.as_deref().filter(|_| job.is_image());
        let generated = if let Some(image_model) = image_model {
            self.illustrate(&job.prompt, image_model)
                .await
                .map(|images| (String::new(), images))
        } else if self.router.registry().is_translation(model) {
            self.router
                .translate(
                    &job.prompt,
                    job.source_language.as_deref(),
                    job.target_language.as_deref(),
                    Some(model),
                )
                .await
                .map(|text| (text, Vec::new()))
        } else if !job.system_prompt.trim().is_empty() {
            self.router
                .generate_text_with_system(&job.system_prompt, &job.prompt, model)
                .await
                .map(|text| (text, Vec::new()))
        } else {
            self.router
                .generate_text(&job.prompt, model)
                .await
                .map(|text| (text, Vec::new()))
        };

        match generated {
            Ok((response, images)) => Outcome::Success { response, images },
            // A blocking stage that panicked surfaces as a join error.
            Err(BridgeError::Join(e)) => {
                error!(error = %e, "background task failed during job processing");
                Outcome::Failure(PANIC_ERROR_MESSAGE.to_owned())
            }
            Err(e) => {
                warn!(error = %e, missing_content = e.is_missing_content(), "generation failed");
                Outcome::Failure(e.to_string())
            }
        }
    }

    async fn illustrate(&self, prompt: &str, image_model: &str) -> Result<Vec<String>> {
        let raw = self.router.generate_image(prompt, image_model).await?;
        self.renderer.render(&raw).await
    }

    fn effective_model(&self, job: &Job) -> String {
        if job.model.trim().is_empty() {
            self.router.registry().default_chat_model().to_owned()
        } else {
            job.model.clone()
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
