use async_trait::async_trait;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vox_types::Provider;

use super::{GenerationClient, TranslationRequest, ensure_success, http_client, non_empty};
use crate::error::{BridgeError, Result};

const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

// ── wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct TextRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    prompt: &'a str,
}

/// m2m100 input.
#[derive(Debug, Serialize)]
struct TranslationBody<'a> {
    text: &'a str,
    source_lang: &'a str,
    target_lang: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: String,
}

/// The `{success, errors, result}` wrapper around every JSON answer.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    errors: Vec<ApiError>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct TextResult {
    #[serde(default)]
    response: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranslationResult {
    #[serde(default)]
    translated_text: Option<String>,
}

// ── client ───────────────────────────────────────────────────────────────────

/// Cloudflare Workers AI: text, image (raw bytes) and m2m100 translation.
#[derive(Debug, Clone)]
pub struct CloudflareClient {
    http: reqwest::Client,
    account_id: String,
    api_key: String,
    base_url: String,
}

impl CloudflareClient {
    pub fn new(account_id: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            account_id: account_id.into(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_owned(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn run<B: Serialize + ?Sized>(
        &self,
        model_id: &str,
        body: &B,
    ) -> Result<reqwest::Response> {
        let url = format!(
            "{}/accounts/{}/ai/run/{model_id}",
            self.base_url, self.account_id
        );
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;
        ensure_success(Provider::Cloudflare, response).await
    }

    async fn run_json<B, R>(&self, model_id: &str, body: &B) -> Result<Envelope<R>>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        Ok(self.run(model_id, body).await?.json().await?)
    }
}

#[async_trait]
impl GenerationClient for CloudflareClient {
    fn provider(&self) -> Provider {
        Provider::Cloudflare
    }

    async fn generate_text(
        &self,
        model_id: &str,
        system_prompt: Option<&str>,
        prompt: &str,
    ) -> Result<String> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        debug!(model = model_id, "workers ai text");
        let envelope = self.run_json(model_id, &TextRequest { messages }).await?;
        text_result(envelope)
    }

    async fn generate_image(&self, model_id: &str, prompt: &str) -> Result<Vec<u8>> {
        debug!(model = model_id, "workers ai image");
        let response = self.run(model_id, &ImageRequest { prompt }).await?;

        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));
        if is_json {
            // Image models answer with PNG bytes; JSON here is an error envelope.
            let envelope: Envelope<IgnoredAny> = response.json().await?;
            return Err(envelope_error(&envelope));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(BridgeError::MissingContent(
                "workers ai returned an empty image".into(),
            ));
        }
        Ok(bytes.to_vec())
    }

    async fn translate(&self, model_id: &str, request: TranslationRequest<'_>) -> Result<String> {
        debug!(
            model = model_id,
            source = request.source_language,
            target = request.target_language,
            "workers ai translation"
        );
        let body = TranslationBody {
            text: request.text,
            source_lang: request.source_language,
            target_lang: request.target_language,
        };
        let envelope = self.run_json(model_id, &body).await?;
        translation_result(envelope)
    }
}

/// Provider messages are logged; the error carries only the codes.
fn envelope_error<T>(envelope: &Envelope<T>) -> BridgeError {
    let messages: Vec<&str> = envelope.errors.iter().map(|e| e.message.as_str()).collect();
    let codes: Vec<String> = envelope
        .errors
        .iter()
        .filter_map(|e| e.code)
        .map(|c| c.to_string())
        .collect();
    warn!(errors = ?messages, codes = ?codes, "workers ai reported failure");

    if codes.is_empty() {
        BridgeError::Provider("cloudflare request was not successful".into())
    } else {
        BridgeError::Provider(format!(
            "cloudflare request was not successful (codes {})",
            codes.join(", ")
        ))
    }
}

fn text_result(envelope: Envelope<TextResult>) -> Result<String> {
    if envelope.success == Some(false) {
        return Err(envelope_error(&envelope));
    }
    let text = envelope.result.and_then(|r| r.response);
    non_empty(text.as_deref(), || "workers ai response was empty".into())
}

fn translation_result(envelope: Envelope<TranslationResult>) -> Result<String> {
    if envelope.success != Some(true) {
        return Err(envelope_error(&envelope));
    }
    let text = envelope.result.and_then(|r| r.translated_text);
    non_empty(text.as_deref(), || "workers ai translation was empty".into())
}
