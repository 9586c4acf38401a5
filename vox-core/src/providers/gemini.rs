use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use vox_types::Provider;

use super::{GenerationClient, decode_base64, ensure_success, http_client, non_empty};
use crate::error::{BridgeError, Result};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// ── request types ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<TextPart<'a>>,
}

impl<'a> Content<'a> {
    fn user(text: &'a str) -> Self {
        Self {
            role: Some("user"),
            parts: vec![TextPart { text }],
        }
    }

    fn instruction(text: &'a str) -> Self {
        Self {
            role: None,
            parts: vec![TextPart { text }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: [&'static str; 2],
}

/// Body of `models/{id}:generateContent`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct PredictInstance<'a> {
    prompt: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    sample_count: u32,
}

/// Body of `models/{id}:predict` (Imagen).
#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: Vec<PredictInstance<'a>>,
    parameters: PredictParameters,
}

// ── response types ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct InlineData {
    #[serde(default)]
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    #[serde(default)]
    bytes_base64_encoded: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

// ── client ───────────────────────────────────────────────────────────────────

/// Gemini `generateContent` for text and native image models, Imagen
/// `predict` for `imagen-*` models.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_owned(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn call<B, R>(&self, model_id: &str, method: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .http
            .post(format!("{}/models/{model_id}:{method}", self.base_url))
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;
        Ok(ensure_success(Provider::Gemini, response).await?.json().await?)
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn generate_text(
        &self,
        model_id: &str,
        system_prompt: Option<&str>,
        prompt: &str,
    ) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![Content::user(prompt)],
            system_instruction: system_prompt.map(Content::instruction),
            generation_config: None,
        };

        debug!(model = model_id, "gemini generate content");
        let response = self.call(model_id, "generateContent", &request).await?;
        joined_text(response)
    }

    async fn generate_image(&self, model_id: &str, prompt: &str) -> Result<Vec<u8>> {
        debug!(model = model_id, "gemini image generation");
        if model_id.starts_with("imagen") {
            let request = PredictRequest {
                instances: vec![PredictInstance { prompt }],
                parameters: PredictParameters { sample_count: 1 },
            };
            let response = self.call(model_id, "predict", &request).await?;
            return predicted_image(response);
        }

        let request = GenerateContentRequest {
            contents: vec![Content::user(prompt)],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_modalities: ["TEXT", "IMAGE"],
            }),
        };
        let response = self.call(model_id, "generateContent", &request).await?;
        inline_image(response)
    }
}

fn first_candidate_parts(response: GenerateContentResponse) -> Result<Vec<Part>> {
    response
        .candidates
        .into_iter()
        .next()
        .map(|c| c.content.parts)
        .filter(|parts| !parts.is_empty())
        .ok_or_else(|| BridgeError::MissingContent("gemini response had no candidates".into()))
}

fn joined_text(response: GenerateContentResponse) -> Result<String> {
    let text: String = first_candidate_parts(response)?
        .into_iter()
        .filter_map(|p| p.text)
        .collect();
    non_empty(Some(text.as_str()), || "gemini candidate had no text".into())
}

fn inline_image(response: GenerateContentResponse) -> Result<Vec<u8>> {
    let data = first_candidate_parts(response)?
        .into_iter()
        .find_map(|p| p.inline_data.and_then(|d| d.data));
    let data = non_empty(data.as_deref(), || "gemini candidate had no inline image".into())?;
    decode_base64(Provider::Gemini, &data)
}

fn predicted_image(response: PredictResponse) -> Result<Vec<u8>> {
    let data = response
        .predictions
        .into_iter()
        .next()
        .and_then(|p| p.bytes_base64_encoded);
    let data = non_empty(data.as_deref(), || "imagen response had no predictions".into())?;
    decode_base64(Provider::Gemini, &data)
}
