use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use vox_types::Provider;

use super::{GenerationClient, ensure_success, http_client, non_empty};
use crate::error::Result;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

/// Body of `POST /messages`. The system prompt is a top-level field, not a
/// message.
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

/// Anthropic messages API. Text only.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicClient {
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
}

#[async_trait]
impl GenerationClient for AnthropicClient {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn generate_text(
        &self,
        model_id: &str,
        system_prompt: Option<&str>,
        prompt: &str,
    ) -> Result<String> {
        let request = MessagesRequest {
            model: model_id,
            max_tokens: MAX_TOKENS,
            system: system_prompt,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        debug!(model = model_id, "anthropic message");
        let response = self
            .http
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await?;
        let body: MessagesResponse = ensure_success(Provider::Anthropic, response)
            .await?
            .json()
            .await?;
        first_text(body)
    }
}

fn first_text(response: MessagesResponse) -> Result<String> {
    let text = response
        .content
        .into_iter()
        .find(|block| block.kind == "text")
        .and_then(|block| block.text);
    non_empty(text.as_deref(), || "anthropic response had no text block".into())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::BridgeError;
    use crate::testing::StubServer;

    #[test]
    fn first_text_block_wins() {
        let response = serde_json::from_value(json!({
            "content": [
                { "type": "thinking", "thinking": "..." },
                { "type": "text", "text": "Bonjour" }
            ]
        }))
        .unwrap();
        assert_eq!(first_text(response).unwrap(), "Bonjour");
    }

    #[test]
    fn empty_content_is_missing() {
        let response = serde_json::from_value(json!({ "content": [] })).unwrap();
        assert!(first_text(response).unwrap_err().is_missing_content());
    }

    #[tokio::test]
    async fn request_uses_api_key_header_and_top_level_system() {
        let mut server = StubServer::start(
            200,
            "application/json",
            r#"{"content":[{"type":"text","text":"Ahoy"}]}"#,
        )
        .await;
        let client = AnthropicClient::new("ant-key")
            .unwrap()
            .with_base_url(format!("{}/v1", server.base_url));

        let text = client
            .generate_text("claude-sonnet-4-20250514", Some("talk like a pirate"), "hello")
            .await
            .unwrap();
        assert_eq!(text, "Ahoy");

        let request = server.request().await;
        assert_eq!(request.path, "/v1/messages");
        assert_eq!(request.header("x-api-key"), Some("ant-key"));
        assert_eq!(request.header("anthropic-version"), Some(API_VERSION));
        assert!(request.header("authorization").is_none());
        let body = request.json();
        assert_eq!(body["system"], "talk like a pirate");
        assert_eq!(body["max_tokens"], MAX_TOKENS);
        assert_eq!(body["messages"], json!([{ "role": "user", "content": "hello" }]));
    }

    #[tokio::test]
    async fn overloaded_answer_is_a_provider_error() {
        let server = StubServer::start(
            529,
            "application/json",
            r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#,
        )
        .await;
        let client = AnthropicClient::new("ant-key")
            .unwrap()
            .with_base_url(&server.base_url);

        let err = client.generate_text("m", None, "hello").await.unwrap_err();
        let BridgeError::Provider(message) = &err else {
            panic!("expected a provider error, got {err:?}");
        };
        assert!(message.starts_with("anthropic returned http 529"));
        assert!(!message.contains("Overloaded"));
    }
}
