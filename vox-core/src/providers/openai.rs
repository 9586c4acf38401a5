use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use vox_types::Provider;

use super::{GenerationClient, decode_base64, ensure_success, http_client, non_empty};
use crate::error::{BridgeError, Result};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

// ── wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Body of `POST /chat/completions`.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Default, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

/// Body of `POST /images/generations`.
#[derive(Debug, Serialize)]
struct ImageGenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    b64_json: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageGenerationResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

// ── client ───────────────────────────────────────────────────────────────────

/// OpenAI chat completions + image generation.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
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

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;
        Ok(ensure_success(Provider::OpenAi, response).await?.json().await?)
    }
}

#[async_trait]
impl GenerationClient for OpenAiClient {
    fn provider(&self) -> Provider {
        Provider::OpenAi
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
        let request = ChatCompletionRequest {
            model: model_id,
            messages,
        };

        debug!(model = model_id, "openai chat completion");
        let response = self.post("/chat/completions", &request).await?;
        chat_text(response)
    }

    async fn generate_image(&self, model_id: &str, prompt: &str) -> Result<Vec<u8>> {
        let request = ImageGenerationRequest {
            model: model_id,
            prompt,
            n: 1,
            // gpt-image models always answer in base64 and reject the parameter.
            response_format: model_id.starts_with("dall-e").then_some("b64_json"),
        };

        debug!(model = model_id, "openai image generation");
        let response = self.post("/images/generations", &request).await?;
        image_bytes(response)
    }
}

fn chat_text(response: ChatCompletionResponse) -> Result<String> {
    let Some(choice) = response.choices.into_iter().next() else {
        return Err(BridgeError::MissingContent(
            "openai response had no choices".into(),
        ));
    };
    non_empty(choice.message.content.as_deref(), || {
        "openai choice had empty content".into()
    })
}

fn image_bytes(response: ImageGenerationResponse) -> Result<Vec<u8>> {
    let data = response.data.into_iter().next().and_then(|d| d.b64_json);
    let data = non_empty(data.as_deref(), || "openai image response had no data".into())?;
    decode_base64(Provider::OpenAi, &data)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tracing_test::traced_test;

    use super::*;
    use crate::testing::StubServer;

    fn typed<T: DeserializeOwned>(value: serde_json::Value) -> T {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn chat_response_takes_first_choice() {
        let response = typed(json!({
            "choices": [
                { "message": { "role": "assistant", "content": "Paris" } },
                { "message": { "role": "assistant", "content": "Lyon" } }
            ]
        }));
        assert_eq!(chat_text(response).unwrap(), "Paris");
    }

    #[test]
    fn chat_response_without_choices_is_missing_content() {
        let err = chat_text(typed(json!({ "choices": [] }))).unwrap_err();
        assert!(err.is_missing_content());

        let null_content = typed(json!({ "choices": [ { "message": { "content": null } } ] }));
        assert!(chat_text(null_content).unwrap_err().is_missing_content());
    }

    #[test]
    fn corrupt_image_payload_is_a_provider_error() {
        let response = typed(json!({ "data": [ { "b64_json": "***" } ] }));
        assert!(matches!(image_bytes(response), Err(BridgeError::Provider(_))));
    }

    #[tokio::test]
    async fn chat_request_sends_bearer_and_system_message_first() {
        let mut server = StubServer::start(
            200,
            "application/json",
            r#"{"choices":[{"message":{"role":"assistant","content":"Paris"}}]}"#,
        )
        .await;
        let client = OpenAiClient::new("sk-test")
            .unwrap()
            .with_base_url(format!("{}/v1", server.base_url));

        let text = client
            .generate_text("gpt-4o", Some("be brief"), "capital of France?")
            .await
            .unwrap();
        assert_eq!(text, "Paris");

        let request = server.request().await;
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/v1/chat/completions");
        assert_eq!(request.header("authorization"), Some("Bearer sk-test"));
        let body = request.json();
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0], json!({ "role": "system", "content": "be brief" }));
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "capital of France?");
    }

    #[tokio::test]
    async fn dall_e_is_asked_for_base64_but_gpt_image_is_not() {
        let mut server = StubServer::start(
            200,
            "application/json",
            r#"{"created":1,"data":[{"b64_json":"aGVsbG8="}]}"#,
        )
        .await;
        let client = OpenAiClient::new("sk-test")
            .unwrap()
            .with_base_url(&server.base_url);

        let bytes = client.generate_image("dall-e-3", "a cat").await.unwrap();
        assert_eq!(bytes, b"hello");
        let request = server.request().await;
        assert_eq!(request.path, "/images/generations");
        assert_eq!(request.json()["response_format"], "b64_json");
        assert_eq!(request.json()["n"], 1);

        client.generate_image("gpt-image-1", "a cat").await.unwrap();
        assert!(server.request().await.json().get("response_format").is_none());
    }

    #[tokio::test]
    #[traced_test]
    async fn http_failure_names_status_and_logs_body() {
        let server = StubServer::start(
            401,
            "application/json",
            r#"{"error":{"message":"Incorrect API key provided: sk-proj-ABCDEF123.","type":"invalid_request_error","code":"invalid_api_key"}}"#,
        )
        .await;
        let client = OpenAiClient::new("sk-proj-ABCDEF123")
            .unwrap()
            .with_base_url(&server.base_url);

        let err = client.generate_text("gpt-4o", None, "hi").await.unwrap_err();
        assert_eq!(err.to_string(), "provider error: openai returned http 401 Unauthorized");
        assert!(!err.is_missing_content());
        assert!(logs_contain("Incorrect API key provided"));
    }
}
