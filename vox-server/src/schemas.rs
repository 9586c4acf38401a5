//! Request bodies of the voice endpoints.

use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct PromptRequest {
    #[validate(length(min = 1, message = "prompt must not be empty"))]
    pub prompt: String,
    /// Also enqueue an image Job for the same prompt.
    #[serde(default)]
    pub illustrate: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ImageRequest {
    #[validate(length(min = 1, message = "prompt must not be empty"))]
    pub prompt: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TranslateRequest {
    #[validate(length(min = 1, message = "prompt must not be empty"))]
    pub prompt: String,
    #[serde(default)]
    pub source_language: Option<String>,
    #[serde(default)]
    pub target_language: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SystemPromptRequest {
    #[validate(length(min = 1, message = "system_prompt must not be empty"))]
    pub system_prompt: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SelectModelRequest {
    #[validate(length(min = 1, message = "alias must not be empty"))]
    pub alias: String,
}
