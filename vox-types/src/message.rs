//! Queue message bodies.
//!
//! Both types are serialized as JSON and must round-trip exactly between the
//! dispatcher and the worker, which run as independent processes.

use serde::{Deserialize, Deserializer, Serialize};

/// A single generation request enqueued by the front-end.
///
/// Immutable once enqueued. `model` is the logical chat model alias; when
/// `image_model` is set the job is an image job and the chat model only
/// serves as a fallback label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_language: Option<String>,
    #[serde(default)]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_model: Option<String>,
    #[serde(default)]
    pub trace_id: String,
}

impl Job {
    /// Text generation job for the given chat model alias.
    pub fn text(
        prompt: impl Into<String>,
        model: impl Into<String>,
        trace_id: impl Into<String>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            trace_id: trace_id.into(),
            ..Default::default()
        }
    }

    /// Image generation job. `chat_model` is kept for the record only.
    pub fn image(
        prompt: impl Into<String>,
        image_model: impl Into<String>,
        chat_model: impl Into<String>,
        trace_id: impl Into<String>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            model: chat_model.into(),
            image_model: Some(image_model.into()),
            trace_id: trace_id.into(),
            ..Default::default()
        }
    }

    /// Translation job routed to `translation_model`.
    pub fn translation(
        prompt: impl Into<String>,
        translation_model: impl Into<String>,
        source_language: Option<String>,
        target_language: Option<String>,
        trace_id: impl Into<String>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            model: translation_model.into(),
            source_language,
            target_language,
            trace_id: trace_id.into(),
            ..Default::default()
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    /// `true` when the job asks for an image rather than text.
    pub fn is_image(&self) -> bool {
        self.image_model.as_deref().is_some_and(|m| !m.is_empty())
    }
}

/// Terminal outcome of a [`Job`], pushed onto the response queue.
///
/// `error_message` is empty on success. `time_diff` is a decimal-seconds
/// string such as `"3"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub time_diff: String,
    #[serde(default)]
    pub model: String,
    #[serde(rename = "images_responses", default, deserialize_with = "null_as_empty")]
    pub images: Vec<String>,
    #[serde(default)]
    pub error_message: String,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub trace_id: String,
}

impl JobResult {
    pub fn is_error(&self) -> bool {
        !self.error_message.is_empty()
    }

    /// Parsed form of `time_diff`, if it holds a whole number of seconds.
    pub fn elapsed_seconds(&self) -> Option<u64> {
        self.time_diff.trim().parse().ok()
    }
}

/// Older producers emit `null` instead of an empty list.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
