use serde::{Deserialize, Serialize};

/// Pair of image URLs shown alongside a spoken answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageCard {
    pub small_url: String,
    pub large_url: String,
}

/// What the voice front-end speaks (and optionally displays) back to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedAnswer {
    pub title: String,
    pub speech: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageCard>,
    #[serde(default)]
    pub end_session: bool,
}

impl RenderedAnswer {
    pub fn new(title: impl Into<String>, speech: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            speech: speech.into(),
            image: None,
            end_session: false,
        }
    }

    pub fn with_images(
        title: impl Into<String>,
        speech: impl Into<String>,
        small_url: impl Into<String>,
        large_url: impl Into<String>,
    ) -> Self {
        Self {
            image: Some(ImageCard {
                small_url: small_url.into(),
                large_url: large_url.into(),
            }),
            ..Self::new(title, speech)
        }
    }

    pub fn ending_session(mut self) -> Self {
        self.end_session = true;
        self
    }
}
