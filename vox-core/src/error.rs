use thiserror::Error;
use vox_types::{ModelKind, Provider};

/// Errors produced anywhere along the job bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The alias does not name any model of this kind.
    #[error("unknown {kind} model: {name}")]
    UnknownModel { kind: ModelKind, name: String },

    /// The model exists but its provider has no configured client.
    #[error("{model} unavailable: {provider} not configured")]
    ProviderNotConfigured { model: String, provider: Provider },

    /// The provider client cannot perform this kind of generation.
    #[error("{provider} does not support {capability}")]
    Unsupported {
        provider: Provider,
        capability: &'static str,
    },

    /// The provider answered but the answer held no usable content.
    #[error("missing content: {0}")]
    MissingContent(String),

    /// The provider rejected the request or reported a failure.
    #[error("provider error: {0}")]
    Provider(String),

    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// A queue message body could not be parsed or produced.
    #[error("invalid message body: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("queue error: {0}")]
    Queue(String),

    #[error("blob storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("image processing failed: {0}")]
    Image(#[from] image::ImageError),

    /// No JPEG quality between 90 and 10 brought the rendition under budget.
    #[error("could not satisfy target size of {budget_kb} KB for {width}x{height} rendition")]
    CompressionFailed {
        width: u32,
        height: u32,
        budget_kb: usize,
    },

    /// Two registry entries share an alias.
    #[error("duplicate model alias: {0}")]
    DuplicateAlias(String),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl BridgeError {
    /// `true` when the provider was reachable but said nothing useful.
    pub fn is_missing_content(&self) -> bool {
        matches!(self, BridgeError::MissingContent(_))
    }
}

impl From<sqlx::Error> for BridgeError {
    fn from(e: sqlx::Error) -> Self {
        BridgeError::Queue(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for BridgeError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        BridgeError::Queue(e.to_string())
    }
}

pub type Result<T, E = BridgeError> = std::result::Result<T, E>;
