//! Image post-processing: size-constrained JPEG renditions of a generated image.

use std::sync::Arc;

use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{BridgeError, Result};
use crate::storage::BlobStore;

/// Small rendition first, then large.
pub const DEFAULT_TARGETS: [(u32, u32); 2] = [(720, 480), (1200, 800)];
pub const DEFAULT_BUDGET_KB: usize = 500;
pub const DEFAULT_PREFIX: &str = "images/";

const START_QUALITY: u8 = 90;
const QUALITY_STEP: u8 = 10;

/// Resizes, compresses and stores renditions of a raw image.
#[derive(Clone)]
pub struct ImageRenderer {
    store: Arc<dyn BlobStore>,
    targets: Vec<(u32, u32)>,
    budget_kb: usize,
    prefix: String,
}

impl std::fmt::Debug for ImageRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageRenderer")
            .field("targets", &self.targets)
            .field("budget_kb", &self.budget_kb)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl ImageRenderer {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            targets: DEFAULT_TARGETS.to_vec(),
            budget_kb: DEFAULT_BUDGET_KB,
            prefix: DEFAULT_PREFIX.to_owned(),
        }
    }

    pub fn with_budget_kb(mut self, budget_kb: usize) -> Self {
        self.budget_kb = budget_kb;
        self
    }

    pub fn with_targets(mut self, targets: Vec<(u32, u32)>) -> Self {
        self.targets = targets;
        self
    }

    /// Render every target size and return the stored URLs in target order.
    ///
    /// All renditions of one call share a request id.
    pub async fn render(&self, raw: &[u8]) -> Result<Vec<String>> {
        let raw = raw.to_vec();
        let targets = self.targets.clone();
        let budget_kb = self.budget_kb;

        // Decoding and the quality search are CPU bound.
        let renditions = tokio::task::spawn_blocking(move || -> Result<Vec<(u32, u32, Vec<u8>)>> {
            let source = image::load_from_memory(&raw)?;
            targets
                .into_iter()
                .map(|(w, h)| compress_to_budget(&source, w, h, budget_kb).map(|b| (w, h, b)))
                .collect()
        })
        .await??;

        let request_id = Uuid::new_v4().to_string();
        let mut urls = Vec::with_capacity(renditions.len());
        for (width, height, bytes) in renditions {
            let file_name = format!("{}-{width}-{height}.jpg", Uuid::new_v4());
            let url = self
                .store
                .put(&request_id, &file_name, &self.prefix, bytes)
                .await?;
            urls.push(url);
        }

        info!(request_id = %request_id, renditions = urls.len(), "image rendered");
        Ok(urls)
    }
}

/// Resize to exactly `width`x`height` and lower the JPEG quality from 90 in
/// steps of 10 until the encoding fits `budget_kb`.
pub fn compress_to_budget(
    source: &DynamicImage,
    width: u32,
    height: u32,
    budget_kb: usize,
) -> Result<Vec<u8>> {
    let resized = DynamicImage::ImageRgb8(
        source
            .resize_exact(width, height, FilterType::Lanczos3)
            .to_rgb8(),
    );
    let budget_bytes = budget_kb * 1024;

    let mut quality = START_QUALITY;
    while quality > 0 {
        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, quality).encode_image(&resized)?;
        if bytes.len() <= budget_bytes {
            debug!(width, height, quality, kb = bytes.len() / 1024, "rendition fits budget");
            return Ok(bytes);
        }
        debug!(width, height, quality, kb = bytes.len() / 1024, "rendition over budget");
        quality -= QUALITY_STEP;
    }

    Err(BridgeError::CompressionFailed {
        width,
        height,
        budget_kb,
    })
}
