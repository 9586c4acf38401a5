//! Blob storage for rendered images.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;

/// Somewhere renditions can be written and later fetched by URL.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `<prefix><request_id>/<file_name>` and return its
    /// public URL.
    async fn put(
        &self,
        request_id: &str,
        file_name: &str,
        prefix: &str,
        data: Vec<u8>,
    ) -> Result<String>;
}

/// Filesystem-backed store whose URLs follow the
/// `https://<host>/<bucket>/<key>` layout.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    dir: PathBuf,
    host: String,
    bucket: String,
}

impl LocalBlobStore {
    pub fn new(
        dir: impl Into<PathBuf>,
        host: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            dir: dir.into(),
            host: host.into(),
            bucket: bucket.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn url_for(&self, key: &str) -> String {
        format!("https://{}/{}/{key}", self.host, self.bucket)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(
        &self,
        request_id: &str,
        file_name: &str,
        prefix: &str,
        data: Vec<u8>,
    ) -> Result<String> {
        let key = format!("{prefix}{request_id}/{file_name}");
        let path = self.dir.join(&key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &data).await?;
        debug!(path = %path.display(), bytes = data.len(), "blob written");
        Ok(self.url_for(&key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_writes_file_and_returns_bucket_url() {
        let dir = std::env::temp_dir().join(format!("vox-blobs-{}", uuid::Uuid::new_v4()));
        let store = LocalBlobStore::new(&dir, "cdn.example", "vox-images");

        let url = store
            .put("req-1", "abc-720-480.jpg", "images/", vec![1, 2, 3])
            .await
            .unwrap();

        assert_eq!(url, "https://cdn.example/vox-images/images/req-1/abc-720-480.jpg");
        let written = tokio::fs::read(dir.join("images/req-1/abc-720-480.jpg"))
            .await
            .unwrap();
        assert_eq!(written, vec![1, 2, 3]);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
