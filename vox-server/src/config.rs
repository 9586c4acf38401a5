//! Process configuration, loaded from environment variables at startup.

use std::time::Duration;

/// Runtime configuration shared by `serve` and `worker`.
///
/// Every field has a default so the bridge starts without any environment
/// set; providers without credentials are simply unavailable.
#[derive(Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// sqlx SQLite URL of the shared queue database, or `memory` to run the
    /// worker inside the `serve` process (default: `"sqlite://vox-queue.db"`).
    pub queue_url: String,
    pub requests_queue: String,
    pub responses_queue: String,

    /// Seconds the front-end waits for a Result before answering "shortly".
    pub poll_delay_secs: u64,
    /// Seconds one worker pull waits for a request.
    pub worker_wait_secs: u64,

    /// Where renditions are written and served from.
    pub blob_dir: String,
    /// Host part of rendition URLs.
    pub blob_host: String,
    pub blob_bucket: String,

    /// `tracing` filter string from `VOX_LOG`; `RUST_LOG` is used when unset.
    pub log_level: Option<String>,
    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub cloudflare_account_id: Option<String>,
    pub cloudflare_api_key: Option<String>,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("VOX_BIND", "0.0.0.0:3000"),
            queue_url: env_or("VOX_QUEUE_URL", "sqlite://vox-queue.db"),
            requests_queue: env_or("VOX_REQUESTS_QUEUE", "requests"),
            responses_queue: env_or("VOX_RESPONSES_QUEUE", "responses"),
            poll_delay_secs: parse_env("VOX_POLL_DELAY", 3),
            worker_wait_secs: parse_env("VOX_WORKER_WAIT", 10),
            blob_dir: env_or("VOX_BLOB_DIR", "./blobs"),
            blob_host: env_or("VOX_BLOB_HOST", "localhost:3000"),
            blob_bucket: env_or("VOX_BLOB_BUCKET", "vox-images"),
            log_level: env_opt("VOX_LOG"),
            log_json: std::env::var("VOX_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            openai_api_key: env_opt("OPENAI_API_KEY"),
            gemini_api_key: env_opt("GEMINI_API_KEY"),
            anthropic_api_key: env_opt("ANTHROPIC_API_KEY"),
            cloudflare_account_id: env_opt("CLOUDFLARE_ACCOUNT_ID"),
            cloudflare_api_key: env_opt("CLOUDFLARE_API_KEY"),
        }
    }

    pub fn poll_delay(&self) -> Duration {
        Duration::from_secs(self.poll_delay_secs)
    }

    pub fn worker_wait(&self) -> Duration {
        Duration::from_secs(self.worker_wait_secs)
    }

    /// `true` when requests and responses live in this process only.
    pub fn in_memory_queue(&self) -> bool {
        self.queue_url.eq_ignore_ascii_case("memory")
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let set = |v: &Option<String>| if v.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("queue_url", &self.queue_url)
            .field("requests_queue", &self.requests_queue)
            .field("responses_queue", &self.responses_queue)
            .field("poll_delay_secs", &self.poll_delay_secs)
            .field("worker_wait_secs", &self.worker_wait_secs)
            .field("blob_dir", &self.blob_dir)
            .field("blob_host", &self.blob_host)
            .field("blob_bucket", &self.blob_bucket)
            .field("log_level", &self.log_level)
            .field("log_json", &self.log_json)
            .field("openai_api_key", &set(&self.openai_api_key))
            .field("gemini_api_key", &set(&self.gemini_api_key))
            .field("anthropic_api_key", &set(&self.anthropic_api_key))
            .field("cloudflare_account_id", &set(&self.cloudflare_account_id))
            .field("cloudflare_api_key", &set(&self.cloudflare_api_key))
            .finish()
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Unset and blank values are both `None`.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_credentials() {
        let mut cfg = Config::from_env();
        cfg.openai_api_key = Some("sk-very-secret".into());
        let printed = format!("{cfg:?}");
        assert!(!printed.contains("sk-very-secret"));
        assert!(printed.contains("<set>"));
    }

    #[test]
    fn memory_queue_url_is_case_insensitive() {
        let mut cfg = Config::from_env();
        cfg.queue_url = "MEMORY".into();
        assert!(cfg.in_memory_queue());
        cfg.queue_url = "sqlite::memory:".into();
        assert!(!cfg.in_memory_queue());
    }
}
