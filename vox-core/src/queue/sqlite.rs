//! SQLite-backed queue shared by independent processes.
//!
//! Migrations are embedded at compile time from `vox-core/migrations` and run
//! by [`SqliteQueue::connect`]. Runtime-checked `sqlx::query` is used so no
//! `DATABASE_URL` is needed to build.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::time::Instant;
use tracing::debug;

use super::MessageQueue;
use crate::error::Result;

/// How often an empty queue is re-checked while a `pull` is waiting.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// One named channel stored in the `queue_messages` table.
#[derive(Clone, Debug)]
pub struct SqliteQueue {
    pool: SqlitePool,
    name: String,
}

impl SqliteQueue {
    /// Open (or create) the database at `url`, run migrations and bind to
    /// the channel `name`.
    ///
    /// `url` is a sqlx SQLite URL such as `"sqlite://vox-queue.db"` or
    /// `"sqlite::memory:"`.
    pub async fn connect(url: &str, name: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let mut pool_options = SqlitePoolOptions::new().max_connections(5);
        if url.contains(":memory:") {
            // Every in-memory connection is its own database; keep exactly one alive.
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_options.connect_with(options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self {
            pool,
            name: name.to_owned(),
        })
    }

    /// Another channel on the same database.
    pub fn channel(&self, name: &str) -> Self {
        Self {
            pool: self.pool.clone(),
            name: name.to_owned(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    async fn take_oldest(&self) -> Result<Option<String>> {
        let body = sqlx::query_scalar::<_, String>(
            "DELETE FROM queue_messages \
             WHERE id = (SELECT id FROM queue_messages WHERE queue = ?1 ORDER BY id LIMIT 1) \
             RETURNING body",
        )
        .bind(&self.name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(body)
    }
}

#[async_trait]
impl MessageQueue for SqliteQueue {
    async fn push(&self, body: String) -> Result<()> {
        sqlx::query("INSERT INTO queue_messages (queue, body, created_at) VALUES (?1, ?2, ?3)")
            .bind(&self.name)
            .bind(&body)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
        debug!(queue = %self.name, bytes = body.len(), "message pushed");
        Ok(())
    }

    async fn pull(&self, wait: Duration) -> Result<Option<String>> {
        let deadline = Instant::now() + wait;
        loop {
            if let Some(body) = self.take_oldest().await? {
                debug!(queue = %self.name, "message received");
                return Ok(Some(body));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    async fn purge(&self) -> Result<()> {
        let removed = sqlx::query("DELETE FROM queue_messages WHERE queue = ?1")
            .bind(&self.name)
            .execute(&self.pool)
            .await?
            .rows_affected();
        debug!(queue = %self.name, removed, "queue purged");
        Ok(())
    }
}
