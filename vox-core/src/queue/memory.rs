use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use super::MessageQueue;
use crate::error::Result;

/// In-process queue for tests and the single-process mode.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    messages: Mutex<VecDeque<String>>,
    notify: Notify,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.messages.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl MessageQueue for MemoryQueue {
    async fn push(&self, body: String) -> Result<()> {
        self.messages.lock().await.push_back(body);
        self.notify.notify_one();
        Ok(())
    }

    async fn pull(&self, wait: Duration) -> Result<Option<String>> {
        let deadline = Instant::now() + wait;
        loop {
            // Register interest before checking so a concurrent push is not missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(body) = self.messages.lock().await.pop_front() {
                return Ok(Some(body));
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn purge(&self) -> Result<()> {
        self.messages.lock().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn messages_come_out_in_push_order() {
        let queue = MemoryQueue::new();
        queue.push("a".into()).await.unwrap();
        queue.push("b".into()).await.unwrap();

        assert_eq!(queue.pull(Duration::ZERO).await.unwrap().as_deref(), Some("a"));
        assert_eq!(queue.pull(Duration::ZERO).await.unwrap().as_deref(), Some("b"));
        assert!(queue.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn pull_gives_up_after_wait() {
        let queue = MemoryQueue::new();
        let started = Instant::now();
        assert!(queue.pull(Duration::from_secs(3)).await.unwrap().is_none());
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test]
    async fn pull_wakes_up_on_push() {
        let queue = Arc::new(MemoryQueue::new());
        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.pull(Duration::from_secs(30)).await })
        };
        tokio::task::yield_now().await;
        queue.push("late".into()).await.unwrap();

        let got = consumer.await.unwrap().unwrap();
        assert_eq!(got.as_deref(), Some("late"));
    }

    #[tokio::test]
    async fn purge_is_idempotent() {
        let queue = MemoryQueue::new();
        queue.push("x".into()).await.unwrap();
        queue.purge().await.unwrap();
        queue.purge().await.unwrap();
        assert!(queue.is_empty().await);
    }
}
