//! Test helpers: an in-memory BatchQueue fake and feed XML builders.

use std::collections::VecDeque;
use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use tokio::sync::Mutex;

use jobfeed_import::services::queue::{BatchQueue, QueueError, QueueStats, QueuedBatch};

#[derive(Default)]
struct MemoryQueueInner {
    waiting: VecDeque<QueuedBatch>,
    active: Vec<QueuedBatch>,
    completed: u64,
    failed: u64,
}

/// In-memory stand-in for the durable queue, honoring the same delivery
/// contract: one worker at a time per unit, independent retry per unit.
#[derive(Default)]
pub struct MemoryQueue {
    inner: Mutex<MemoryQueueInner>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BatchQueue for MemoryQueue {
    async fn submit_batches(&self, batches: &[QueuedBatch]) -> Result<(), QueueError> {
        let mut inner = self.inner.lock().await;
        inner.waiting.extend(batches.iter().cloned());
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<QueuedBatch>, QueueError> {
        let mut inner = self.inner.lock().await;
        match inner.waiting.pop_front() {
            Some(batch) => {
                inner.active.push(batch.clone());
                Ok(Some(batch))
            }
            None => Ok(None),
        }
    }

    async fn complete(&self, batch: &QueuedBatch) -> Result<(), QueueError> {
        let mut inner = self.inner.lock().await;
        inner.active.retain(|b| b.batch_id != batch.batch_id);
        inner.completed += 1;
        Ok(())
    }

    async fn retry(&self, batch: &QueuedBatch) -> Result<(), QueueError> {
        let mut inner = self.inner.lock().await;
        inner.active.retain(|b| b.batch_id != batch.batch_id);
        let redelivery = QueuedBatch {
            attempt: batch.attempt + 1,
            ..batch.clone()
        };
        inner.waiting.push_back(redelivery);
        Ok(())
    }

    async fn fail(&self, batch: &QueuedBatch) -> Result<(), QueueError> {
        let mut inner = self.inner.lock().await;
        inner.active.retain(|b| b.batch_id != batch.batch_id);
        inner.failed += 1;
        Ok(())
    }

    async fn stats(&self) -> Result<QueueStats, QueueError> {
        let inner = self.inner.lock().await;
        Ok(QueueStats {
            waiting: inner.waiting.len() as u64,
            active: inner.active.len() as u64,
            completed: inner.completed,
            failed: inner.failed,
        })
    }

    async fn health_check(&self) -> Result<(), QueueError> {
        Ok(())
    }
}

/// A limiter high enough to never block a test.
pub fn unthrottled_limiter() -> Arc<DefaultDirectRateLimiter> {
    Arc::new(RateLimiter::direct(Quota::per_second(
        NonZeroU32::new(100_000).unwrap(),
    )))
}

/// A small RSS feed: two well-formed jobs and one item with no usable
/// external id.
pub fn sample_rss_feed() -> String {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Acme Careers</title>
    <item>
      <guid isPermaLink="false">acme-101</guid>
      <title>Backend Engineer</title>
      <link>https://acme.example/jobs/101</link>
      <company>Acme</company>
      <location>Berlin</location>
      <description><![CDATA[Build <b>reliable</b> services.]]></description>
      <category>engineering</category>
      <pubDate>Tue, 01 Jul 2025 09:00:00 GMT</pubDate>
    </item>
    <item>
      <guid isPermaLink="false">acme-102</guid>
      <title>Data Analyst</title>
      <link>https://acme.example/jobs/102</link>
      <company>Acme</company>
      <location>Remote</location>
      <category>data</category>
    </item>
    <item>
      <title>Ghost Posting</title>
      <description>No guid, id, link, or url anywhere.</description>
    </item>
  </channel>
</rss>
"#
    .to_string()
}
