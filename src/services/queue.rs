use async_trait::async_trait;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const QUEUE_KEY: &str = "jobfeed:batches";
const PROCESSING_KEY: &str = "jobfeed:processing";
const COMPLETED_KEY: &str = "jobfeed:completed_count";
const FAILED_KEY: &str = "jobfeed:failed_count";

/// A batch is redelivered at most this many times before it is permanently
/// failed.
pub const MAX_BATCH_ATTEMPTS: u32 = 3;

/// One unit of queued work: a slice of raw feed items tagged with the run
/// they report back to. Items travel unnormalized; the worker owns
/// normalization so validation failures surface as recorded outcomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedBatch {
    pub batch_id: Uuid,
    pub run_id: Uuid,
    /// Feed identity; becomes JobRecord.source for every item in the batch.
    pub source: String,
    /// Delivery attempt, starting at 1.
    pub attempt: u32,
    pub items: Vec<serde_json::Value>,
}

/// Waiting/active/completed/failed unit counts for observability.
#[derive(Debug, Clone, Serialize)]
pub struct QueueStats {
    pub waiting: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Capability interface over the durable batch queue.
///
/// The pipeline only depends on this contract — at-least-once delivery to one
/// worker at a time per unit, independent retry per unit — so the core logic
/// stays queue-implementation-agnostic and tests run against an in-memory
/// fake.
#[async_trait]
pub trait BatchQueue: Send + Sync {
    /// Bulk-submit the batches of one run as independent units of work.
    async fn submit_batches(&self, batches: &[QueuedBatch]) -> Result<(), QueueError>;

    /// Take the next unit for processing; None when the queue is drained.
    async fn dequeue(&self) -> Result<Option<QueuedBatch>, QueueError>;

    /// Acknowledge a fully processed unit.
    async fn complete(&self, batch: &QueuedBatch) -> Result<(), QueueError>;

    /// Put a failed unit back for redelivery with its attempt count bumped.
    async fn retry(&self, batch: &QueuedBatch) -> Result<(), QueueError>;

    /// Permanently fail a unit that exhausted its attempts.
    async fn fail(&self, batch: &QueuedBatch) -> Result<(), QueueError>;

    async fn stats(&self) -> Result<QueueStats, QueueError>;

    async fn health_check(&self) -> Result<(), QueueError>;
}

/// Redis-backed queue: waiting list, processing list, counter keys.
pub struct RedisQueue {
    client: redis::Client,
}

impl RedisQueue {
    pub fn new(redis_url: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url).map_err(QueueError::Redis)?;
        Ok(Self { client })
    }

    async fn conn(&self) -> Result<redis::aio::MultiplexedConnection, QueueError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(QueueError::Redis)
    }

    /// Drop a unit from the processing list by its serialized payload.
    async fn remove_processing(&self, batch: &QueuedBatch) -> Result<(), QueueError> {
        let mut conn = self.conn().await?;
        let payload = serde_json::to_string(batch)?;
        conn.lrem::<_, _, ()>(PROCESSING_KEY, 1, &payload)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }
}

#[async_trait]
impl BatchQueue for RedisQueue {
    async fn submit_batches(&self, batches: &[QueuedBatch]) -> Result<(), QueueError> {
        if batches.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn().await?;
        let payloads: Vec<String> = batches
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<_, _>>()?;
        conn.lpush::<_, _, ()>(QUEUE_KEY, &payloads)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<QueuedBatch>, QueueError> {
        let mut conn = self.conn().await?;
        let result: Option<String> = conn
            .rpoplpush(QUEUE_KEY, PROCESSING_KEY)
            .await
            .map_err(QueueError::Redis)?;

        match result {
            Some(payload) => {
                let batch: QueuedBatch = serde_json::from_str(&payload)?;
                Ok(Some(batch))
            }
            None => Ok(None),
        }
    }

    async fn complete(&self, batch: &QueuedBatch) -> Result<(), QueueError> {
        self.remove_processing(batch).await?;
        let mut conn = self.conn().await?;
        conn.incr::<_, _, ()>(COMPLETED_KEY, 1)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }

    async fn retry(&self, batch: &QueuedBatch) -> Result<(), QueueError> {
        self.remove_processing(batch).await?;
        let redelivery = QueuedBatch {
            attempt: batch.attempt + 1,
            ..batch.clone()
        };
        let mut conn = self.conn().await?;
        let payload = serde_json::to_string(&redelivery)?;
        conn.lpush::<_, _, ()>(QUEUE_KEY, &payload)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }

    async fn fail(&self, batch: &QueuedBatch) -> Result<(), QueueError> {
        self.remove_processing(batch).await?;
        let mut conn = self.conn().await?;
        conn.incr::<_, _, ()>(FAILED_KEY, 1)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }

    async fn stats(&self) -> Result<QueueStats, QueueError> {
        let mut conn = self.conn().await?;
        let waiting: u64 = conn.llen(QUEUE_KEY).await.map_err(QueueError::Redis)?;
        let active: u64 = conn.llen(PROCESSING_KEY).await.map_err(QueueError::Redis)?;
        let completed: Option<u64> = conn.get(COMPLETED_KEY).await.map_err(QueueError::Redis)?;
        let failed: Option<u64> = conn.get(FAILED_KEY).await.map_err(QueueError::Redis)?;

        Ok(QueueStats {
            waiting,
            active,
            completed: completed.unwrap_or(0),
            failed: failed.unwrap_or(0),
        })
    }

    async fn health_check(&self) -> Result<(), QueueError> {
        let mut conn = self.conn().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }
}
