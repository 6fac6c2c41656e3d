//! Batch processing: the consumer side of the queue.
//!
//! Each call to [`process_next_batch`] takes one unit from the queue and
//! drives every item in it to a terminal outcome. Item-level failures
//! (validation, exhausted store retries) are recorded on the run and never
//! abort the batch; only bookkeeping failures (the run tracker itself
//! unreachable) fail the batch unit, which the queue redelivers up to its
//! attempt limit.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use governor::DefaultDirectRateLimiter;
use serde_json::Value;
use sqlx::PgPool;

use crate::db::queries;
use crate::models::import_run::ItemOutcome;
use crate::models::job::UpsertOutcome;
use crate::services::external_id::resolve_external_id;
use crate::services::normalizer::{item_field, normalize_item};
use crate::services::queue::{BatchQueue, QueueError, QueuedBatch, MAX_BATCH_ATTEMPTS};
use crate::services::run_tracker::RunTracker;

/// Retry schedule for transient failures, per the queue contract: up to 3
/// attempts spaced 2s, 4s, 8s. Tests inject a zero-delay schedule.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: vec![
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8),
            ],
        }
    }
}

impl RetryPolicy {
    /// Zero-delay schedule for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Vec::new(),
        }
    }

    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let idx = attempt.saturating_sub(1) as usize;
        self.backoff
            .get(idx)
            .or_else(|| self.backoff.last())
            .copied()
            .unwrap_or(Duration::ZERO)
    }
}

/// Everything one worker task needs to process batches.
pub struct WorkerContext {
    pub db: PgPool,
    pub queue: Arc<dyn BatchQueue>,
    pub tracker: RunTracker,
    /// Shared across the pool: caps sustained store writes per second
    /// independently of worker concurrency.
    pub limiter: Arc<DefaultDirectRateLimiter>,
    pub retry: RetryPolicy,
}

/// Take and process the next batch. Returns Ok(false) when the queue is
/// drained and the caller should back off before polling again.
pub async fn process_next_batch(ctx: &WorkerContext) -> Result<bool, QueueError> {
    let batch = match ctx.queue.dequeue().await? {
        Some(batch) => batch,
        None => return Ok(false),
    };

    tracing::info!(
        run_id = %batch.run_id,
        batch_id = %batch.batch_id,
        attempt = batch.attempt,
        items = batch.items.len(),
        "processing batch"
    );

    let start = Instant::now();
    match process_batch(ctx, &batch).await {
        Ok(()) => {
            ctx.queue.complete(&batch).await?;
            metrics::histogram!("import_batch_processing_seconds")
                .record(start.elapsed().as_secs_f64());
            tracing::debug!(batch_id = %batch.batch_id, "batch completed");
        }
        Err(e) => {
            tracing::error!(
                run_id = %batch.run_id,
                batch_id = %batch.batch_id,
                attempt = batch.attempt,
                error = %e,
                "batch processing failed"
            );
            if batch.attempt >= MAX_BATCH_ATTEMPTS {
                ctx.queue.fail(&batch).await?;
                tracing::warn!(
                    batch_id = %batch.batch_id,
                    attempts = batch.attempt,
                    "batch permanently failed; its run will surface via the stale-run check"
                );
            } else {
                tokio::time::sleep(ctx.retry.delay_after(batch.attempt)).await;
                ctx.queue.retry(&batch).await?;
            }
        }
    }

    Ok(true)
}

/// Drive every item in a batch to a recorded outcome, finalizing the run as
/// soon as the last outstanding item anywhere reports.
pub async fn process_batch(ctx: &WorkerContext, batch: &QueuedBatch) -> Result<(), sqlx::Error> {
    for item in &batch.items {
        let outcome = import_item(ctx, &batch.source, item).await;

        match &outcome {
            ItemOutcome::Created => metrics::counter!("import_items_created_total").increment(1),
            ItemOutcome::Updated => metrics::counter!("import_items_updated_total").increment(1),
            ItemOutcome::Failed { reason, .. } => {
                metrics::counter!("import_items_failed_total").increment(1);
                tracing::debug!(run_id = %batch.run_id, reason = %reason, "item failed");
            }
        }

        ctx.tracker.record_outcome(batch.run_id, &outcome).await?;
        if ctx.tracker.finalize_if_complete(batch.run_id).await? {
            metrics::counter!("import_runs_completed_total").increment(1);
            tracing::info!(run_id = %batch.run_id, "run completed");
        }
    }

    Ok(())
}

/// Process one raw item: resolve its id, normalize, upsert with retries.
/// Validation failures never touch the store.
async fn import_item(ctx: &WorkerContext, source: &str, item: &Value) -> ItemOutcome {
    let external_job_id = match resolve_external_id(item) {
        Ok(id) => id,
        Err(e) => {
            return ItemOutcome::Failed {
                external_job_id: fallback_identifier(item),
                reason: e.to_string(),
            };
        }
    };

    let draft = match normalize_item(item) {
        Ok(draft) => draft,
        Err(e) => {
            return ItemOutcome::Failed {
                external_job_id,
                reason: e.to_string(),
            };
        }
    };

    // The rate limit protects the store, so it gates only store-bound items.
    ctx.limiter.until_ready().await;

    let write = || queries::upsert_job(&ctx.db, source, &external_job_id, &draft);
    match upsert_with_retry(&ctx.retry, write).await {
        Ok(UpsertOutcome::Created) => ItemOutcome::Created,
        Ok(UpsertOutcome::Updated) => ItemOutcome::Updated,
        Err(reason) => ItemOutcome::Failed {
            external_job_id,
            reason,
        },
    }
}

/// Best raw identifier for the failure record when id resolution itself
/// failed.
fn fallback_identifier(item: &Value) -> String {
    let title = item_field(item, "title");
    if title.is_empty() {
        "<unidentified item>".to_string()
    } else {
        title
    }
}

/// Run a store write up to `max_attempts` times with the policy's backoff
/// between failures. Exhaustion yields the last error's reason; the item is
/// never silently dropped.
pub async fn upsert_with_retry<F, Fut>(policy: &RetryPolicy, mut write: F) -> Result<UpsertOutcome, String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<UpsertOutcome, sqlx::Error>>,
{
    let mut attempt: u32 = 1;
    loop {
        match write().await {
            Ok(outcome) => return Ok(outcome),
            Err(e) if attempt >= policy.max_attempts => {
                return Err(format!(
                    "store write failed after {} attempts: {}",
                    policy.max_attempts, e
                ));
            }
            Err(e) => {
                tracing::warn!(attempt, error = %e, "store write failed, retrying");
                tokio::time::sleep(policy.delay_after(attempt)).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[tokio::test]
    async fn succeeds_on_third_attempt_within_retry_limit() {
        let policy = RetryPolicy::immediate(3);
        let calls = Cell::new(0u32);

        let result = upsert_with_retry(&policy, || {
            let n = calls.get() + 1;
            calls.set(n);
            async move {
                if n < 3 {
                    Err(sqlx::Error::PoolTimedOut)
                } else {
                    Ok(UpsertOutcome::Created)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(UpsertOutcome::Created));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn exhausting_all_attempts_reports_last_error() {
        let policy = RetryPolicy::immediate(3);
        let calls = Cell::new(0u32);

        let result = upsert_with_retry(&policy, || {
            calls.set(calls.get() + 1);
            async { Err::<UpsertOutcome, _>(sqlx::Error::PoolTimedOut) }
        })
        .await;

        let reason = result.unwrap_err();
        assert!(reason.contains("after 3 attempts"), "got: {reason}");
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn first_try_success_does_not_retry() {
        let policy = RetryPolicy::immediate(3);
        let calls = Cell::new(0u32);

        let result = upsert_with_retry(&policy, || {
            calls.set(calls.get() + 1);
            async { Ok(UpsertOutcome::Updated) }
        })
        .await;

        assert_eq!(result, Ok(UpsertOutcome::Updated));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn default_backoff_schedule_is_2_4_8() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(2), Duration::from_secs(4));
        assert_eq!(policy.delay_after(3), Duration::from_secs(8));
        // Past the schedule end, the last delay holds.
        assert_eq!(policy.delay_after(9), Duration::from_secs(8));
    }
}
