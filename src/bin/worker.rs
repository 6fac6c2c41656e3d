use governor::{Quota, RateLimiter};
use jobfeed_import::{
    config::AppConfig,
    db,
    services::{
        queue::RedisQueue,
        run_tracker::RunTracker,
        worker::{self, RetryPolicy, WorkerContext},
    },
};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

const POLL_INTERVAL_MS: u64 = 1000; // 1 second

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting jobfeed import worker");

    // Load configuration
    let config = AppConfig::from_env().expect("Failed to load configuration");

    // Initialize database
    tracing::info!("Connecting to PostgreSQL");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Initialize queue
    tracing::info!("Connecting to Redis batch queue");
    let queue = Arc::new(RedisQueue::new(&config.redis_url).expect("Failed to initialize queue"));

    // One limiter shared across the pool: sustained store-write ceiling is
    // independent of worker concurrency.
    let rate = NonZeroU32::new(config.rate_limit_per_sec).expect("rate limit must be > 0");
    let limiter = Arc::new(RateLimiter::direct(Quota::per_second(rate)));

    let concurrency = config.worker_concurrency.max(1);
    tracing::info!(concurrency, "Worker ready, starting batch processing loop");

    let mut pool = JoinSet::new();
    for worker_id in 0..concurrency {
        let ctx = WorkerContext {
            db: db_pool.clone(),
            queue: queue.clone(),
            tracker: RunTracker::new(db_pool.clone()),
            limiter: limiter.clone(),
            retry: RetryPolicy::default(),
        };

        pool.spawn(async move {
            loop {
                match worker::process_next_batch(&ctx).await {
                    Ok(true) => {
                        tracing::debug!(worker_id, "batch processed, checking for next batch");
                    }
                    Ok(false) => {
                        tracing::trace!(worker_id, "no batches available, sleeping");
                        sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
                    }
                    Err(e) => {
                        tracing::error!(worker_id, error = %e, "error processing batch, will retry");
                        sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
                    }
                }
            }
        });
    }

    // Tasks loop forever; exit only if one panics.
    while let Some(result) = pool.join_next().await {
        if let Err(e) = result {
            tracing::error!(error = %e, "worker task exited unexpectedly");
        }
    }
}
