use sqlx::PgPool;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::{fetcher::FeedFetcher, queue::BatchQueue, run_tracker::RunTracker};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub fetcher: Arc<FeedFetcher>,
    pub queue: Arc<dyn BatchQueue>,
    pub tracker: RunTracker,
}

impl AppState {
    pub fn new(
        db: PgPool,
        config: AppConfig,
        fetcher: FeedFetcher,
        queue: Arc<dyn BatchQueue>,
    ) -> Self {
        let tracker = RunTracker::new(db.clone());
        Self {
            db,
            config: Arc::new(config),
            fetcher: Arc::new(fetcher),
            queue,
            tracker,
        }
    }
}
