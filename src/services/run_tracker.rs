//! Run lifecycle accounting.
//!
//! A run moves pending -> processing -> {completed, failed}. The tracker is a
//! thin facade over single-statement SQL: every counter bump is atomic at the
//! store, and finalization is a conditional UPDATE whose WHERE clause is the
//! gate, so any number of workers may race on it and exactly one wins. The
//! fetch stage owns creation, total_fetched, and the pending -> processing
//! transition; worker callbacks own the counters and the terminal states.
//! Nothing else writes to a run.

use sqlx::PgPool;
use uuid::Uuid;

use crate::db::run_queries;
use crate::models::import_run::{ImportRun, ItemOutcome};

#[derive(Clone)]
pub struct RunTracker {
    pool: PgPool,
}

impl RunTracker {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Allocate a run in 'pending', before any network I/O for its source.
    pub async fn create(&self, source_url: &str) -> Result<ImportRun, sqlx::Error> {
        run_queries::create_run(&self.pool, source_url).await
    }

    /// Record the fetched item count. One outcome per item is expected before
    /// the run can finalize.
    pub async fn record_fetched(&self, run_id: Uuid, total: i32) -> Result<(), sqlx::Error> {
        run_queries::record_fetched(&self.pool, run_id, total).await
    }

    /// pending -> processing, once batches are dispatched.
    pub async fn mark_processing(&self, run_id: Uuid) -> Result<(), sqlx::Error> {
        run_queries::mark_processing(&self.pool, run_id).await
    }

    /// Apply one item outcome; called once per item by workers.
    pub async fn record_outcome(
        &self,
        run_id: Uuid,
        outcome: &ItemOutcome,
    ) -> Result<(), sqlx::Error> {
        run_queries::record_outcome(&self.pool, run_id, outcome).await
    }

    /// Complete the run if every item has reported. Idempotent and safe to
    /// call concurrently; returns true for the single caller that flipped it.
    pub async fn finalize_if_complete(&self, run_id: Uuid) -> Result<bool, sqlx::Error> {
        run_queries::finalize_if_complete(&self.pool, run_id).await
    }

    /// Fatal fetch/parse path: run goes straight to 'failed' with the error
    /// recorded, and no batches are dispatched. Other sources' runs are
    /// untouched.
    pub async fn fail(&self, run_id: Uuid, error: &str) -> Result<(), sqlx::Error> {
        run_queries::fail_run(&self.pool, run_id, error).await
    }
}
