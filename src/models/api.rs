use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::import_run::{FailedJob, ImportRun, RunStatus};
use crate::services::queue::QueueStats;

/// Request to trigger an import. Without a source_url, every configured
/// feed source is imported.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ImportRequest {
    #[garde(inner(length(min = 1, max = 2000)))]
    pub source_url: Option<String>,
}

/// One triggered run, or the reason the trigger itself failed for a source.
#[derive(Debug, Serialize)]
pub struct TriggeredRun {
    pub source_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub runs: Vec<TriggeredRun>,
}

/// Pagination parameters shared by the list endpoints.
#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

impl Pagination {
    pub fn clamped(&self) -> (i64, i64) {
        (self.limit.clamp(1, 200), self.offset.max(0))
    }
}

/// Filters accepted by GET /api/v1/jobs.
#[derive(Debug, Default, Deserialize)]
pub struct JobFilter {
    pub source: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// ImportRun as exposed by the API, with the derived total_imported field.
#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub id: Uuid,
    pub source_url: String,
    pub status: RunStatus,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
    pub total_fetched: Option<i32>,
    pub total_imported: i32,
    pub new_jobs: i32,
    pub updated_jobs: i32,
    pub failed_jobs_count: i32,
    pub failed_jobs: Vec<FailedJob>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<ImportRun> for RunResponse {
    fn from(run: ImportRun) -> Self {
        let total_imported = run.total_imported();
        Self {
            id: run.id,
            source_url: run.source_url,
            status: run.status,
            started_at: run.started_at,
            finished_at: run.finished_at,
            total_fetched: run.total_fetched,
            total_imported,
            new_jobs: run.new_jobs,
            updated_jobs: run.updated_jobs,
            failed_jobs_count: run.failed_jobs_count,
            failed_jobs: run.failed_jobs,
            error: run.error,
        }
    }
}

/// Aggregate counters for the admin dashboard.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_jobs: i64,
    pub total_runs: i64,
    pub completed_runs: i64,
    pub failed_runs: i64,
    pub active_runs: i64,
    pub total_new_jobs: i64,
    pub total_updated_jobs: i64,
    pub total_failed_items: i64,
    pub queue: QueueStats,
}
