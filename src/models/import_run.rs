use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Lifecycle of an import run: pending -> processing -> {completed, failed}.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// One entry per item that failed during a run, with the reason preserved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailedJob {
    /// Resolved external id, or the best raw identifier available when
    /// resolution itself failed.
    pub external_job_id: String,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

/// Audit record for one execution of the import pipeline against one feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRun {
    pub id: Uuid,
    pub source_url: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Number of items parsed out of the feed; None until the fetch stage
    /// has reported.
    pub total_fetched: Option<i32>,
    pub new_jobs: i32,
    pub updated_jobs: i32,
    pub failed_jobs_count: i32,
    pub failed_jobs: Vec<FailedJob>,
    /// Fatal fetch/parse failure message; None when the run dispatched.
    pub error: Option<String>,
    pub status: RunStatus,
}

impl ImportRun {
    /// new_jobs + updated_jobs, the number of items that reached the catalog.
    pub fn total_imported(&self) -> i32 {
        self.new_jobs + self.updated_jobs
    }
}

/// Terminal result of processing one feed item, reported by the worker.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    Created,
    Updated,
    Failed {
        external_job_id: String,
        reason: String,
    },
}
