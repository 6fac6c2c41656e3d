use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A job posting in the catalog, deduplicated by (source, external_job_id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub source: String,
    pub external_job_id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub url: String,
    pub category: String,
    pub job_type: String,
    pub region: String,
    pub posted_date: Option<DateTime<Utc>>,
    /// The parsed feed item exactly as received, kept for forensic replay.
    pub raw_payload: serde_json::Value,
    pub imported_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

/// A normalized item ready for upsert; source and external id are attached
/// by the worker from the batch envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDraft {
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub url: String,
    pub category: String,
    pub job_type: String,
    pub region: String,
    pub posted_date: Option<DateTime<Utc>>,
    pub raw_payload: serde_json::Value,
}

/// Whether an upsert inserted a fresh row or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}
