use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000"). Optional for worker processes.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Redis connection string for the batch queue
    pub redis_url: String,

    /// Feed source URLs, comma-separated (FEED_SOURCES=https://a/rss,https://b/rss)
    #[serde(default)]
    pub feed_sources: Vec<String>,

    /// Timeout for fetching one feed, in milliseconds
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Items per queued batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Number of concurrent batch-processing tasks in the worker
    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,

    /// Sustained item-processing ceiling across the worker pool (items/sec)
    #[serde(default = "default_rate_limit_per_sec")]
    pub rate_limit_per_sec: u32,

    /// Age in minutes after which an unfinished run is reported as stale
    #[serde(default = "default_stale_run_minutes")]
    pub stale_run_minutes: i64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_fetch_timeout_ms() -> u64 {
    30_000
}

fn default_batch_size() -> usize {
    100
}

fn default_worker_concurrency() -> usize {
    10
}

fn default_rate_limit_per_sec() -> u32 {
    100
}

fn default_stale_run_minutes() -> i64 {
    60
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}
