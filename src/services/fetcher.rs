use std::time::Duration;

/// Error type for feed retrieval. Fatal to the run for that source only.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("feed returned HTTP {0}")]
    Status(reqwest::StatusCode),
}

/// HTTP client for retrieving raw feed bytes.
pub struct FeedFetcher {
    http: reqwest::Client,
    timeout_ms: u64,
}

impl FeedFetcher {
    pub fn new(timeout_ms: u64) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent("jobfeed-import/0.1 (+https://github.com/jobfeed/jobfeed-import)")
            .timeout(Duration::from_millis(timeout_ms))
            .build()?;

        Ok(Self { http, timeout_ms })
    }

    /// Fetch one feed as text. Timeouts are reported distinctly so the run
    /// record names the failure mode.
    pub async fn fetch_raw(&self, source_url: &str) -> Result<String, FetchError> {
        let response = self.http.get(source_url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout_ms)
            } else {
                FetchError::Network(e)
            }
        })?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout_ms)
            } else {
                FetchError::Network(e)
            }
        })
    }
}
