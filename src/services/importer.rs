//! Per-source import orchestration: create the run, fetch, parse, batch,
//! dispatch. Item-level work happens in the worker; everything here is the
//! fetch stage, and every fatal error lands in the run record instead of
//! propagating to sibling sources.

use tokio::task::JoinSet;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::services::batcher::into_batches;
use crate::services::feed_parser::parse_feed;
use crate::services::queue::QueuedBatch;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// Run bookkeeping itself failed; there is no run record to blame.
    #[error("import run bookkeeping failed: {0}")]
    Db(#[from] sqlx::Error),
}

/// Run the fetch stage for one source and dispatch its batches.
///
/// Returns the run id as soon as batches are submitted (or the run has gone
/// to 'failed'); workers drive the run to completion asynchronously. Fetch
/// and parse failures are recorded on the run, not returned.
pub async fn import_source(state: &AppState, source_url: &str) -> Result<Uuid, ImportError> {
    let run = state.tracker.create(source_url).await?;
    let run_id = run.id;
    metrics::counter!("import_runs_started_total").increment(1);
    tracing::info!(run_id = %run_id, source_url, "import run started");

    let raw = match state.fetcher.fetch_raw(source_url).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(run_id = %run_id, source_url, error = %e, "feed fetch failed");
            state.tracker.fail(run_id, &e.to_string()).await?;
            metrics::counter!("import_runs_failed_total").increment(1);
            return Ok(run_id);
        }
    };

    let items = match parse_feed(&raw) {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(run_id = %run_id, source_url, error = %e, "feed parse failed");
            state.tracker.fail(run_id, &e.to_string()).await?;
            metrics::counter!("import_runs_failed_total").increment(1);
            return Ok(run_id);
        }
    };

    let total = items.len();
    state.tracker.record_fetched(run_id, total as i32).await?;

    if items.is_empty() {
        // Nothing to dispatch; 0 outcomes == 0 fetched, so the run completes.
        state.tracker.finalize_if_complete(run_id).await?;
        tracing::info!(run_id = %run_id, source_url, "feed is empty, run completed");
        return Ok(run_id);
    }

    let batches = match into_batches(items, state.config.batch_size) {
        Ok(batches) => batches,
        Err(e) => {
            state.tracker.fail(run_id, &e.to_string()).await?;
            return Ok(run_id);
        }
    };

    let queued: Vec<QueuedBatch> = batches
        .into_iter()
        .map(|items| QueuedBatch {
            batch_id: Uuid::new_v4(),
            run_id,
            source: source_url.to_string(),
            attempt: 1,
            items,
        })
        .collect();

    if let Err(e) = state.queue.submit_batches(&queued).await {
        tracing::error!(run_id = %run_id, source_url, error = %e, "batch submission failed");
        state
            .tracker
            .fail(run_id, &format!("queue submission failed: {e}"))
            .await?;
        metrics::counter!("import_runs_failed_total").increment(1);
        return Ok(run_id);
    }

    state.tracker.mark_processing(run_id).await?;
    tracing::info!(
        run_id = %run_id,
        source_url,
        items = total,
        batches = queued.len(),
        "run dispatched"
    );

    Ok(run_id)
}

/// Import every configured source concurrently. One source's failure —
/// including a bookkeeping error — never blocks or corrupts another's run.
pub async fn import_all(state: &AppState) -> Vec<(String, Result<Uuid, ImportError>)> {
    let mut tasks = JoinSet::new();
    for source_url in state.config.feed_sources.clone() {
        let state = state.clone();
        tasks.spawn(async move {
            let result = import_source(&state, &source_url).await;
            (source_url, result)
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(entry) => results.push(entry),
            Err(e) => tracing::error!(error = %e, "import task panicked"),
        }
    }
    results
}
