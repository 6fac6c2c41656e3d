use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::app_state::AppState;
use crate::db::{queries, run_queries};
use crate::models::api::StatsResponse;

/// GET /api/v1/stats — aggregate counters plus a queue snapshot for the
/// admin dashboard.
pub async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, StatusCode> {
    let aggregates = run_queries::run_aggregates(&state.db).await.map_err(|e| {
        tracing::error!(error = %e, "failed to aggregate runs");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let total_jobs = queries::count_jobs(&state.db, &Default::default())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to count jobs");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let queue = state.queue.stats().await.map_err(|e| {
        tracing::error!(error = %e, "failed to read queue stats");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    metrics::gauge!("import_queue_depth").set(queue.waiting as f64);

    Ok(Json(StatsResponse {
        total_jobs,
        total_runs: aggregates.total_runs,
        completed_runs: aggregates.completed_runs,
        failed_runs: aggregates.failed_runs,
        active_runs: aggregates.active_runs,
        total_new_jobs: aggregates.total_new_jobs,
        total_updated_jobs: aggregates.total_updated_jobs,
        total_failed_items: aggregates.total_failed_items,
        queue,
    }))
}
