use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::run_queries;
use crate::models::api::{Paginated, Pagination, RunResponse};

/// GET /api/v1/runs — import history, newest first.
pub async fn list_runs(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Paginated<RunResponse>>, StatusCode> {
    let (limit, offset) = pagination.clamped();

    let runs = run_queries::list_runs(&state.db, limit, offset)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to list runs");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    let total = run_queries::count_runs(&state.db).await.map_err(|e| {
        tracing::error!(error = %e, "failed to count runs");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(Paginated {
        items: runs.into_iter().map(RunResponse::from).collect(),
        total,
        limit,
        offset,
    }))
}

/// GET /api/v1/runs/:run_id — one run with its full failure list.
pub async fn get_run(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<RunResponse>, StatusCode> {
    let run = run_queries::get_run(&state.db, run_id)
        .await
        .map_err(|e| {
            tracing::error!(run_id = %run_id, error = %e, "failed to load run");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(RunResponse::from(run)))
}

#[derive(Debug, Deserialize)]
pub struct StaleQuery {
    /// Override for the configured staleness window.
    pub minutes: Option<i64>,
}

/// GET /api/v1/runs/stale — reconciliation check: unfinished runs older than
/// the staleness window. A run stuck here was abandoned mid-flight (process
/// restart, permanently failed batch) and its counters must not be trusted.
pub async fn stale_runs(
    State(state): State<AppState>,
    Query(query): Query<StaleQuery>,
) -> Result<Json<Vec<RunResponse>>, StatusCode> {
    let minutes = query
        .minutes
        .unwrap_or(state.config.stale_run_minutes)
        .max(1);

    let runs = run_queries::stale_runs(&state.db, minutes)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to scan for stale runs");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(runs.into_iter().map(RunResponse::from).collect()))
}
