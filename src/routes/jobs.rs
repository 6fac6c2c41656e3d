use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::app_state::AppState;
use crate::db::queries;
use crate::models::api::{JobFilter, Paginated, Pagination};
use crate::models::job::JobRecord;

/// GET /api/v1/jobs — catalog read with source/company/location/category
/// filters.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
    Query(filter): Query<JobFilter>,
) -> Result<Json<Paginated<JobRecord>>, StatusCode> {
    let (limit, offset) = pagination.clamped();

    let jobs = queries::list_jobs(&state.db, &filter, limit, offset)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to list jobs");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    let total = queries::count_jobs(&state.db, &filter).await.map_err(|e| {
        tracing::error!(error = %e, "failed to count jobs");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(Paginated {
        items: jobs,
        total,
        limit,
        offset,
    }))
}
