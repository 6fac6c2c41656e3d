use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;

use crate::app_state::AppState;
use crate::models::api::{ImportRequest, ImportResponse, TriggeredRun};
use crate::services::importer;

/// POST /api/v1/import — manually trigger an import.
///
/// With a source_url in the body, imports that single feed; with an empty
/// body, imports every configured source. Responds once all runs are
/// dispatched (or recorded as failed); workers finish them asynchronously.
pub async fn trigger_import(
    State(state): State<AppState>,
    body: Option<Json<ImportRequest>>,
) -> Result<(StatusCode, Json<ImportResponse>), StatusCode> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    request.validate().map_err(|_| StatusCode::BAD_REQUEST)?;

    let results = match request.source_url {
        Some(source_url) => {
            vec![(
                source_url.clone(),
                importer::import_source(&state, &source_url).await,
            )]
        }
        None => {
            if state.config.feed_sources.is_empty() {
                return Err(StatusCode::UNPROCESSABLE_ENTITY);
            }
            importer::import_all(&state).await
        }
    };

    let runs = results
        .into_iter()
        .map(|(source_url, result)| match result {
            Ok(run_id) => TriggeredRun {
                source_url,
                run_id: Some(run_id),
                error: None,
            },
            Err(e) => TriggeredRun {
                source_url,
                run_id: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    Ok((StatusCode::ACCEPTED, Json(ImportResponse { runs })))
}
