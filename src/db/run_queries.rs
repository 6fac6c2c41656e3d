use chrono::Utc;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::import_run::{FailedJob, ImportRun, ItemOutcome, RunStatus};

fn run_from_row(row: &sqlx::postgres::PgRow) -> Result<ImportRun, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let failed_jobs: serde_json::Value = row.try_get("failed_jobs")?;
    let failed_jobs: Vec<FailedJob> = serde_json::from_value(failed_jobs).unwrap_or_default();

    Ok(ImportRun {
        id: row.try_get("id")?,
        source_url: row.try_get("source_url")?,
        started_at: row.try_get("started_at")?,
        finished_at: row.try_get("finished_at")?,
        total_fetched: row.try_get("total_fetched")?,
        new_jobs: row.try_get("new_jobs")?,
        updated_jobs: row.try_get("updated_jobs")?,
        failed_jobs_count: row.try_get("failed_jobs_count")?,
        failed_jobs,
        error: row.try_get("error")?,
        status: status.parse().unwrap_or(RunStatus::Pending),
    })
}

const RUN_COLUMNS: &str = "id, source_url, started_at, finished_at, total_fetched, \
                           new_jobs, updated_jobs, failed_jobs_count, failed_jobs, error, status";

/// Insert a new run in 'pending' before any network I/O for its source.
pub async fn create_run(pool: &PgPool, source_url: &str) -> Result<ImportRun, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO import_runs (source_url, status)
        VALUES ($1, 'pending')
        RETURNING {RUN_COLUMNS}
        "#,
    ))
    .bind(source_url)
    .fetch_one(pool)
    .await?;

    run_from_row(&row)
}

/// Record how many items the fetch+parse stage produced. Set once per run.
pub async fn record_fetched(pool: &PgPool, run_id: Uuid, total: i32) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE import_runs
        SET total_fetched = $2
        WHERE id = $1 AND total_fetched IS NULL
        "#,
    )
    .bind(run_id)
    .bind(total)
    .execute(pool)
    .await?;

    Ok(())
}

/// pending -> processing, once batches have been dispatched.
pub async fn mark_processing(pool: &PgPool, run_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE import_runs
        SET status = 'processing'
        WHERE id = $1 AND status = 'pending'
        "#,
    )
    .bind(run_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Apply one item outcome to the run counters. Each arm is a single UPDATE
/// statement so concurrent workers never lose increments; the failed arm
/// appends the failure entry and bumps the count in the same statement,
/// keeping failed_jobs_count == len(failed_jobs) at all times.
pub async fn record_outcome(
    pool: &PgPool,
    run_id: Uuid,
    outcome: &ItemOutcome,
) -> Result<(), sqlx::Error> {
    match outcome {
        ItemOutcome::Created => {
            sqlx::query("UPDATE import_runs SET new_jobs = new_jobs + 1 WHERE id = $1")
                .bind(run_id)
                .execute(pool)
                .await?;
        }
        ItemOutcome::Updated => {
            sqlx::query("UPDATE import_runs SET updated_jobs = updated_jobs + 1 WHERE id = $1")
                .bind(run_id)
                .execute(pool)
                .await?;
        }
        ItemOutcome::Failed {
            external_job_id,
            reason,
        } => {
            let entry = serde_json::to_value(FailedJob {
                external_job_id: external_job_id.clone(),
                reason: reason.clone(),
                timestamp: Utc::now(),
            })
            .unwrap_or(serde_json::Value::Null);

            sqlx::query(
                r#"
                UPDATE import_runs
                SET failed_jobs_count = failed_jobs_count + 1,
                    failed_jobs = failed_jobs || $2::jsonb
                WHERE id = $1
                "#,
            )
            .bind(run_id)
            .bind(entry)
            .execute(pool)
            .await?;
        }
    }

    Ok(())
}

/// Complete the run once every fetched item has a recorded outcome. The WHERE
/// clause is the whole gate: safe to call concurrently from every worker, and
/// at most one caller ever flips the row. Returns true for that caller.
pub async fn finalize_if_complete(pool: &PgPool, run_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE import_runs
        SET status = 'completed', finished_at = NOW()
        WHERE id = $1
          AND finished_at IS NULL
          AND total_fetched IS NOT NULL
          AND new_jobs + updated_jobs + failed_jobs_count >= total_fetched
        "#,
    )
    .bind(run_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Fatal fetch/parse path: short-circuit the run to 'failed' with the error
/// recorded. No-op if the run already finished.
pub async fn fail_run(pool: &PgPool, run_id: Uuid, error: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE import_runs
        SET status = 'failed', error = $2, finished_at = NOW()
        WHERE id = $1 AND finished_at IS NULL
        "#,
    )
    .bind(run_id)
    .bind(error)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_run(pool: &PgPool, run_id: Uuid) -> Result<Option<ImportRun>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "SELECT {RUN_COLUMNS} FROM import_runs WHERE id = $1"
    ))
    .bind(run_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(run_from_row).transpose()
}

pub async fn list_runs(
    pool: &PgPool,
    limit: i64,
    offset: i64,
) -> Result<Vec<ImportRun>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {RUN_COLUMNS}
        FROM import_runs
        ORDER BY started_at DESC
        LIMIT $1 OFFSET $2
        "#,
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    rows.iter().map(run_from_row).collect()
}

pub async fn count_runs(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row = sqlx::query("SELECT COUNT(*) AS count FROM import_runs")
        .fetch_one(pool)
        .await?;
    row.try_get("count")
}

/// Unfinished runs older than the staleness window. These are reported, not
/// repaired: a run abandoned by a process restart stays 'processing' forever.
pub async fn stale_runs(
    pool: &PgPool,
    older_than_minutes: i64,
) -> Result<Vec<ImportRun>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {RUN_COLUMNS}
        FROM import_runs
        WHERE finished_at IS NULL
          AND started_at < NOW() - ($1 * INTERVAL '1 minute')
        ORDER BY started_at ASC
        "#,
    ))
    .bind(older_than_minutes)
    .fetch_all(pool)
    .await?;

    rows.iter().map(run_from_row).collect()
}

pub struct RunAggregates {
    pub total_runs: i64,
    pub completed_runs: i64,
    pub failed_runs: i64,
    pub active_runs: i64,
    pub total_new_jobs: i64,
    pub total_updated_jobs: i64,
    pub total_failed_items: i64,
}

pub async fn run_aggregates(pool: &PgPool) -> Result<RunAggregates, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) AS total_runs,
               COUNT(*) FILTER (WHERE status = 'completed') AS completed_runs,
               COUNT(*) FILTER (WHERE status = 'failed') AS failed_runs,
               COUNT(*) FILTER (WHERE status IN ('pending', 'processing')) AS active_runs,
               COALESCE(SUM(new_jobs), 0)::BIGINT AS total_new_jobs,
               COALESCE(SUM(updated_jobs), 0)::BIGINT AS total_updated_jobs,
               COALESCE(SUM(failed_jobs_count), 0)::BIGINT AS total_failed_items
        FROM import_runs
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(RunAggregates {
        total_runs: row.try_get("total_runs")?,
        completed_runs: row.try_get("completed_runs")?,
        failed_runs: row.try_get("failed_runs")?,
        active_runs: row.try_get("active_runs")?,
        total_new_jobs: row.try_get("total_new_jobs")?,
        total_updated_jobs: row.try_get("total_updated_jobs")?,
        total_failed_items: row.try_get("total_failed_items")?,
    })
}
