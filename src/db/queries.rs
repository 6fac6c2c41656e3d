use sqlx::{PgPool, Row};

use crate::models::api::JobFilter;
use crate::models::job::{JobDraft, JobRecord, UpsertOutcome};

/// Insert-or-replace a job record keyed by (source, external_job_id).
///
/// A single conditional write: the compound unique constraint arbitrates
/// racing workers, and `xmax = 0` in the RETURNING clause tells us which arm
/// of ON CONFLICT ran without a second round-trip. imported_at survives
/// updates; every other mutable field is overwritten.
pub async fn upsert_job(
    pool: &PgPool,
    source: &str,
    external_job_id: &str,
    draft: &JobDraft,
) -> Result<UpsertOutcome, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO job_records (
            source, external_job_id, title, company, location, description,
            url, category, job_type, region, posted_date, raw_payload
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (source, external_job_id) DO UPDATE
        SET title = EXCLUDED.title,
            company = EXCLUDED.company,
            location = EXCLUDED.location,
            description = EXCLUDED.description,
            url = EXCLUDED.url,
            category = EXCLUDED.category,
            job_type = EXCLUDED.job_type,
            region = EXCLUDED.region,
            posted_date = EXCLUDED.posted_date,
            raw_payload = EXCLUDED.raw_payload,
            last_updated_at = NOW()
        RETURNING (xmax = 0) AS inserted
        "#,
    )
    .bind(source)
    .bind(external_job_id)
    .bind(&draft.title)
    .bind(&draft.company)
    .bind(&draft.location)
    .bind(&draft.description)
    .bind(&draft.url)
    .bind(&draft.category)
    .bind(&draft.job_type)
    .bind(&draft.region)
    .bind(draft.posted_date)
    .bind(&draft.raw_payload)
    .fetch_one(pool)
    .await?;

    let inserted: bool = row.try_get("inserted")?;
    Ok(if inserted {
        UpsertOutcome::Created
    } else {
        UpsertOutcome::Updated
    })
}

fn job_from_row(row: &sqlx::postgres::PgRow) -> Result<JobRecord, sqlx::Error> {
    Ok(JobRecord {
        id: row.try_get("id")?,
        source: row.try_get("source")?,
        external_job_id: row.try_get("external_job_id")?,
        title: row.try_get("title")?,
        company: row.try_get("company")?,
        location: row.try_get("location")?,
        description: row.try_get("description")?,
        url: row.try_get("url")?,
        category: row.try_get("category")?,
        job_type: row.try_get("job_type")?,
        region: row.try_get("region")?,
        posted_date: row.try_get("posted_date")?,
        raw_payload: row.try_get("raw_payload")?,
        imported_at: row.try_get("imported_at")?,
        last_updated_at: row.try_get("last_updated_at")?,
    })
}

pub async fn get_job(
    pool: &PgPool,
    source: &str,
    external_job_id: &str,
) -> Result<Option<JobRecord>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, source, external_job_id, title, company, location, description,
               url, category, job_type, region, posted_date, raw_payload,
               imported_at, last_updated_at
        FROM job_records
        WHERE source = $1 AND external_job_id = $2
        "#,
    )
    .bind(source)
    .bind(external_job_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(job_from_row).transpose()
}

/// Filtered, paginated catalog read for the admin UI.
pub async fn list_jobs(
    pool: &PgPool,
    filter: &JobFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<JobRecord>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, source, external_job_id, title, company, location, description,
               url, category, job_type, region, posted_date, raw_payload,
               imported_at, last_updated_at
        FROM job_records
        WHERE ($1::TEXT IS NULL OR source = $1)
          AND ($2::TEXT IS NULL OR company ILIKE '%' || $2 || '%')
          AND ($3::TEXT IS NULL OR location ILIKE '%' || $3 || '%')
          AND ($4::TEXT IS NULL OR category = $4)
        ORDER BY last_updated_at DESC
        LIMIT $5 OFFSET $6
        "#,
    )
    .bind(&filter.source)
    .bind(&filter.company)
    .bind(&filter.location)
    .bind(&filter.category)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    rows.iter().map(job_from_row).collect()
}

pub async fn count_jobs(pool: &PgPool, filter: &JobFilter) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) AS count
        FROM job_records
        WHERE ($1::TEXT IS NULL OR source = $1)
          AND ($2::TEXT IS NULL OR company ILIKE '%' || $2 || '%')
          AND ($3::TEXT IS NULL OR location ILIKE '%' || $3 || '%')
          AND ($4::TEXT IS NULL OR category = $4)
        "#,
    )
    .bind(&filter.source)
    .bind(&filter.company)
    .bind(&filter.location)
    .bind(&filter.category)
    .fetch_one(pool)
    .await?;

    row.try_get("count")
}
