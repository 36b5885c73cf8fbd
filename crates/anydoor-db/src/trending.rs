//! Search-event dedup and the trending counter table.
//!
//! `user_search_logs` carries a `UNIQUE (path, user_hash, day)` constraint and
//! that constraint, not an application-level lookup, decides whether a visit
//! counts. [`record_search`] attempts the insert first and only touches the
//! counter when the insert produced a row.

use anydoor_core::{
    category_filter, clamp_trending_limit, RecordOutcome, DEFAULT_LOG_CATEGORY,
    DEFAULT_TRENDING_CATEGORY,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::DbError;

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct TrendingRow {
    pub path: String,
    pub category: String,
    pub count: i64,
    pub updated_at: DateTime<Utc>,
}

/// One search to record. `user_hash` is the opaque identity key from
/// [`anydoor_core::identity_hash`]; `client_ip` and `user_agent` only go to
/// the raw search log.
#[derive(Debug, Clone, Copy)]
pub struct NewSearchEvent<'a> {
    pub path: &'a str,
    pub category: Option<&'a str>,
    pub user_hash: &'a str,
    pub day: NaiveDate,
    pub client_ip: Option<&'a str>,
    pub user_agent: Option<&'a str>,
}

/// True when the error is a Postgres unique-constraint violation.
#[must_use]
pub fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
    )
}

/// Record a search and bump its trending counter, at most once per
/// `(path, user_hash, day)`.
///
/// Runs in a single transaction: the dedup insert, the raw log row, and the
/// counter upsert commit together or not at all. A conflicting insert, either
/// swallowed by `ON CONFLICT DO NOTHING` or raised as a unique violation by a
/// concurrent writer, yields [`RecordOutcome::Duplicate`] and leaves the
/// counter untouched. Never returns [`RecordOutcome::Rejected`]; path
/// validation happens before this call.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on any other database failure.
pub async fn record_search(
    pool: &PgPool,
    event: &NewSearchEvent<'_>,
) -> Result<RecordOutcome, DbError> {
    let mut tx = pool.begin().await?;

    let inserted = sqlx::query_scalar::<_, i64>(
        "INSERT INTO user_search_logs (path, user_hash, day) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (path, user_hash, day) DO NOTHING \
         RETURNING id",
    )
    .bind(event.path)
    .bind(event.user_hash)
    .bind(event.day)
    .fetch_optional(&mut *tx)
    .await;

    let inserted = match inserted {
        Ok(id) => id,
        Err(e) if is_unique_violation(&e) => None,
        Err(e) => return Err(e.into()),
    };

    if inserted.is_none() {
        tx.rollback().await?;
        return Ok(RecordOutcome::Duplicate);
    }

    sqlx::query(
        "INSERT INTO search_records (path, category, user_agent, ip) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(event.path)
    .bind(event.category.unwrap_or(DEFAULT_LOG_CATEGORY))
    .bind(event.user_agent)
    .bind(event.client_ip)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO trending_searches (path, category, count) \
         VALUES ($1, $2, 1) \
         ON CONFLICT (path) DO UPDATE SET \
           count = trending_searches.count + 1, \
           category = EXCLUDED.category, \
           updated_at = NOW()",
    )
    .bind(event.path)
    .bind(event.category.unwrap_or(DEFAULT_TRENDING_CATEGORY))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(RecordOutcome::Accepted)
}

/// Ranked trending paths.
///
/// Only rows with `count > 1` that are not soft-deleted are returned, ordered
/// by count then recency. `limit` is clamped to `0..=TRENDING_MAX_LIMIT`;
/// a `category` of `None`, blank, or `all` disables the category filter.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on database query failure.
pub async fn list_trending(
    pool: &PgPool,
    limit: i64,
    category: Option<&str>,
) -> Result<Vec<TrendingRow>, DbError> {
    let rows = sqlx::query_as::<_, TrendingRow>(
        "SELECT path, category, count, updated_at \
         FROM trending_searches \
         WHERE is_deleted = false \
           AND count > 1 \
           AND ($1::TEXT IS NULL OR category = $1) \
         ORDER BY count DESC, updated_at DESC \
         LIMIT $2",
    )
    .bind(category_filter(category))
    .bind(clamp_trending_limit(Some(limit)))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Hide a path from trending reads without losing its counter.
///
/// Returns `true` if a visible row was hidden.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on database query failure.
pub async fn soft_delete_trending(pool: &PgPool, path: &str) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE trending_searches SET is_deleted = true, updated_at = NOW() \
         WHERE path = $1 AND is_deleted = false",
    )
    .bind(path)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
