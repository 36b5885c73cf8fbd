//! Retention sweep for the dedup and raw search-log tables.
//!
//! `trending_searches` is never touched here; counters only grow.

use anydoor_core::AppConfig;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Days of `user_search_logs` to keep.
    pub event_days: u32,
    /// Days of `search_records` to keep.
    pub search_log_days: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            event_days: 30,
            search_log_days: 90,
        }
    }
}

impl RetentionPolicy {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            event_days: config.event_retention_days,
            search_log_days: config.search_log_retention_days,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub search_events: u64,
    pub search_records: u64,
}

/// Delete search events and raw search records older than the policy windows.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on database failure.
pub async fn purge_expired(pool: &PgPool, policy: &RetentionPolicy) -> Result<PurgeReport, DbError> {
    purge_expired_as_of(pool, policy, Utc::now()).await
}

/// Same as [`purge_expired`] with an explicit clock.
///
/// Events dated strictly before `now - event_days` (as a UTC calendar day) and
/// records created strictly before `now - search_log_days` are removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on database failure.
pub async fn purge_expired_as_of(
    pool: &PgPool,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> Result<PurgeReport, DbError> {
    let event_cutoff = (now - Duration::days(i64::from(policy.event_days))).date_naive();
    let record_cutoff = now - Duration::days(i64::from(policy.search_log_days));

    let search_events = sqlx::query("DELETE FROM user_search_logs WHERE day < $1")
        .bind(event_cutoff)
        .execute(pool)
        .await?
        .rows_affected();

    let search_records = sqlx::query("DELETE FROM search_records WHERE created_at < $1")
        .bind(record_cutoff)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(PurgeReport {
        search_events,
        search_records,
    })
}
