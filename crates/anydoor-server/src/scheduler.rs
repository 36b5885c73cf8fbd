//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the daily
//! retention sweep.

use std::sync::Arc;

use anydoor_db::RetentionPolicy;
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down all scheduled jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, the
/// retention cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    config: Arc<anydoor_core::AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_retention_job(&scheduler, pool, &config).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the retention sweep on `ANYDOOR_RETENTION_CRON` (default daily
/// at 03:30 UTC). Trending counters are never touched.
async fn register_retention_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: &anydoor_core::AppConfig,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);
    let policy = RetentionPolicy::from_app_config(config);
    tracing::info!(
        cron = %config.retention_cron,
        event_days = policy.event_days,
        search_log_days = policy.search_log_days,
        "scheduler: registering retention sweep"
    );

    let job = Job::new_async(config.retention_cron.as_str(), move |_uuid, _lock| {
        let pool = Arc::clone(&pool);

        Box::pin(async move {
            tracing::info!("scheduler: starting retention sweep");
            run_retention_job(&pool, &policy).await;
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

async fn run_retention_job(pool: &PgPool, policy: &RetentionPolicy) {
    match anydoor_db::purge_expired(pool, policy).await {
        Ok(report) => tracing::info!(
            search_events = report.search_events,
            search_records = report.search_records,
            "scheduler: retention sweep complete"
        ),
        Err(e) => tracing::error!(error = %e, "scheduler: retention sweep failed"),
    }
}
