//! `db` subcommand handlers.

use anydoor_db::{PoolConfig, RetentionPolicy};
use sqlx::PgPool;

/// Connect using the pool settings from `config`.
///
/// # Errors
///
/// Returns an error if the database cannot be reached.
pub(crate) async fn connect(config: &anydoor_core::AppConfig) -> anyhow::Result<PgPool> {
    let pool =
        anydoor_db::connect_pool(&config.database_url, PoolConfig::from_app_config(config))
            .await?;
    Ok(pool)
}

pub(crate) async fn run_db_ping(pool: &PgPool) -> anyhow::Result<()> {
    anydoor_db::health_check(pool).await?;
    println!("database ok");
    Ok(())
}

pub(crate) async fn run_db_migrate(pool: &PgPool) -> anyhow::Result<()> {
    let applied = anydoor_db::run_migrations(pool).await?;
    tracing::info!(applied, "migrations complete");
    println!("applied {applied} migration(s)");
    Ok(())
}

/// Seed the starter trending rows. Migrations run first so a fresh database
/// can be seeded in one step.
pub(crate) async fn run_db_seed(pool: &PgPool) -> anyhow::Result<()> {
    anydoor_db::run_migrations(pool).await?;
    let inserted = anydoor_db::seed_default_trending(pool).await?;
    if inserted == 0 {
        println!("trending table already has data; nothing seeded");
    } else {
        println!("seeded {inserted} trending row(s)");
    }
    Ok(())
}

pub(crate) async fn run_db_cleanup(pool: &PgPool, policy: &RetentionPolicy) -> anyhow::Result<()> {
    let report = anydoor_db::purge_expired(pool, policy).await?;
    tracing::info!(
        search_events = report.search_events,
        search_records = report.search_records,
        event_days = policy.event_days,
        search_log_days = policy.search_log_days,
        "retention sweep complete"
    );
    println!(
        "removed {} search event(s) older than {} day(s) and {} search record(s) older than {} day(s)",
        report.search_events, policy.event_days, report.search_records, policy.search_log_days
    );
    Ok(())
}
