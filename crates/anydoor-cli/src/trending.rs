//! `trending` subcommand handlers.

use anydoor_core::TRENDING_DEFAULT_LIMIT;
use clap::Subcommand;
use sqlx::PgPool;

/// Sub-commands available under `trending`.
#[derive(Debug, Subcommand)]
pub enum TrendingCommands {
    /// Show the current trending paths, as the read endpoint returns them
    List {
        /// Maximum number of rows (capped at 20)
        #[arg(long, default_value_t = TRENDING_DEFAULT_LIMIT)]
        limit: i64,
        /// Restrict to one category; `all` disables the filter
        #[arg(long)]
        category: Option<String>,
    },
    /// Hide a path from trending results without resetting its count
    Hide {
        /// Path exactly as stored
        path: String,
    },
}

pub(crate) async fn run_trending(pool: &PgPool, command: TrendingCommands) -> anyhow::Result<()> {
    match command {
        TrendingCommands::List { limit, category } => {
            let lines = trending_table(pool, limit, category.as_deref()).await?;
            for line in lines {
                println!("{line}");
            }
        }
        TrendingCommands::Hide { path } => {
            if run_trending_hide(pool, &path).await? {
                println!("hidden: {path}");
            } else {
                anyhow::bail!("no visible trending row for '{path}'");
            }
        }
    }
    Ok(())
}

/// Render trending rows as fixed-width lines, header first.
async fn trending_table(
    pool: &PgPool,
    limit: i64,
    category: Option<&str>,
) -> anyhow::Result<Vec<String>> {
    let rows = anydoor_db::list_trending(pool, limit, category).await?;
    if rows.is_empty() {
        return Ok(vec![format!(
            "no trending paths{}; try `db seed` on a fresh database",
            category
                .map(|c| format!(" in category {c}"))
                .unwrap_or_default()
        )]);
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(format!(
        "{:>6}  {:<14}{:<18}PATH",
        "COUNT", "CATEGORY", "UPDATED"
    ));
    for row in &rows {
        lines.push(format!(
            "{:>6}  {:<14}{:<18}{}",
            row.count,
            row.category,
            row.updated_at.format("%Y-%m-%d %H:%M"),
            row.path
        ));
    }
    Ok(lines)
}

async fn run_trending_hide(pool: &PgPool, path: &str) -> anyhow::Result<bool> {
    let hidden = anydoor_db::soft_delete_trending(pool, path).await?;
    if hidden {
        tracing::info!(path, "trending path hidden");
    }
    Ok(hidden)
}
