mod classify;
mod db;
mod generate;
mod trending;

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::trending::TrendingCommands;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) anydoor-cli";

#[derive(Debug, Parser)]
#[command(name = "anydoor-cli")]
#[command(about = "Any Door command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Show the gateway verdict for a path and user-agent
    Classify {
        /// Request path, as it would appear in the URL
        path: String,
        /// User-agent header to classify; omit to test the missing-agent rule
        #[arg(long)]
        user_agent: Option<String>,
        /// YAML file replacing the built-in rule lists
        #[arg(long, env = "ANYDOOR_RULES_PATH")]
        rules: Option<PathBuf>,
    },
    /// Inspect and curate trending paths
    Trending {
        #[command(subcommand)]
        command: TrendingCommands,
    },
    /// Stream a generated page from a running server
    Generate {
        /// Path to generate
        path: String,
        /// Base URL of a running anydoor-server
        #[arg(long, env = "ANYDOOR_SERVER_URL", default_value = "http://localhost:3000")]
        server: String,
        /// User-agent sent with the generation request
        #[arg(long, default_value = DEFAULT_USER_AGENT)]
        user_agent: String,
        /// Fail if the upstream sends nothing for this many seconds
        #[arg(long)]
        idle_timeout_secs: Option<u64>,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check that the database is reachable
    Ping,
    /// Apply pending migrations
    Migrate,
    /// Populate an empty trending table with starter rows
    Seed,
    /// Delete search events and raw search logs past their retention window
    Cleanup {
        /// Override the configured search-event retention, in days
        #[arg(long)]
        event_days: Option<u32>,
        /// Override the configured raw search-log retention, in days
        #[arg(long)]
        search_log_days: Option<u32>,
    },
}

fn init_tracing() -> anyhow::Result<()> {
    let fallback = std::env::var("ANYDOOR_LOG_LEVEL").unwrap_or_else(|_| "warn".to_string());
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(fallback))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Db { command }) => {
            let config = anydoor_core::load_app_config()?;
            let pool = db::connect(&config).await?;
            match command {
                DbCommands::Ping => db::run_db_ping(&pool).await?,
                DbCommands::Migrate => db::run_db_migrate(&pool).await?,
                DbCommands::Seed => db::run_db_seed(&pool).await?,
                DbCommands::Cleanup {
                    event_days,
                    search_log_days,
                } => {
                    let mut policy = anydoor_db::RetentionPolicy::from_app_config(&config);
                    if let Some(days) = event_days {
                        policy.event_days = days;
                    }
                    if let Some(days) = search_log_days {
                        policy.search_log_days = days;
                    }
                    db::run_db_cleanup(&pool, &policy).await?;
                }
            }
        }
        Some(Commands::Classify {
            path,
            user_agent,
            rules,
        }) => classify::run_classify(&path, user_agent.as_deref(), rules.as_deref())?,
        Some(Commands::Trending { command }) => {
            let config = anydoor_core::load_app_config()?;
            let pool = db::connect(&config).await?;
            trending::run_trending(&pool, command).await?;
        }
        Some(Commands::Generate {
            path,
            server,
            user_agent,
            idle_timeout_secs,
        }) => {
            generate::run_generate(
                &server,
                &path,
                &user_agent,
                idle_timeout_secs.map(std::time::Duration::from_secs),
            )
            .await?;
        }
        None => Cli::command().print_help()?,
    }

    Ok(())
}
