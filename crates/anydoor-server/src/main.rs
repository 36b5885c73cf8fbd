mod api;
mod landing;
mod middleware;
mod pages;
mod scheduler;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(anydoor_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let rules = match &config.rules_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading classifier rules");
            anydoor_core::load_rules(path)?
        }
        None => anydoor_core::ClassifierRules::default(),
    };
    let classifier = Arc::new(anydoor_core::Classifier::new(&rules)?);

    let pool_config = anydoor_db::PoolConfig::from_app_config(&config);
    let pool = anydoor_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = anydoor_db::run_migrations(&pool).await?;
    tracing::info!(applied, "database migrations complete");

    let _scheduler = scheduler::build_scheduler(pool.clone(), Arc::clone(&config)).await?;

    let state = AppState::new(pool, classifier, Arc::clone(&config))
        .context("failed to build generation backend client")?;
    if !state.backend.is_configured() {
        tracing::warn!(
            "generation backend is not configured; generation requests will fail with configuration errors"
        );
    }
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "anydoor-server listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
