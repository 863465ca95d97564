//! pkgdepot job daemon.
//!
//! Wires the job orchestration core together: configuration, database pool,
//! migrations, the orchestration service, the handler registry, the runner
//! pool, and the retention sweep schedule. Job-type handlers from the
//! surrounding package-repository service register into the same registry
//! before the pool starts.

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{fmt, EnvFilter};

use depot_core::config::AppConfig;
use depot_jobs::JobService;
use depot_worker::jobs::GarbageCollectJobHandler;
use depot_worker::{HandlerRegistry, RunnerPool, SweepScheduler};

#[tokio::main]
async fn main() {
    let env = std::env::var("DEPOT_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Daemon error: {e:#}");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).init();
        }
    }
}

/// Main daemon run function
async fn run(config: AppConfig) -> anyhow::Result<()> {
    tracing::info!("Starting depot-jobd v{}", env!("CARGO_PKG_VERSION"));

    let db = depot_database::DatabasePool::connect(&config.database).await?;
    depot_database::migration::run_migrations(db.pool()).await?;

    let service = Arc::new(JobService::postgres(
        db.pool().clone(),
        &config.storage,
        &config.jobs,
    ));

    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(GarbageCollectJobHandler::new()));
    let registry = Arc::new(registry);

    let scheduler =
        SweepScheduler::start(Arc::clone(&service), &config.jobs.sweep_schedule).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let pool_handle = if config.worker.enabled {
        let pool = RunnerPool::new(Arc::clone(&service), registry, config.worker.clone());
        Some(tokio::spawn(async move { pool.run(shutdown_rx).await }))
    } else {
        tracing::warn!("Runner pool disabled; jobs will queue without executing");
        None
    };

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    shutdown_tx.send(true).ok();
    if let Some(handle) = pool_handle {
        handle.await.ok();
    }

    scheduler.shutdown().await.ok();
    db.close().await;

    tracing::info!("depot-jobd stopped");
    Ok(())
}
