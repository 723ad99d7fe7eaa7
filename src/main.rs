//! VisitPoint Server — venue check-in and points engine
//!
//! Main entry point that wires all crates together, starts the background
//! worker and runs the operator console.

mod console;

use std::sync::Arc;

use tokio::sync::watch;
use tracing;
use tracing_subscriber::{EnvFilter, fmt};

use visitpoint_cache::CacheManager;
use visitpoint_core::config::AppConfig;
use visitpoint_core::error::AppError;
use visitpoint_core::traits::clock::SystemClock;
use visitpoint_core::traits::identity::FixedIdentity;
use visitpoint_engine::CheckinEngine;
use visitpoint_storage::Stores;
use visitpoint_worker::jobs::{AutoCloseJobHandler, ReplayPruneJobHandler};
use visitpoint_worker::{CronScheduler, JobExecutor, JobQueue, WorkerRunner};

use console::Console;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let config_path =
        std::env::var("VISITPOINT_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());

    let env = std::env::var("VISITPOINT_ENV").unwrap_or_else(|_| "development".to_string());

    AppConfig::load(&config_path, &env)
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
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting VisitPoint v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Initialize cache ─────────────────────────────────
    tracing::info!(
        "Initializing cache (provider: {})...",
        config.cache.provider
    );
    let cache = CacheManager::new(&config.cache)?;

    // ── Step 2: Persistence and identity ─────────────────────────
    let stores = Stores::in_memory();
    let identity = Arc::new(FixedIdentity::default());

    // ── Step 3: Engine ───────────────────────────────────────────
    let engine = Arc::new(CheckinEngine::new(
        &config,
        stores,
        cache,
        Arc::new(SystemClock),
        identity.clone(),
    ));
    tracing::info!(
        "Engine ready (code window {}s, max session {}h, {} venue overrides)",
        config.scan.validity_window_seconds,
        config.session.max_duration_hours,
        config.rules.venues.len()
    );

    // ── Step 4: Shutdown channel ─────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Step 5: Start background worker ──────────────────────────
    let worker = if config.worker.enabled {
        tracing::info!("Starting background worker...");

        let worker_id = format!("worker-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]);
        let job_queue = Arc::new(JobQueue::new(config.worker.queue_capacity));

        let mut job_executor = JobExecutor::new();
        job_executor.register(Arc::new(AutoCloseJobHandler::new(Arc::clone(&engine))));
        job_executor.register(Arc::new(ReplayPruneJobHandler::new(Arc::clone(&engine))));

        let worker_runner = WorkerRunner::new(
            Arc::clone(&job_queue),
            Arc::new(job_executor),
            config.worker.concurrency,
            worker_id,
        );

        let scheduler = CronScheduler::new(Arc::clone(&job_queue)).await?;
        scheduler.register_defaults(&config.worker).await?;
        scheduler.start().await?;

        let worker_cancel = shutdown_rx.clone();
        let handle = tokio::spawn(async move {
            worker_runner.run(worker_cancel).await;
        });

        tracing::info!("Background worker started");
        Some((scheduler, handle))
    } else {
        tracing::info!("Background worker disabled");
        None
    };

    // ── Step 6: Operator console until EOF or signal ─────────────
    let console = Console::new(Arc::clone(&engine), identity);
    tokio::select! {
        result = console.run() => {
            if let Err(e) = result {
                tracing::error!("Console error: {}", e);
            }
            tracing::info!("Console closed, starting graceful shutdown...");
        }
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received, starting graceful shutdown...");
        }
    }
    let _ = shutdown_tx.send(true);

    // ── Step 7: Wait for background tasks ────────────────────────
    if let Some((scheduler, handle)) = worker {
        if let Err(e) = scheduler.shutdown().await {
            tracing::warn!("Scheduler shutdown failed: {}", e);
        }
        tracing::info!("Waiting for background tasks to complete...");
        let _ = tokio::time::timeout(std::time::Duration::from_secs(30), handle).await;
    }

    let unsettled = engine.unsettled_sessions();
    if !unsettled.is_empty() {
        tracing::warn!(
            "{} sessions still have unsettled awards at shutdown",
            unsettled.len()
        );
    }

    tracing::info!("VisitPoint shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
