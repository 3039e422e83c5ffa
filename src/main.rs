//! Rondo pool supervisor - Entry Point
//!
//! Loads the endpoint list, builds the pool, runs the optional health
//! probe, and logs a status summary until shut down. The HTTP layer that
//! serves scrape requests hosts the same pool through the library API.

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod models;
mod pool;

use config::Config;
use pool::probe::{HealthProbe, ProbeHandle};
use pool::registry::Registry;
use pool::EndpointPool;

const STATUS_LOG_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> error::Result<()> {
    init_tracing();

    info!("Starting Rondo pool supervisor");

    let config = Config::from_env()?;
    info!("Configuration loaded");

    let registry = Registry::load(&config.registry)?;
    let pool = Arc::new(EndpointPool::new(registry, config.pool.clone())?);
    info!(
        strategy = %pool.default_strategy(),
        "Pool ready with {} endpoints",
        pool.status().total_endpoints
    );

    let (probe_handle, probe_shutdown) = ProbeHandle::new();
    let probe_task = if config.probe.enabled {
        let probe = HealthProbe::new(pool.clone(), config.probe.clone());
        Some(tokio::spawn(async move {
            probe.run(probe_shutdown).await;
        }))
    } else {
        info!("Health probe disabled, relying on lazy exclusion expiry");
        None
    };

    let (shutdown_tx, status_shutdown) = watch::channel(false);
    let status_pool = pool.clone();
    let status_task = tokio::spawn(async move {
        status_loop(status_pool, status_shutdown).await;
    });

    shutdown_signal().await;
    info!("Shutdown signal received");

    let _ = shutdown_tx.send(true);
    probe_handle.shutdown();

    if let Some(task) = probe_task {
        let _ = task.await;
    }
    let _ = status_task.await;

    info!("Rondo pool supervisor stopped");
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "rondo=info".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Log a pool summary on an interval until shut down
async fn status_loop(pool: Arc<EndpointPool>, mut shutdown: watch::Receiver<bool>) {
    let mut tick = tokio::time::interval(STATUS_LOG_INTERVAL);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let status = pool.status();
                info!(
                    total = status.total_endpoints,
                    excluded = status.excluded_count,
                    median_success_rate = status.median_success_rate,
                    median_latency_ms = status.median_latency_ms,
                    "pool status"
                );
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
