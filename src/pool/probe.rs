//! Active health probing for pool endpoints
//!
//! The pool itself never performs I/O; this prober lives beside it in the
//! hosting process and feeds results back through the ordinary outcome
//! channel. A successful probe therefore clears an exclusion the same way
//! a successful scrape would.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::{interval, timeout};
use tracing::{debug, info, warn};

use crate::models::SharedEndpoint;
use crate::pool::tracker::Outcome;
use crate::pool::EndpointPool;

/// Prober configuration
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Whether to run the prober at all; lazy exclusion expiry alone is
    /// sufficient for correctness.
    pub enabled: bool,
    /// Interval between probe rounds
    pub interval: Duration,
    /// Per-endpoint connect timeout
    pub connect_timeout: Duration,
    /// Concurrent probes per round
    pub workers: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            workers: 8,
        }
    }
}

/// Periodic TCP-connect prober over the pool's proxy endpoints
pub struct HealthProbe {
    pool: Arc<EndpointPool>,
    config: ProbeConfig,
}

impl HealthProbe {
    pub fn new(pool: Arc<EndpointPool>, config: ProbeConfig) -> Self {
        Self { pool, config }
    }

    /// Run the prober (call in a spawned task)
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            workers = self.config.workers,
            "starting health probe"
        );

        let mut tick = interval(self.config.interval);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    self.probe_round().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("health probe shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Probe every proxy endpoint once; the direct sentinel has nothing to
    /// connect to and is skipped.
    pub async fn probe_round(&self) {
        let targets: Vec<SharedEndpoint> = self
            .pool
            .registry()
            .iter()
            .filter(|e| !e.is_direct())
            .cloned()
            .collect();

        if targets.is_empty() {
            return;
        }

        let workers = self.config.workers.max(1);
        let results = futures::stream::iter(targets)
            .map(|endpoint| async move {
                let healthy = self.probe_endpoint(&endpoint).await;
                (endpoint, healthy)
            })
            .buffer_unordered(workers)
            .collect::<Vec<_>>()
            .await;

        let mut healthy_count = 0;
        for (endpoint, healthy) in &results {
            if let Err(e) = self.pool.tracker().record(
                endpoint.id(),
                if healthy.is_some() {
                    Outcome::Success
                } else {
                    Outcome::Failure
                },
                healthy.unwrap_or(Duration::ZERO),
            ) {
                warn!(endpoint = %endpoint, "failed to record probe result: {}", e);
            }
            if healthy.is_some() {
                healthy_count += 1;
            }
        }

        info!(
            healthy = healthy_count,
            unhealthy = results.len() - healthy_count,
            "probe round complete"
        );
    }

    /// Returns the connect latency on success, `None` on failure
    async fn probe_endpoint(&self, endpoint: &SharedEndpoint) -> Option<Duration> {
        let (host, port) = endpoint.socket_addr()?;
        let start = Instant::now();

        match timeout(self.config.connect_timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(_stream)) => {
                let elapsed = start.elapsed();
                debug!(endpoint = %endpoint, latency_ms = elapsed.as_millis() as u64, "probe ok");
                Some(elapsed)
            }
            Ok(Err(e)) => {
                debug!(endpoint = %endpoint, "probe connect failed: {}", e);
                None
            }
            Err(_) => {
                debug!(endpoint = %endpoint, "probe timed out");
                None
            }
        }
    }
}

/// Guard for managing the prober's lifecycle
pub struct ProbeHandle {
    shutdown_tx: watch::Sender<bool>,
}

impl ProbeHandle {
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { shutdown_tx: tx }, rx)
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl Default for ProbeHandle {
    fn default() -> Self {
        Self::new().0
    }
}
