//! Health and statistics tracking for pool endpoints
//!
//! Pure in-memory bookkeeping: no I/O, no timers. Exclusion expiry is
//! evaluated lazily against the clock passed in by the caller.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::error::{PoolError, Result};
use crate::models::{Endpoint, EndpointId};

/// Request outcome reported back to the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// Tracker tuning knobs
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Consecutive failures before an endpoint is temporarily excluded
    pub failure_threshold: u32,
    /// Exclusion duration at the threshold; doubles with each further failure
    pub backoff_base: Duration,
    /// Upper bound on the exclusion duration
    pub backoff_cap: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            backoff_base: Duration::from_secs(30),
            backoff_cap: Duration::from_secs(30 * 60),
        }
    }
}

/// Mutable per-endpoint counters, owned exclusively by the tracker
#[derive(Debug, Clone)]
struct EndpointStats {
    attempts: u64,
    successes: u64,
    failures: u64,
    consecutive_failures: u32,
    avg_latency: Option<Duration>,
    excluded_until: Option<Instant>,
    last_selected: Option<Instant>,
    last_success: Option<Instant>,
    /// The direct sentinel is never excluded; it is the guaranteed fallback.
    excludable: bool,
}

impl EndpointStats {
    fn new(excludable: bool) -> Self {
        Self {
            attempts: 0,
            successes: 0,
            failures: 0,
            consecutive_failures: 0,
            avg_latency: None,
            excluded_until: None,
            last_selected: None,
            last_success: None,
            excludable,
        }
    }
}

/// Owned copy of one endpoint's stats, handed out by `snapshot`
#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    pub id: EndpointId,
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub consecutive_failures: u32,
    pub avg_latency: Option<Duration>,
    pub excluded_until: Option<Instant>,
    pub last_selected: Option<Instant>,
    pub last_success: Option<Instant>,
}

impl StatsSnapshot {
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.successes as f64 / self.attempts as f64
        }
    }

    pub fn is_excluded(&self, now: Instant) -> bool {
        matches!(self.excluded_until, Some(until) if now < until)
    }
}

/// Concurrency-safe stats tracker, one entry per registered endpoint.
///
/// Entries live in a concurrent map, so records for different endpoints do
/// not contend; two records for the same endpoint serialize on its entry.
pub struct StatsTracker {
    entries: DashMap<EndpointId, EndpointStats>,
    config: TrackerConfig,
}

/// Weight of a new latency sample in the running average
const LATENCY_EWMA_ALPHA: f64 = 0.2;

impl StatsTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
        }
    }

    /// Register an endpoint. Called once per endpoint at pool construction;
    /// re-registering an id is a no-op.
    pub fn register(&self, endpoint: &Endpoint) {
        self.entries
            .entry(endpoint.id().clone())
            .or_insert_with(|| EndpointStats::new(!endpoint.is_direct()));
    }

    /// Record the outcome of one request made through `id`.
    pub fn record(&self, id: &EndpointId, outcome: Outcome, latency: Duration) -> Result<()> {
        self.record_at(id, outcome, latency, Instant::now())
    }

    /// Record with an explicit clock. Counters update atomically per entry.
    pub fn record_at(
        &self,
        id: &EndpointId,
        outcome: Outcome,
        latency: Duration,
        now: Instant,
    ) -> Result<()> {
        let mut entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| PoolError::UnknownEndpoint(id.clone()))?;
        let stats = entry.value_mut();

        stats.attempts += 1;
        match outcome {
            Outcome::Success => {
                stats.successes += 1;
                stats.last_success = Some(now);
                if stats.excluded_until.is_some() {
                    info!(endpoint = %id, "endpoint recovered");
                }
                stats.consecutive_failures = 0;
                stats.excluded_until = None;
                stats.avg_latency = Some(match stats.avg_latency {
                    None => latency,
                    Some(avg) => {
                        let secs = avg.as_secs_f64() * (1.0 - LATENCY_EWMA_ALPHA)
                            + latency.as_secs_f64() * LATENCY_EWMA_ALPHA;
                        Duration::from_secs_f64(secs)
                    }
                });
                debug!(endpoint = %id, latency_ms = latency.as_millis() as u64, "request succeeded");
            }
            Outcome::Failure => {
                stats.failures += 1;
                stats.consecutive_failures += 1;
                if stats.excludable && stats.consecutive_failures >= self.config.failure_threshold {
                    let backoff = self.backoff(stats.consecutive_failures);
                    stats.excluded_until = Some(now + backoff);
                    warn!(
                        endpoint = %id,
                        streak = stats.consecutive_failures,
                        backoff_secs = backoff.as_secs(),
                        "endpoint excluded after repeated failures"
                    );
                } else {
                    debug!(endpoint = %id, streak = stats.consecutive_failures, "request failed");
                }
            }
        }

        Ok(())
    }

    /// True iff the endpoint exists and is not currently excluded
    pub fn is_available(&self, id: &EndpointId) -> bool {
        self.is_available_at(id, Instant::now())
    }

    pub fn is_available_at(&self, id: &EndpointId, now: Instant) -> bool {
        match self.entries.get(id) {
            Some(entry) => !matches!(entry.excluded_until, Some(until) if now < until),
            None => false,
        }
    }

    /// Note that the endpoint was handed out; drives recency scoring and
    /// LRU tie-breaking.
    pub fn mark_selected(&self, id: &EndpointId, now: Instant) {
        if let Some(mut entry) = self.entries.get_mut(id) {
            entry.last_selected = Some(now);
        }
    }

    /// Owned snapshot of all stats, in no particular order
    pub fn snapshot(&self) -> Vec<StatsSnapshot> {
        self.entries
            .iter()
            .map(|entry| Self::snapshot_entry(entry.key(), entry.value()))
            .collect()
    }

    /// Owned snapshot of one endpoint's stats
    pub fn snapshot_one(&self, id: &EndpointId) -> Option<StatsSnapshot> {
        self.entries
            .get(id)
            .map(|entry| Self::snapshot_entry(entry.key(), entry.value()))
    }

    fn snapshot_entry(id: &EndpointId, stats: &EndpointStats) -> StatsSnapshot {
        StatsSnapshot {
            id: id.clone(),
            attempts: stats.attempts,
            successes: stats.successes,
            failures: stats.failures,
            consecutive_failures: stats.consecutive_failures,
            avg_latency: stats.avg_latency,
            excluded_until: stats.excluded_until,
            last_selected: stats.last_selected,
            last_success: stats.last_success,
        }
    }

    /// Exclusion duration for a failure streak: doubles for every failure
    /// past the threshold, capped.
    fn backoff(&self, streak: u32) -> Duration {
        let exp = streak
            .saturating_sub(self.config.failure_threshold)
            .min(16);
        let backoff = self.config.backoff_base.saturating_mul(1u32 << exp);
        backoff.min(self.config.backoff_cap)
    }
}
