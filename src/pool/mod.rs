//! The egress endpoint pool
//!
//! `EndpointPool` is the single shared resource of the system: it owns the
//! registry, the stats tracker, the round-robin cursor, and the session
//! bindings. Callers `acquire` an endpoint for one outbound request and
//! `release` it exactly once with the observed outcome.

pub mod probe;
pub mod registry;
pub mod rotation;
pub mod score;
pub mod tracker;

use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, warn};

use crate::config::PoolConfig;
use crate::error::{PoolError, Result};
use crate::models::status::median;
use crate::models::{EndpointId, EndpointReport, PoolStatus, SharedEndpoint};
use registry::Registry;
use rotation::{pick_random, pick_smart, Candidate, RoundRobinCursor, SessionMap, Strategy};
use score::ScoreWeights;
use tracker::{Outcome, StatsTracker};

/// Handle to an endpoint selected for one outbound request.
///
/// Must be released exactly once via [`EndpointPool::release`] so the pool
/// sees the outcome, including when the handle is the direct sentinel.
#[derive(Debug, Clone)]
pub struct EndpointHandle {
    endpoint: SharedEndpoint,
}

impl EndpointHandle {
    pub fn id(&self) -> &EndpointId {
        self.endpoint.id()
    }

    pub fn endpoint(&self) -> &SharedEndpoint {
        &self.endpoint
    }

    pub fn is_direct(&self) -> bool {
        self.endpoint.is_direct()
    }
}

pub struct EndpointPool {
    registry: Registry,
    tracker: StatsTracker,
    cursor: RoundRobinCursor,
    sessions: SessionMap,
    weights: ScoreWeights,
    default_strategy: Strategy,
}

impl EndpointPool {
    /// Build a pool over a loaded registry. Fails on an empty registry:
    /// a pool with nothing to hand out is a configuration error, not a
    /// runtime condition.
    pub fn new(registry: Registry, config: PoolConfig) -> Result<Self> {
        if registry.is_empty() {
            return Err(PoolError::EmptyPool);
        }

        let tracker = StatsTracker::new(config.tracker);
        for endpoint in registry.iter() {
            tracker.register(endpoint);
        }

        Ok(Self {
            registry,
            tracker,
            cursor: RoundRobinCursor::new(),
            sessions: SessionMap::new(config.session_ttl),
            weights: config.weights,
            default_strategy: config.strategy,
        })
    }

    pub fn default_strategy(&self) -> Strategy {
        self.default_strategy
    }

    /// Pick one endpoint for the next request using the pool's default
    /// strategy.
    pub fn acquire_default(&self, session_key: Option<&str>) -> Result<EndpointHandle> {
        self.acquire(self.default_strategy, session_key)
    }

    /// Pick one endpoint for the next request.
    ///
    /// Synchronous and non-blocking: no I/O, no sleeping. When every
    /// endpoint is excluded the pool degrades to the direct sentinel if one
    /// is configured, otherwise this is [`PoolError::Exhausted`].
    pub fn acquire(&self, strategy: Strategy, session_key: Option<&str>) -> Result<EndpointHandle> {
        self.acquire_at(strategy, session_key, Instant::now())
    }

    fn acquire_at(
        &self,
        strategy: Strategy,
        session_key: Option<&str>,
        now: Instant,
    ) -> Result<EndpointHandle> {
        let picked = match strategy {
            Strategy::Smart => pick_smart(&self.candidates(), now, &self.weights),
            Strategy::Random => pick_random(&self.candidates(), now),
            Strategy::RoundRobin => self.cursor.pick(&self.candidates(), now),
            Strategy::Session => {
                let key = session_key.ok_or(PoolError::MissingSessionKey)?;
                return self.acquire_session(key, now);
            }
        };

        self.finish(picked, strategy, now)
    }

    fn acquire_session(&self, key: &str, now: Instant) -> Result<EndpointHandle> {
        if let Some(bound) = self.sessions.get(key, now) {
            if self.tracker.is_available_at(&bound, now) {
                if let Some(endpoint) = self.registry.get(&bound) {
                    debug!(session = key, endpoint = %endpoint, "reusing session binding");
                    return self.finish(Some(endpoint.clone()), Strategy::Session, now);
                }
            }
            // Bound endpoint is gone or excluded; fall through to a fresh
            // smart pick and rebind below.
            self.sessions.reset(key);
        }

        let picked = pick_smart(&self.candidates(), now, &self.weights);
        let handle = self.finish(picked, Strategy::Session, now)?;
        self.sessions.bind(key, handle.id().clone(), now);
        Ok(handle)
    }

    /// Common tail of every acquire path: direct fallback, bookkeeping.
    fn finish(
        &self,
        picked: Option<SharedEndpoint>,
        strategy: Strategy,
        now: Instant,
    ) -> Result<EndpointHandle> {
        let endpoint = match picked {
            Some(endpoint) => endpoint,
            None => match self.registry.direct() {
                Some(direct) => {
                    warn!("all endpoints excluded, degrading to direct connection");
                    direct.clone()
                }
                None => return Err(PoolError::Exhausted),
            },
        };

        self.tracker.mark_selected(endpoint.id(), now);
        debug!(strategy = %strategy, endpoint = %endpoint, "endpoint acquired");
        Ok(EndpointHandle { endpoint })
    }

    /// Report the outcome of the request made through `handle`.
    ///
    /// Call exactly once per acquired handle. Latency is only folded into
    /// the running average on success.
    pub fn release(
        &self,
        handle: &EndpointHandle,
        outcome: Outcome,
        latency: Duration,
    ) -> Result<()> {
        self.tracker.record(handle.id(), outcome, latency)
    }

    /// Drop a sticky-session binding explicitly
    pub fn reset_session(&self, key: &str) {
        self.sessions.reset(key);
    }

    /// Read-only status snapshot for the monitoring surface
    pub fn status(&self) -> PoolStatus {
        self.status_at(Instant::now())
    }

    fn status_at(&self, now: Instant) -> PoolStatus {
        let mut reports = Vec::with_capacity(self.registry.len());
        let mut success_rates = Vec::new();
        let mut latencies_ms = Vec::new();
        let mut excluded_count = 0;

        for endpoint in self.registry.iter() {
            let snap = match self.tracker.snapshot_one(endpoint.id()) {
                Some(snap) => snap,
                None => continue,
            };

            let excluded = snap.is_excluded(now);
            if excluded {
                excluded_count += 1;
            }
            if snap.attempts > 0 {
                success_rates.push(snap.success_rate());
            }
            if let Some(latency) = snap.avg_latency {
                latencies_ms.push(latency.as_secs_f64() * 1000.0);
            }

            reports.push(EndpointReport {
                id: endpoint.id().to_string(),
                protocol: endpoint
                    .protocol()
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "direct".to_string()),
                attempts: snap.attempts,
                successes: snap.successes,
                failures: snap.failures,
                consecutive_failures: snap.consecutive_failures,
                success_rate: snap.success_rate(),
                avg_latency_ms: snap.avg_latency.map(|l| l.as_millis() as u64),
                excluded,
                excluded_for_ms: snap
                    .excluded_until
                    .filter(|until| now < *until)
                    .map(|until| until.saturating_duration_since(now).as_millis() as u64),
                idle_ms: snap
                    .last_selected
                    .map(|at| now.saturating_duration_since(at).as_millis() as u64),
            });
        }

        PoolStatus {
            generated_at: Utc::now(),
            total_endpoints: self.registry.len(),
            excluded_count,
            best_success_rate: success_rates
                .iter()
                .copied()
                .fold(None, |best: Option<f64>, r| Some(best.map_or(r, |b| b.max(r)))),
            median_success_rate: median(&success_rates),
            best_latency_ms: latencies_ms
                .iter()
                .copied()
                .fold(None, |best: Option<f64>, l| Some(best.map_or(l, |b| b.min(l))))
                .map(|l| l as u64),
            median_latency_ms: median(&latencies_ms).map(|l| l as u64),
            endpoints: reports,
        }
    }

    /// Registry-ordered candidates with their current stats
    fn candidates(&self) -> Vec<Candidate> {
        self.registry
            .iter()
            .filter_map(|endpoint| {
                self.tracker.snapshot_one(endpoint.id()).map(|stats| Candidate {
                    endpoint: endpoint.clone(),
                    stats,
                })
            })
            .collect()
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.registry
    }

    pub(crate) fn tracker(&self) -> &StatsTracker {
        &self.tracker
    }
}
