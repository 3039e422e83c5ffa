use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{PoolError, Result};
use crate::pool::probe::ProbeConfig;
use crate::pool::rotation::Strategy;
use crate::pool::score::ScoreWeights;
use crate::pool::tracker::TrackerConfig;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Endpoint list sources
    pub registry: RegistryConfig,
    /// Pool tuning
    pub pool: PoolConfig,
    /// Health probe settings
    pub probe: ProbeConfig,
    /// Logging configuration
    pub log: LogConfig,
}

/// Where the endpoint list comes from
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    /// Endpoint list file, one endpoint per line (default: none)
    pub file: Option<PathBuf>,
    /// Inline endpoints, comma-separated in the environment
    pub inline: Vec<String>,
    /// Add the direct/passthrough sentinel to the pool
    pub include_direct: bool,
}

/// Pool tuning knobs
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Default rotation strategy (smart, random, round_robin, session)
    pub strategy: Strategy,
    /// Failure threshold and exclusion backoff
    pub tracker: TrackerConfig,
    /// Sticky-session binding lifetime
    pub session_ttl: Duration,
    /// Smart-strategy scoring weights
    pub weights: ScoreWeights,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            tracker: TrackerConfig::default(),
            session_ttl: Duration::from_secs(600),
            weights: ScoreWeights::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = PoolConfig::default();
        let probe_defaults = ProbeConfig::default();
        let weight_defaults = ScoreWeights::default();

        Ok(Config {
            registry: RegistryConfig {
                file: match get_env_or("RONDO_PROXY_FILE", "") {
                    s if s.is_empty() => None,
                    s => Some(PathBuf::from(s)),
                },
                inline: get_env_or("RONDO_ENDPOINTS", "")
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                include_direct: parse_env("RONDO_INCLUDE_DIRECT", true)?,
            },
            pool: PoolConfig {
                strategy: get_env_or("RONDO_STRATEGY", "smart").parse()?,
                tracker: TrackerConfig {
                    failure_threshold: parse_env(
                        "RONDO_FAILURE_THRESHOLD",
                        defaults.tracker.failure_threshold,
                    )?,
                    backoff_base: env_secs("RONDO_BACKOFF_BASE_SECS", defaults.tracker.backoff_base)?,
                    backoff_cap: env_secs("RONDO_BACKOFF_CAP_SECS", defaults.tracker.backoff_cap)?,
                },
                session_ttl: env_secs("RONDO_SESSION_TTL_SECS", defaults.session_ttl)?,
                weights: ScoreWeights {
                    success: parse_env("RONDO_SCORE_SUCCESS_WEIGHT", weight_defaults.success)?,
                    latency: parse_env("RONDO_SCORE_LATENCY_WEIGHT", weight_defaults.latency)?,
                    recency: parse_env("RONDO_SCORE_RECENCY_WEIGHT", weight_defaults.recency)?,
                    recency_window: env_secs(
                        "RONDO_RECENCY_WINDOW_SECS",
                        weight_defaults.recency_window,
                    )?,
                },
            },
            probe: ProbeConfig {
                enabled: parse_env("RONDO_PROBE_ENABLED", probe_defaults.enabled)?,
                interval: env_secs("RONDO_PROBE_INTERVAL_SECS", probe_defaults.interval)?,
                connect_timeout: env_secs("RONDO_PROBE_TIMEOUT_SECS", probe_defaults.connect_timeout)?,
                workers: parse_env("RONDO_PROBE_WORKERS", probe_defaults.workers)?,
            },
            log: LogConfig {
                level: get_env_or("LOG_LEVEL", "info"),
                format: get_env_or("LOG_FORMAT", "pretty"),
            },
        })
    }
}

/// Get environment variable with a default value
fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset and
/// failing loudly when set to something unparseable.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            PoolError::InvalidConfig(format!("{} has invalid value: {}", key, raw))
        }),
        Err(_) => Ok(default),
    }
}

fn env_secs(key: &str, default: Duration) -> Result<Duration> {
    let secs: u64 = parse_env(key, default.as_secs())?;
    Ok(Duration::from_secs(secs))
}
