use chrono::{DateTime, Utc};
use serde::Serialize;

/// Read-only pool status report.
///
/// Built from a tracker snapshot; safe to hand to a monitoring surface
/// verbatim. Credentials never appear here.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStatus {
    pub generated_at: DateTime<Utc>,
    pub total_endpoints: usize,
    pub excluded_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_success_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median_success_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median_latency_ms: Option<u64>,
    pub endpoints: Vec<EndpointReport>,
}

/// Per-endpoint row of a status report
#[derive(Debug, Clone, Serialize)]
pub struct EndpointReport {
    pub id: String,
    pub protocol: String,
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub consecutive_failures: u32,
    pub success_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_latency_ms: Option<u64>,
    pub excluded: bool,
    /// Remaining exclusion time, if currently excluded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded_for_ms: Option<u64>,
    /// Time since this endpoint was last handed out
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_ms: Option<u64>,
}

/// Median of an unsorted sample set; the mean of the middle pair for even
/// sizes. `None` for empty input.
pub(crate) fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}
