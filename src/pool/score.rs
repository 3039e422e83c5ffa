//! Endpoint fitness scoring
//!
//! Pure functions over stats snapshots; higher is better. Excluded
//! endpoints score negative infinity and are never picked by the scoring
//! path.

use std::time::{Duration, Instant};

use crate::pool::tracker::StatsSnapshot;

/// Component weights for the smart strategy.
///
/// These are tuning heuristics, exposed as configuration rather than baked
/// in. Success rate carries the heaviest weight.
#[derive(Debug, Clone)]
pub struct ScoreWeights {
    pub success: f64,
    pub latency: f64,
    pub recency: f64,
    /// Idle time at which the recency bonus saturates
    pub recency_window: Duration,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            success: 0.60,
            latency: 0.25,
            recency: 0.15,
            recency_window: Duration::from_secs(600),
        }
    }
}

/// Observed min..max of average latencies across the pool, used to
/// normalize the latency component.
pub fn latency_range<'a, I>(snapshots: I) -> Option<(Duration, Duration)>
where
    I: IntoIterator<Item = &'a StatsSnapshot>,
{
    let mut range: Option<(Duration, Duration)> = None;
    for snap in snapshots {
        if let Some(latency) = snap.avg_latency {
            range = Some(match range {
                None => (latency, latency),
                Some((min, max)) => (min.min(latency), max.max(latency)),
            });
        }
    }
    range
}

/// Score one endpoint's stats.
///
/// Never-tried endpoints get a neutral middle score on the success and
/// latency components so they are explored rather than starved, and the
/// full recency bonus.
pub fn score(
    snap: &StatsSnapshot,
    range: Option<(Duration, Duration)>,
    now: Instant,
    weights: &ScoreWeights,
) -> f64 {
    if snap.is_excluded(now) {
        return f64::NEG_INFINITY;
    }

    let success_component = if snap.attempts == 0 {
        0.5
    } else {
        snap.success_rate()
    };

    let latency_component = match (snap.avg_latency, range) {
        (Some(latency), Some((min, max))) if max > min => {
            let span = (max - min).as_secs_f64();
            ((max - latency.min(max)).as_secs_f64() / span).clamp(0.0, 1.0)
        }
        // No sample, or a degenerate pool range: neutral.
        _ => 0.5,
    };

    let recency_component = match snap.last_selected {
        Some(last) => {
            let idle = now.saturating_duration_since(last).as_secs_f64();
            let window = weights.recency_window.as_secs_f64().max(1.0);
            (idle / window).min(1.0)
        }
        None => 1.0,
    };

    weights.success * success_component
        + weights.latency * latency_component
        + weights.recency * recency_component
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EndpointId;

    fn snap(attempts: u64, successes: u64) -> StatsSnapshot {
        StatsSnapshot {
            id: EndpointId::direct(),
            attempts,
            successes,
            failures: attempts - successes,
            consecutive_failures: 0,
            avg_latency: None,
            excluded_until: None,
            last_selected: None,
            last_success: None,
        }
    }

    #[test]
    fn test_excluded_scores_negative_infinity() {
        let now = Instant::now();
        let mut s = snap(10, 10);
        s.excluded_until = Some(now + Duration::from_secs(60));
        assert_eq!(score(&s, None, now, &ScoreWeights::default()), f64::NEG_INFINITY);

        // A lapsed exclusion no longer gates the score.
        let later = now + Duration::from_secs(61);
        assert!(score(&s, None, later, &ScoreWeights::default()).is_finite());
    }

    #[test]
    fn test_success_rate_dominates() {
        let now = Instant::now();
        let weights = ScoreWeights::default();

        let reliable = snap(100, 95);
        let flaky = snap(100, 30);
        assert!(score(&reliable, None, now, &weights) > score(&flaky, None, now, &weights));
    }

    #[test]
    fn test_latency_breaks_reliability_ties() {
        let now = Instant::now();
        let weights = ScoreWeights::default();

        let mut fast = snap(50, 50);
        fast.avg_latency = Some(Duration::from_millis(100));
        let mut slow = snap(50, 50);
        slow.avg_latency = Some(Duration::from_millis(900));

        let range = latency_range([&fast, &slow]);
        assert_eq!(
            range,
            Some((Duration::from_millis(100), Duration::from_millis(900)))
        );
        assert!(score(&fast, range, now, &weights) > score(&slow, range, now, &weights));
    }

    #[test]
    fn test_idle_endpoint_gets_recency_bonus() {
        let now = Instant::now();
        let weights = ScoreWeights::default();

        let mut busy = snap(50, 50);
        busy.last_selected = Some(now);
        let mut idle = snap(50, 50);
        idle.last_selected = Some(now.checked_sub(Duration::from_secs(3600)).unwrap_or(now));

        assert!(score(&idle, None, now, &weights) >= score(&busy, None, now, &weights));
    }

    #[test]
    fn test_untried_endpoint_is_neutral_not_penalized() {
        let now = Instant::now();
        let weights = ScoreWeights::default();

        let fresh = snap(0, 0);
        let poor = snap(100, 10);
        let good = snap(100, 100);

        let fresh_score = score(&fresh, None, now, &weights);
        assert!(fresh_score > score(&poor, None, now, &weights));
        assert!(fresh_score < score(&good, None, now, &weights) + weights.recency);
    }

    #[test]
    fn test_latency_range_ignores_unsampled() {
        let a = snap(0, 0);
        let b = snap(0, 0);
        assert_eq!(latency_range([&a, &b]), None);
    }
}
