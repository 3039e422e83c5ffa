//! Score-based endpoint selection

use std::cmp::Ordering;
use std::time::Instant;

use super::Candidate;
use crate::models::SharedEndpoint;
use crate::pool::score::{self, ScoreWeights};

/// Pick the highest-scoring available candidate; ties go to the endpoint
/// selected least recently (never-selected counts as oldest).
pub(crate) fn pick_smart(
    candidates: &[Candidate],
    now: Instant,
    weights: &ScoreWeights,
) -> Option<SharedEndpoint> {
    let range = score::latency_range(candidates.iter().map(|c| &c.stats));

    candidates
        .iter()
        .filter(|c| !c.stats.is_excluded(now))
        .map(|c| (score::score(&c.stats, range, now, weights), c))
        .max_by(|(score_a, a), (score_b, b)| {
            score_a
                .partial_cmp(score_b)
                .unwrap_or(Ordering::Equal)
                // On equal scores, prefer the less recently selected one,
                // so max_by must rank it higher: compare reversed.
                .then_with(|| cmp_last_selected(b, a))
        })
        .map(|(_, c)| c.endpoint.clone())
}

fn cmp_last_selected(a: &Candidate, b: &Candidate) -> Ordering {
    match (a.stats.last_selected, b.stats.last_selected) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.cmp(&b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::models::{Endpoint, Protocol};
    use crate::pool::tracker::StatsSnapshot;

    fn candidate(port: u16, attempts: u64, successes: u64) -> Candidate {
        let endpoint = Endpoint::proxy(Protocol::Socks5, "10.0.0.1", port, None, None);
        let stats = StatsSnapshot {
            id: endpoint.id().clone(),
            attempts,
            successes,
            failures: attempts - successes,
            consecutive_failures: 0,
            avg_latency: None,
            excluded_until: None,
            last_selected: None,
            last_success: None,
        };
        Candidate {
            endpoint: std::sync::Arc::new(endpoint),
            stats,
        }
    }

    #[test]
    fn test_picks_most_reliable() {
        let now = Instant::now();
        let weights = ScoreWeights::default();
        let candidates = vec![
            candidate(1, 100, 40),
            candidate(2, 100, 95),
            candidate(3, 100, 70),
        ];

        let picked = pick_smart(&candidates, now, &weights).unwrap();
        assert_eq!(picked.id(), candidates[1].endpoint.id());
    }

    #[test]
    fn test_never_picks_excluded_while_alternative_exists() {
        let now = Instant::now();
        let weights = ScoreWeights::default();
        let mut candidates = vec![candidate(1, 100, 100), candidate(2, 100, 10)];
        candidates[0].stats.excluded_until = Some(now + Duration::from_secs(60));

        for _ in 0..10 {
            let picked = pick_smart(&candidates, now, &weights).unwrap();
            assert_eq!(picked.id(), candidates[1].endpoint.id());
        }
    }

    #[test]
    fn test_all_excluded_yields_none() {
        let now = Instant::now();
        let weights = ScoreWeights::default();
        let mut candidates = vec![candidate(1, 10, 10), candidate(2, 10, 10)];
        for c in &mut candidates {
            c.stats.excluded_until = Some(now + Duration::from_secs(60));
        }

        assert!(pick_smart(&candidates, now, &weights).is_none());
        assert!(pick_smart(&[], now, &weights).is_none());
    }

    #[test]
    fn test_tie_broken_by_least_recently_selected() {
        let t0 = Instant::now();
        let now = t0 + Duration::from_secs(3600);
        let weights = ScoreWeights::default();
        let mut candidates = vec![candidate(1, 10, 10), candidate(2, 10, 10)];
        // Both idle past the recency window, so scores are identical; the
        // one selected longer ago wins.
        candidates[0].stats.last_selected = Some(t0 + Duration::from_secs(100));
        candidates[1].stats.last_selected = Some(t0);

        let picked = pick_smart(&candidates, now, &weights).unwrap();
        assert_eq!(picked.id(), candidates[1].endpoint.id());

        // A never-selected endpoint ranks as oldest of all.
        candidates.push(candidate(3, 10, 10));
        let picked = pick_smart(&candidates, now, &weights).unwrap();
        assert_eq!(picked.id(), candidates[2].endpoint.id());
    }
}
