//! Uniform random endpoint selection

use std::time::Instant;

use rand::seq::SliceRandom;

use super::Candidate;
use crate::models::SharedEndpoint;

/// Pick uniformly among the available candidates
pub(crate) fn pick_random(candidates: &[Candidate], now: Instant) -> Option<SharedEndpoint> {
    let available: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| !c.stats.is_excluded(now))
        .collect();

    let mut rng = rand::thread_rng();
    available.choose(&mut rng).map(|c| c.endpoint.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::models::{Endpoint, EndpointId, Protocol};
    use crate::pool::tracker::StatsSnapshot;

    fn candidate(port: u16) -> Candidate {
        let endpoint = Endpoint::proxy(Protocol::Socks5, "10.0.0.1", port, None, None);
        let stats = StatsSnapshot {
            id: endpoint.id().clone(),
            attempts: 0,
            successes: 0,
            failures: 0,
            consecutive_failures: 0,
            avg_latency: None,
            excluded_until: None,
            last_selected: None,
            last_success: None,
        };
        Candidate {
            endpoint: Arc::new(endpoint),
            stats,
        }
    }

    #[test]
    fn test_empty_yields_none() {
        assert!(pick_random(&[], Instant::now()).is_none());
    }

    #[test]
    fn test_only_available_candidates_are_picked() {
        let now = Instant::now();
        let mut candidates = vec![candidate(1), candidate(2), candidate(3)];
        candidates[0].stats.excluded_until = Some(now + Duration::from_secs(60));
        let excluded_id = candidates[0].endpoint.id().clone();

        let mut seen: HashSet<EndpointId> = HashSet::new();
        for _ in 0..50 {
            let picked = pick_random(&candidates, now).unwrap();
            assert_ne!(picked.id(), &excluded_id);
            seen.insert(picked.id().clone());
        }
        // Both remaining endpoints should show up over 50 draws.
        assert_eq!(seen.len(), 2);
    }
}
