//! Round-robin endpoint selection
//!
//! A shared cursor over registry order that persists across calls and
//! skips endpoints that are currently excluded.

use std::time::Instant;

use parking_lot::Mutex;

use super::Candidate;
use crate::models::SharedEndpoint;

pub(crate) struct RoundRobinCursor {
    next: Mutex<usize>,
}

impl RoundRobinCursor {
    pub(crate) fn new() -> Self {
        Self {
            next: Mutex::new(0),
        }
    }

    /// Pick the next available candidate in registry order.
    ///
    /// The cursor advances past the chosen endpoint, so every available
    /// endpoint is visited once before any repeats (as long as none change
    /// availability mid-cycle).
    pub(crate) fn pick(&self, candidates: &[Candidate], now: Instant) -> Option<SharedEndpoint> {
        if candidates.is_empty() {
            return None;
        }

        let mut next = self.next.lock();
        let len = candidates.len();
        for offset in 0..len {
            let idx = (*next + offset) % len;
            if !candidates[idx].stats.is_excluded(now) {
                *next = (idx + 1) % len;
                return Some(candidates[idx].endpoint.clone());
            }
        }
        None
    }
}
