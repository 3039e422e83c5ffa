//! Sticky session bindings
//!
//! Maps an opaque session key to a previously selected endpoint for a
//! bounded time. The TTL slides: reusing a live binding renews it. Expired
//! entries are evicted lazily on lookup and are never honored.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::models::EndpointId;

struct SessionBinding {
    endpoint: EndpointId,
    expires_at: Instant,
}

pub(crate) struct SessionMap {
    bindings: DashMap<String, SessionBinding>,
    ttl: Duration,
}

impl SessionMap {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            bindings: DashMap::new(),
            ttl,
        }
    }

    /// Look up a live binding, renewing its TTL on the way out.
    pub(crate) fn get(&self, key: &str, now: Instant) -> Option<EndpointId> {
        let expired = {
            match self.bindings.get_mut(key) {
                Some(mut binding) => {
                    if now < binding.expires_at {
                        binding.expires_at = now + self.ttl;
                        return Some(binding.endpoint.clone());
                    }
                    true
                }
                None => false,
            }
        };

        // The map guard is released before we evict the stale entry.
        if expired {
            self.bindings.remove(key);
        }
        None
    }

    /// Bind (or rebind) a session key to an endpoint
    pub(crate) fn bind(&self, key: &str, endpoint: EndpointId, now: Instant) {
        self.bindings.insert(
            key.to_string(),
            SessionBinding {
                endpoint,
                expires_at: now + self.ttl,
            },
        );
    }

    /// Drop a binding explicitly
    pub(crate) fn reset(&self, key: &str) {
        self.bindings.remove(key);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.bindings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Endpoint, Protocol};

    fn id(port: u16) -> EndpointId {
        Endpoint::proxy(Protocol::Socks5, "10.0.0.1", port, None, None)
            .id()
            .clone()
    }

    #[test]
    fn test_binding_survives_within_ttl() {
        let sessions = SessionMap::new(Duration::from_secs(60));
        let t0 = Instant::now();
        sessions.bind("crawl-42", id(1), t0);

        let t1 = t0 + Duration::from_secs(59);
        assert_eq!(sessions.get("crawl-42", t1), Some(id(1)));
    }

    #[test]
    fn test_ttl_slides_on_reuse() {
        let sessions = SessionMap::new(Duration::from_secs(60));
        let t0 = Instant::now();
        sessions.bind("crawl-42", id(1), t0);

        // Each lookup pushes the expiry out; the binding outlives the
        // original TTL as long as it keeps being used.
        let t1 = t0 + Duration::from_secs(50);
        assert_eq!(sessions.get("crawl-42", t1), Some(id(1)));
        let t2 = t1 + Duration::from_secs(50);
        assert_eq!(sessions.get("crawl-42", t2), Some(id(1)));
    }

    #[test]
    fn test_expired_binding_is_not_honored() {
        let sessions = SessionMap::new(Duration::from_secs(60));
        let t0 = Instant::now();
        sessions.bind("crawl-42", id(1), t0);

        let t1 = t0 + Duration::from_secs(61);
        assert_eq!(sessions.get("crawl-42", t1), None);
        // Lazy eviction removed the stale entry.
        assert_eq!(sessions.len(), 0);
    }

    #[test]
    fn test_reset_and_missing_keys() {
        let sessions = SessionMap::new(Duration::from_secs(60));
        let t0 = Instant::now();
        assert_eq!(sessions.get("missing", t0), None);

        sessions.bind("crawl-42", id(1), t0);
        sessions.reset("crawl-42");
        assert_eq!(sessions.get("crawl-42", t0), None);
    }

    #[test]
    fn test_rebind_replaces_endpoint() {
        let sessions = SessionMap::new(Duration::from_secs(60));
        let t0 = Instant::now();
        sessions.bind("crawl-42", id(1), t0);
        sessions.bind("crawl-42", id(2), t0);
        assert_eq!(sessions.get("crawl-42", t0), Some(id(2)));
    }
}
