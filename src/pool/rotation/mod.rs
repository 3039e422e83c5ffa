//! Endpoint rotation strategies
//!
//! Each strategy answers the same question: pick one available endpoint for
//! the next request. Strategies are pure selection logic over candidate
//! snapshots; all shared state (cursor, session bindings) lives in small
//! dedicated structs owned by the pool.

mod random;
mod round_robin;
mod session;
mod smart;

pub(crate) use random::pick_random;
pub(crate) use round_robin::RoundRobinCursor;
pub(crate) use session::SessionMap;
pub(crate) use smart::pick_smart;

use std::fmt;
use std::str::FromStr;

use crate::error::PoolError;
use crate::models::SharedEndpoint;
use crate::pool::tracker::StatsSnapshot;

/// Rotation strategy. A closed set: unknown names are rejected when parsed,
/// never silently defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    #[default]
    Smart,
    Random,
    RoundRobin,
    Session,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Smart => "smart",
            Strategy::Random => "random",
            Strategy::RoundRobin => "round_robin",
            Strategy::Session => "session",
        }
    }
}

impl FromStr for Strategy {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "smart" => Ok(Strategy::Smart),
            "random" => Ok(Strategy::Random),
            "round_robin" | "roundrobin" | "round-robin" => Ok(Strategy::RoundRobin),
            "session" | "sticky" => Ok(Strategy::Session),
            other => Err(PoolError::UnknownStrategy(other.to_string())),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One selectable endpoint paired with its current stats snapshot
pub(crate) struct Candidate {
    pub endpoint: SharedEndpoint,
    pub stats: StatsSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("smart".parse::<Strategy>().unwrap(), Strategy::Smart);
        assert_eq!("RANDOM".parse::<Strategy>().unwrap(), Strategy::Random);
        assert_eq!("round-robin".parse::<Strategy>().unwrap(), Strategy::RoundRobin);
        assert_eq!("roundrobin".parse::<Strategy>().unwrap(), Strategy::RoundRobin);
        assert_eq!("sticky".parse::<Strategy>().unwrap(), Strategy::Session);
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        let err = "fastest".parse::<Strategy>().unwrap_err();
        assert!(matches!(err, PoolError::UnknownStrategy(name) if name == "fastest"));
    }

    #[test]
    fn test_strategy_round_trips_as_str() {
        for strategy in [
            Strategy::Smart,
            Strategy::Random,
            Strategy::RoundRobin,
            Strategy::Session,
        ] {
            assert_eq!(strategy.as_str().parse::<Strategy>().unwrap(), strategy);
        }
    }

    #[test]
    fn test_default_strategy() {
        assert_eq!(Strategy::default(), Strategy::Smart);
    }
}
