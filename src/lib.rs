//! Rondo - Smart Egress Pool Manager
//!
//! A process-local pool of egress endpoints (upstream proxies plus an
//! optional direct-connection sentinel) for scraping workloads.
//!
//! ## Features
//!
//! - Multiple rotation strategies (smart/scored, random, round-robin,
//!   sticky session)
//! - Per-endpoint success/failure/latency tracking with temporary
//!   exclusion and capped exponential backoff
//! - Guaranteed fallback to direct connection when the whole pool is
//!   excluded
//! - Optional background TCP health probing
//! - Serializable status snapshots for a monitoring surface

pub mod config;
pub mod error;
pub mod models;
pub mod pool;

pub use config::Config;
pub use error::{PoolError, Result};
pub use models::{Endpoint, EndpointId, PoolStatus, Protocol};
pub use pool::registry::Registry;
pub use pool::rotation::Strategy;
pub use pool::tracker::Outcome;
pub use pool::{EndpointHandle, EndpointPool};
