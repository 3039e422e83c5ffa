//! Data models for the egress pool

pub mod endpoint;
pub mod status;

pub use endpoint::{Endpoint, EndpointId, EndpointKind, Protocol, SharedEndpoint};
pub use status::{EndpointReport, PoolStatus};
