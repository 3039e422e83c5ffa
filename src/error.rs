use thiserror::Error;

use crate::models::EndpointId;

/// Unified error type for the Rondo pool
#[derive(Error, Debug)]
pub enum PoolError {
    // Selection errors
    #[error("No endpoint available in the pool")]
    Exhausted,

    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(EndpointId),

    #[error("Unknown rotation strategy: {0}")]
    UnknownStrategy(String),

    #[error("Session strategy requires a session key")]
    MissingSessionKey,

    // Construction errors
    #[error("Endpoint pool is empty")]
    EmptyPool,

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // I/O errors (endpoint list loading)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Rondo operations
pub type Result<T> = std::result::Result<T, PoolError>;

impl PoolError {
    /// Check if this error indicates caller misuse rather than pool state
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            PoolError::UnknownEndpoint(_)
                | PoolError::UnknownStrategy(_)
                | PoolError::MissingSessionKey
        )
    }
}
