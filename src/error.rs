//! Error types.
//!
//! Only [`OptimizeError`] ever reaches a caller. Provider and cache errors
//! are recovered inside the crate and surface in logs only.

use thiserror::Error;

/// Input violations, rejected before any computation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizeError {
    #[error("at least {min} stops are required, got {actual}")]
    TooFewStops { min: usize, actual: usize },

    #[error("at most {max} stops are supported, got {actual}")]
    TooManyStops { max: usize, actual: usize },

    #[error("vehicle count must be at least 1")]
    NoVehicles,

    #[error("depot index {depot} is out of range for {stops} stops")]
    DepotOutOfRange { depot: usize, stops: usize },

    #[error("stop {id} has invalid coordinates ({latitude}, {longitude})")]
    InvalidCoordinate {
        id: i64,
        latitude: f64,
        longitude: f64,
    },

    #[error("stop id {0} appears more than once")]
    DuplicateStopId(i64),
}

/// Failure of an external distance-table or route-geometry provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Connection failure or timeout.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned status {0}")]
    Status(u16),

    #[error("malformed provider payload: {0}")]
    Malformed(String),

    /// The provider answered but refused the request.
    #[error("provider rejected request ({code}): {message}")]
    Rejected { code: String, message: String },
}

/// Failure of a cache backend.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable")]
    Unavailable,

    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache payload could not be (de)serialised: {0}")]
    Serialization(#[from] serde_json::Error),
}
