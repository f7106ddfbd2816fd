//! Error types for tix-cutoff
//!
//! None of these escape the public resolve/decide/sync operations: provider
//! and geocoder failures degrade to the next fallback. Callers only see
//! errors at construction time (`IndexError`, `SetupError`).

use std::time::Duration;
use thiserror::Error;

/// Time provider errors
#[derive(Debug, Error)]
pub enum ClockError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Provider timed out after {0:?}")]
    Timeout(Duration),

    #[error("Provider returned HTTP {0}")]
    ApiError(u16),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("HTTP client error: {0}")]
    ClientError(String),
}

/// Geocoding client errors
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Geocoder returned HTTP {0}")]
    ApiError(u16),

    #[error("Geocoder service error: {0}")]
    ServiceError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("HTTP client error: {0}")]
    ClientError(String),
}

/// Static index construction errors
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("City dataset error: {0}")]
    Dataset(String),

    #[error("Lookup table error: {0}")]
    Tables(String),
}

/// Failure wiring the services from configuration
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Clock(#[from] ClockError),

    #[error(transparent)]
    Geocode(#[from] GeocodeError),
}
