//! Common error types for tix

use thiserror::Error;

/// Common result type for tix operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across tix services
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
