//! # tix Common Library
//!
//! Shared code for the tix services including:
//! - Configuration loading (TOML + environment + compiled defaults)
//! - Error types
//! - System clock abstraction
//! - Venue text normalization
//! - Human-readable duration formatting

pub mod config;
pub mod error;
pub mod human_time;
pub mod text;
pub mod time;

pub use error::{Error, Result};
pub use time::{HostClock, ManualClock, SystemClock};
