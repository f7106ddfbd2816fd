//! # tix-cutoff
//!
//! Decides whether a scheduled event has crossed its venue-local cutoff:
//!
//! - [`clock`]: drift-corrected "now" from external time providers
//! - [`venue`]: free-text venue → IANA timezone (static pipeline + live geocoding)
//! - [`decision`]: stop/no-stop verdicts in the fake-UTC event convention
//! - [`timezone`]: alias collapsing, abbreviations and display labels
//!
//! Services own their state and are passed around explicitly; nothing here
//! is a process global except the immutable timezone alias table.

pub mod clock;
pub mod decision;
pub mod error;
pub mod timezone;
pub mod venue;

pub use clock::{ClockStatus, ClockSyncService, SyncOutcome};
pub use decision::{evaluate, Decision, EventCheck, ExpirationDecisionEngine};
pub use error::{ClockError, GeocodeError, IndexError, SetupError};
pub use timezone::{normalize_timezone_alias, timezone_abbreviation, timezone_display_label};
pub use venue::{StaticVenueIndex, VenueTimezoneResolver};

use std::sync::Arc;
use tix_common::config::TomlConfig;

/// Wire a decision engine from configuration: configured time providers,
/// bundled venue index and configured geocoders.
pub fn build_engine(config: &TomlConfig) -> Result<ExpirationDecisionEngine, SetupError> {
    let clock = ClockSyncService::from_config(&config.clock)?;
    let resolver = VenueTimezoneResolver::from_config(config)?;
    Ok(ExpirationDecisionEngine::new(clock, Arc::new(resolver)))
}
