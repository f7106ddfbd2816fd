//! Trusted current time
//!
//! - `provider`: adapters for external "current UTC time" endpoints
//! - `sync`: the offset-owning [`ClockSyncService`]

pub mod provider;
pub mod sync;

pub use provider::{providers_from_config, TimeApiIoProvider, TimeProvider, WorldTimeApiProvider};
pub use sync::{ClockOffset, ClockStatus, ClockSyncBuilder, ClockSyncService, SyncOutcome};
