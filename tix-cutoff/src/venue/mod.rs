//! Venue text → IANA timezone
//!
//! - `tables`: embedded city dataset and hand-authored lookup tables
//! - `index`: [`StaticVenueIndex`] built from them
//! - `query`: normalization and tokenization of one venue string
//! - `stages`: the ordered offline pipeline
//! - `geocode`: live fallback adapters
//! - `resolver`: [`VenueTimezoneResolver`], which ties it all together

pub mod geocode;
pub mod index;
pub mod query;
pub mod resolver;
pub mod stages;
pub mod tables;

pub use geocode::{geocoders_from_config, GeoNamesGeocoder, Geocoder, NominatimGeocoder, OpenMeteoGeocoder};
pub use index::{CityRecord, StaticVenueIndex, VenueIndexBuilder};
pub use query::VenueQuery;
pub use resolver::VenueTimezoneResolver;
pub use stages::{default_stages, ResolveStage};
pub use tables::{RawCity, VenueTables};
