//! Bundled reference data
//!
//! - `data/cities.json`: city name, country, population, raw IANA zone
//! - `data/venue_tables.toml`: venue names, states/provinces, fragments
//!
//! Both are embedded at compile time and parsed once when the index is built.

use crate::error::IndexError;
use serde::Deserialize;

const CITIES_JSON: &str = include_str!("../../data/cities.json");
const VENUE_TABLES_TOML: &str = include_str!("../../data/venue_tables.toml");

/// One row of the city dataset, before normalization
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawCity {
    pub name: String,
    /// ISO 3166-1 alpha-2
    pub country: String,
    #[serde(default)]
    pub population: u64,
    pub timezone: String,
}

impl RawCity {
    pub fn new(name: &str, country: &str, population: u64, timezone: &str) -> Self {
        Self {
            name: name.to_string(),
            country: country.to_string(),
            population,
            timezone: timezone.to_string(),
        }
    }
}

/// Key → timezone row (venue names, fragments)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TableEntry {
    pub key: String,
    pub timezone: String,
}

/// State or province row
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StateEntry {
    pub abbreviation: String,
    pub name: String,
    pub timezone: String,
}

/// The hand-authored tables
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VenueTables {
    #[serde(default)]
    pub venues: Vec<TableEntry>,
    #[serde(default)]
    pub states: Vec<StateEntry>,
    #[serde(default)]
    pub fragments: Vec<TableEntry>,
    /// Single words that are never sent to a geocoder on their own
    #[serde(default)]
    pub geocode_skip_words: Vec<String>,
}

pub fn parse_cities(json: &str) -> Result<Vec<RawCity>, IndexError> {
    serde_json::from_str(json).map_err(|e| IndexError::Dataset(e.to_string()))
}

pub fn parse_tables(source: &str) -> Result<VenueTables, IndexError> {
    toml::from_str(source).map_err(|e| IndexError::Tables(format!("venue_tables.toml: {}", e)))
}

pub fn bundled_cities() -> Result<Vec<RawCity>, IndexError> {
    parse_cities(CITIES_JSON)
}

pub fn bundled_tables() -> Result<VenueTables, IndexError> {
    parse_tables(VENUE_TABLES_TOML)
}
