//! Static venue index
//!
//! Read-only lookup structures built once from the city dataset and the
//! hand-authored tables. Every city is reachable under several keys (full
//! normalized name, the part before the first comma or period, ASCII-folded
//! and punctuation-free variants), each pointing at the same ranked
//! candidate list.
//!
//! Candidate ranking: domestic country first, then descending population,
//! then country code, then dataset order.

use super::tables::{bundled_cities, bundled_tables, RawCity, StateEntry, TableEntry, VenueTables};
use crate::error::IndexError;
use crate::timezone::{normalize_timezone_alias, parse_timezone};
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use tix_common::text::{ascii_fold, contains_word, normalize};
use tracing::{debug, warn};

/// Shortest prefix key ("st" from "st. louis" is not indexed)
const MIN_PREFIX_KEY_LEN: usize = 3;

/// Fragment keys this short must match as whole words
const SHORT_FRAGMENT_MAX_LEN: usize = 3;

/// One city from the reference dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityRecord {
    pub normalized_name: String,
    pub country_code: String,
    pub population: u64,
    /// Canonical IANA id (after alias normalization)
    pub timezone: String,
}

/// Immutable lookup structures shared by every resolution stage
#[derive(Debug)]
pub struct StaticVenueIndex {
    records: Vec<CityRecord>,
    cities: HashMap<String, Vec<usize>>,
    venues: Vec<(String, String)>,
    state_abbreviations: HashMap<String, String>,
    state_names: Vec<(String, String)>,
    fragments: Vec<(String, String)>,
    geocode_skip_words: HashSet<String>,
    domestic_country: String,
}

impl StaticVenueIndex {
    pub fn builder() -> VenueIndexBuilder {
        VenueIndexBuilder::default()
    }

    /// Index over the embedded dataset and tables
    pub fn bundled(domestic_country: &str) -> Result<Self, IndexError> {
        Ok(Self::builder()
            .domestic_country(domestic_country)
            .cities(bundled_cities()?)
            .tables(bundled_tables()?)
            .build())
    }

    pub fn domestic_country(&self) -> &str {
        &self.domestic_country
    }

    pub fn city_count(&self) -> usize {
        self.records.len()
    }

    /// Ranked candidates for an already-normalized key
    pub fn city_candidates(&self, key: &str) -> Vec<&CityRecord> {
        self.cities
            .get(key)
            .map(|ids| ids.iter().map(|&i| &self.records[i]).collect())
            .unwrap_or_default()
    }

    /// Best-ranked city for an already-normalized key
    pub fn lookup_city(&self, key: &str) -> Option<&CityRecord> {
        self.cities
            .get(key)
            .and_then(|ids| ids.first())
            .map(|&i| &self.records[i])
    }

    /// Longest venue-table key contained in `text`
    pub fn match_venue(&self, text: &str) -> Option<&str> {
        self.venues
            .iter()
            .find(|(key, _)| text.contains(key.as_str()))
            .map(|(_, tz)| tz.as_str())
    }

    /// Exact two-letter state/province abbreviation
    pub fn state_by_abbreviation(&self, token: &str) -> Option<&str> {
        self.state_abbreviations.get(token).map(String::as_str)
    }

    /// Longest full state/province name contained in `text`
    pub fn state_name_in(&self, text: &str) -> Option<&str> {
        self.state_names
            .iter()
            .find(|(name, _)| text.contains(name.as_str()))
            .map(|(_, tz)| tz.as_str())
    }

    /// Longest matching fragment key. Keys of three characters or fewer
    /// must sit on word boundaries; longer keys match anywhere.
    pub fn match_fragment(&self, text: &str) -> Option<&str> {
        self.fragments
            .iter()
            .find(|(key, _)| {
                if key.chars().count() <= SHORT_FRAGMENT_MAX_LEN {
                    contains_word(text, key)
                } else {
                    text.contains(key.as_str())
                }
            })
            .map(|(_, tz)| tz.as_str())
    }

    pub fn is_geocode_skip_word(&self, word: &str) -> bool {
        self.geocode_skip_words.contains(word)
    }
}

/// Builder for [`StaticVenueIndex`]
#[derive(Debug, Default)]
pub struct VenueIndexBuilder {
    domestic_country: Option<String>,
    cities: Vec<RawCity>,
    tables: VenueTables,
}

impl VenueIndexBuilder {
    pub fn domestic_country(mut self, country: &str) -> Self {
        self.domestic_country = Some(country.trim().to_uppercase());
        self
    }

    pub fn cities(mut self, cities: Vec<RawCity>) -> Self {
        self.cities.extend(cities);
        self
    }

    pub fn city(mut self, name: &str, country: &str, population: u64, timezone: &str) -> Self {
        self.cities.push(RawCity::new(name, country, population, timezone));
        self
    }

    pub fn tables(mut self, tables: VenueTables) -> Self {
        self.tables.venues.extend(tables.venues);
        self.tables.states.extend(tables.states);
        self.tables.fragments.extend(tables.fragments);
        self.tables.geocode_skip_words.extend(tables.geocode_skip_words);
        self
    }

    pub fn venue(mut self, key: &str, timezone: &str) -> Self {
        self.tables.venues.push(TableEntry {
            key: key.to_string(),
            timezone: timezone.to_string(),
        });
        self
    }

    pub fn state(mut self, abbreviation: &str, name: &str, timezone: &str) -> Self {
        self.tables.states.push(StateEntry {
            abbreviation: abbreviation.to_string(),
            name: name.to_string(),
            timezone: timezone.to_string(),
        });
        self
    }

    pub fn fragment(mut self, key: &str, timezone: &str) -> Self {
        self.tables.fragments.push(TableEntry {
            key: key.to_string(),
            timezone: timezone.to_string(),
        });
        self
    }

    pub fn build(self) -> StaticVenueIndex {
        let domestic_country = self.domestic_country.unwrap_or_else(|| "US".to_string());

        let mut records = Vec::with_capacity(self.cities.len());
        let mut cities: HashMap<String, Vec<usize>> = HashMap::new();

        for raw in &self.cities {
            let Some(timezone) = canonical_zone(&raw.timezone) else {
                warn!(city = %raw.name, timezone = %raw.timezone, "Skipping city with unknown timezone");
                continue;
            };
            let normalized_name = normalize(&raw.name);
            if normalized_name.is_empty() {
                continue;
            }

            let id = records.len();
            for key in city_keys(&normalized_name) {
                cities.entry(key).or_default().push(id);
            }
            records.push(CityRecord {
                normalized_name,
                country_code: raw.country.trim().to_uppercase(),
                population: raw.population,
                timezone,
            });
        }

        // Stable sort keeps dataset order as the last tie-breaker
        for ids in cities.values_mut() {
            ids.sort_by_key(|&i| {
                let record = &records[i];
                (
                    record.country_code != domestic_country,
                    Reverse(record.population),
                    record.country_code.clone(),
                )
            });
        }

        let venues = keyed_table(&self.tables.venues);
        let fragments = keyed_table(&self.tables.fragments);

        let mut state_abbreviations = HashMap::new();
        let mut state_names = Vec::new();
        for state in &self.tables.states {
            let Some(timezone) = canonical_zone(&state.timezone) else {
                warn!(state = %state.name, timezone = %state.timezone, "Skipping state with unknown timezone");
                continue;
            };
            let abbreviation = normalize(&state.abbreviation);
            if !abbreviation.is_empty() {
                state_abbreviations
                    .entry(abbreviation)
                    .or_insert_with(|| timezone.clone());
            }
            let name = normalize(&state.name);
            if !name.is_empty() {
                state_names.push((name, timezone));
            }
        }
        sort_longest_first(&mut state_names);

        let geocode_skip_words = self
            .tables
            .geocode_skip_words
            .iter()
            .map(|w| normalize(w))
            .collect();

        debug!(
            cities = records.len(),
            keys = cities.len(),
            venues = venues.len(),
            states = state_names.len(),
            fragments = fragments.len(),
            "Static venue index built"
        );

        StaticVenueIndex {
            records,
            cities,
            venues,
            state_abbreviations,
            state_names,
            fragments,
            geocode_skip_words,
            domestic_country,
        }
    }
}

/// Alias-normalized zone, or `None` if chrono-tz does not know it
fn canonical_zone(raw: &str) -> Option<String> {
    let canonical = normalize_timezone_alias(raw);
    parse_timezone(&canonical).map(|_| canonical)
}

/// Distinct index keys for one normalized city name
fn city_keys(normalized_name: &str) -> Vec<String> {
    let mut keys = vec![normalized_name.to_string()];

    let prefix = normalized_name
        .split(|c| c == ',' || c == '.')
        .next()
        .unwrap_or("")
        .trim();
    if prefix.chars().count() >= MIN_PREFIX_KEY_LEN {
        keys.push(prefix.to_string());
    }

    let folded = ascii_fold(normalized_name);
    if !folded.is_empty() {
        keys.push(folded.clone());
    }

    let bare: String = folded.chars().filter(|c| *c != '.' && *c != '\'').collect();
    let bare = bare.split_whitespace().collect::<Vec<_>>().join(" ");
    if !bare.is_empty() {
        keys.push(bare);
    }

    let mut seen = HashSet::new();
    keys.retain(|k| seen.insert(k.clone()));
    keys
}

fn keyed_table(entries: &[TableEntry]) -> Vec<(String, String)> {
    let mut table: Vec<(String, String)> = entries
        .iter()
        .filter_map(|entry| {
            let key = normalize(&entry.key);
            if key.is_empty() {
                return None;
            }
            match canonical_zone(&entry.timezone) {
                Some(tz) => Some((key, tz)),
                None => {
                    warn!(key = %entry.key, timezone = %entry.timezone, "Skipping table entry with unknown timezone");
                    None
                }
            }
        })
        .collect();
    sort_longest_first(&mut table);
    table
}

fn sort_longest_first(table: &mut [(String, String)]) {
    table.sort_by_key(|(key, _)| Reverse(key.chars().count()));
}
