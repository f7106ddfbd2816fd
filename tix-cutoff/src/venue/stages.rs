//! Offline resolution stages
//!
//! Stages run in list order and the first one that produces a zone wins.
//! Adding or reordering a stage means editing [`default_stages`], not the
//! resolver.

use super::index::StaticVenueIndex;
use super::query::{VenueQuery, MIN_CITY_WORD_LEN};
use std::sync::Arc;

/// One step of the static pipeline
pub trait ResolveStage: Send + Sync {
    /// Stage identifier for logs (e.g., "venue-table", "city-ngram")
    fn name(&self) -> &'static str;

    /// Canonical IANA id if this stage recognizes the query
    fn try_resolve(&self, index: &StaticVenueIndex, query: &VenueQuery) -> Option<String>;
}

/// Built-in stages in resolution order
pub fn default_stages() -> Vec<Arc<dyn ResolveStage>> {
    vec![
        Arc::new(VenueTableStage),
        Arc::new(CityWholeTextStage),
        Arc::new(CitySegmentStage),
        Arc::new(CityWordStage),
        Arc::new(CityNgramStage),
        Arc::new(StateStage),
        Arc::new(FragmentStage),
    ]
}

fn first_city<'a>(index: &StaticVenueIndex, keys: impl IntoIterator<Item = &'a str>) -> Option<String> {
    keys.into_iter()
        .find_map(|key| index.lookup_city(key))
        .map(|city| city.timezone.clone())
}

/// Substring match against known arenas and stadiums
pub struct VenueTableStage;

impl ResolveStage for VenueTableStage {
    fn name(&self) -> &'static str {
        "venue-table"
    }

    fn try_resolve(&self, index: &StaticVenueIndex, query: &VenueQuery) -> Option<String> {
        index.match_venue(&query.normalized).map(str::to_string)
    }
}

/// The whole normalized text is a city name
pub struct CityWholeTextStage;

impl ResolveStage for CityWholeTextStage {
    fn name(&self) -> &'static str {
        "city-whole"
    }

    fn try_resolve(&self, index: &StaticVenueIndex, query: &VenueQuery) -> Option<String> {
        first_city(index, [query.normalized.as_str()])
    }
}

/// One comma/pipe/dash segment is a city name
pub struct CitySegmentStage;

impl ResolveStage for CitySegmentStage {
    fn name(&self) -> &'static str {
        "city-segment"
    }

    fn try_resolve(&self, index: &StaticVenueIndex, query: &VenueQuery) -> Option<String> {
        first_city(index, query.segments.iter().map(String::as_str))
    }
}

/// One word of three or more characters is a city name
pub struct CityWordStage;

impl ResolveStage for CityWordStage {
    fn name(&self) -> &'static str {
        "city-word"
    }

    fn try_resolve(&self, index: &StaticVenueIndex, query: &VenueQuery) -> Option<String> {
        first_city(
            index,
            query
                .words
                .iter()
                .filter(|w| w.chars().count() >= MIN_CITY_WORD_LEN)
                .map(String::as_str),
        )
    }
}

/// A run of two or three words is a city name, longest runs first
pub struct CityNgramStage;

impl ResolveStage for CityNgramStage {
    fn name(&self) -> &'static str {
        "city-ngram"
    }

    fn try_resolve(&self, index: &StaticVenueIndex, query: &VenueQuery) -> Option<String> {
        let ngrams: Vec<String> = query.ngrams(3).into_iter().chain(query.ngrams(2)).collect();
        first_city(index, ngrams.iter().map(String::as_str))
    }
}

/// State or province, by full name first and then by two-letter code.
///
/// Codes collide with ordinary words ("in", "me", "or", "ok"), so a name
/// anywhere in the text outranks a code in an earlier segment.
pub struct StateStage;

impl StateStage {
    fn by_code<'a>(index: &'a StaticVenueIndex, text: &str) -> Option<&'a str> {
        text.split(|c: char| c.is_whitespace() || c == '.')
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|t| t.chars().count() == 2)
            .find_map(|t| index.state_by_abbreviation(t))
    }
}

impl ResolveStage for StateStage {
    fn name(&self) -> &'static str {
        "state"
    }

    fn try_resolve(&self, index: &StaticVenueIndex, query: &VenueQuery) -> Option<String> {
        let texts = || {
            query
                .segments
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(query.normalized.as_str()))
        };

        texts()
            .find_map(|text| index.state_name_in(text))
            .or_else(|| texts().find_map(|text| Self::by_code(index, text)))
            .map(str::to_string)
    }
}

/// Neighborhood, nickname and airport-code keywords
pub struct FragmentStage;

impl ResolveStage for FragmentStage {
    fn name(&self) -> &'static str {
        "fragment"
    }

    fn try_resolve(&self, index: &StaticVenueIndex, query: &VenueQuery) -> Option<String> {
        index.match_fragment(&query.normalized).map(str::to_string)
    }
}
