//! Venue → IANA timezone resolution
//!
//! Offline stages first, live geocoders only when every stage misses.
//! Outcomes are memoized by normalized venue text. "Unresolved" is only
//! memoized when every geocoder query actually completed, so a venue that
//! missed because a service was down is retried on the next call.

use super::geocode::{geocoders_from_config, Geocoder};
use super::index::StaticVenueIndex;
use super::query::VenueQuery;
use super::stages::{default_stages, ResolveStage};
use crate::error::SetupError;
use crate::timezone::{normalize_timezone_alias, parse_timezone};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tix_common::config::TomlConfig;
use tracing::{debug, info, warn};

const DEFAULT_GEOCODE_TIMEOUT: Duration = Duration::from_secs(6);

#[derive(Debug, Clone, PartialEq, Eq)]
enum CachedResolution {
    Resolved(String),
    Unresolved,
}

impl CachedResolution {
    fn timezone(&self) -> Option<String> {
        match self {
            CachedResolution::Resolved(tz) => Some(tz.clone()),
            CachedResolution::Unresolved => None,
        }
    }
}

/// Outcome of the live fallback
#[derive(Debug, PartialEq, Eq)]
enum LiveOutcome {
    Found(String),
    /// Every query completed and none matched
    NotFound,
    /// At least one query failed or timed out
    Incomplete,
}

/// Layered venue resolver with a process-lifetime cache
pub struct VenueTimezoneResolver {
    index: Arc<StaticVenueIndex>,
    stages: Vec<Arc<dyn ResolveStage>>,
    geocoders: Vec<Arc<dyn Geocoder>>,
    geocode_timeout: Duration,
    cache: RwLock<HashMap<String, CachedResolution>>,
}

impl VenueTimezoneResolver {
    /// Resolver with the built-in stages. `geocoders` are tried in order
    /// for each search term.
    pub fn new(index: Arc<StaticVenueIndex>, geocoders: Vec<Arc<dyn Geocoder>>) -> Self {
        Self {
            index,
            stages: default_stages(),
            geocoders,
            geocode_timeout: DEFAULT_GEOCODE_TIMEOUT,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the offline stage list
    pub fn with_stages(mut self, stages: Vec<Arc<dyn ResolveStage>>) -> Self {
        self.stages = stages;
        self
    }

    /// Deadline for each individual geocoder query
    pub fn with_geocode_timeout(mut self, timeout: Duration) -> Self {
        self.geocode_timeout = timeout;
        self
    }

    /// Bundled index plus the configured geocoders
    pub fn from_config(config: &TomlConfig) -> Result<Self, SetupError> {
        let index = StaticVenueIndex::bundled(&config.resolver.domestic_country)?;
        let geocoders = geocoders_from_config(&config.geocode)?;
        Ok(Self::new(Arc::new(index), geocoders)
            .with_geocode_timeout(Duration::from_secs(config.geocode.timeout_secs)))
    }

    pub fn index(&self) -> &StaticVenueIndex {
        &self.index
    }

    /// Offline stages only. Pure and deterministic; never touches the
    /// network or the cache.
    pub fn resolve_static(&self, venue: &str) -> Option<String> {
        let query = VenueQuery::parse(venue);
        self.run_stages(&query)
    }

    fn run_stages(&self, query: &VenueQuery) -> Option<String> {
        if query.is_empty() {
            return None;
        }

        for stage in &self.stages {
            if let Some(tz) = stage.try_resolve(&self.index, query) {
                debug!(stage = stage.name(), venue = %query.normalized, timezone = %tz, "Static match");
                return Some(tz);
            }
        }
        None
    }

    /// Cache, then offline stages, then live geocoders.
    ///
    /// `None` means the venue could not be resolved and the caller must not
    /// act on it.
    pub async fn resolve(&self, venue: &str) -> Option<String> {
        let query = VenueQuery::parse(venue);
        if query.is_empty() {
            return None;
        }

        if let Some(cached) = self.cached(&query.normalized) {
            return cached.timezone();
        }

        if let Some(tz) = self.run_stages(&query) {
            self.remember(&query.normalized, CachedResolution::Resolved(tz.clone()));
            return Some(tz);
        }

        match self.resolve_live(&query).await {
            LiveOutcome::Found(tz) => {
                self.remember(&query.normalized, CachedResolution::Resolved(tz.clone()));
                Some(tz)
            }
            LiveOutcome::NotFound => {
                warn!(venue = %query.normalized, "Venue timezone unresolved");
                self.remember(&query.normalized, CachedResolution::Unresolved);
                None
            }
            LiveOutcome::Incomplete => {
                warn!(venue = %query.normalized, "Venue timezone unresolved; geocoding incomplete, will retry");
                None
            }
        }
    }

    /// Resolve many venues with at most `concurrency` in flight. Output is
    /// in input order.
    pub async fn resolve_many<S: AsRef<str>>(&self, venues: &[S], concurrency: usize) -> Vec<Option<String>> {
        stream::iter(venues.iter())
            .map(|venue| self.resolve(venue.as_ref()))
            .buffered(concurrency.max(1))
            .collect()
            .await
    }

    /// Number of memoized venues (resolved and unresolved)
    pub fn cache_len(&self) -> usize {
        self.cache.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn clear_cache(&self) {
        self.cache.write().unwrap_or_else(|e| e.into_inner()).clear();
    }

    fn cached(&self, key: &str) -> Option<CachedResolution> {
        self.cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn remember(&self, key: &str, resolution: CachedResolution) {
        self.cache
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), resolution);
    }

    async fn resolve_live(&self, query: &VenueQuery) -> LiveOutcome {
        let terms = query.search_terms(|word| self.index.is_geocode_skip_word(word));
        let mut incomplete = false;

        for term in &terms {
            for geocoder in &self.geocoders {
                let result = tokio::time::timeout(self.geocode_timeout, geocoder.lookup_timezone(term)).await;

                let raw = match result {
                    Ok(Ok(Some(raw))) => raw,
                    Ok(Ok(None)) => continue,
                    Ok(Err(e)) => {
                        debug!(geocoder = geocoder.name(), term = %term, error = %e, "Geocoder failed");
                        incomplete = true;
                        continue;
                    }
                    Err(_) => {
                        debug!(geocoder = geocoder.name(), term = %term, timeout = ?self.geocode_timeout, "Geocoder timed out");
                        incomplete = true;
                        continue;
                    }
                };

                let canonical = normalize_timezone_alias(&raw);
                if parse_timezone(&canonical).is_none() {
                    debug!(geocoder = geocoder.name(), term = %term, timezone = %raw, "Ignoring unrecognized timezone");
                    continue;
                }

                info!(
                    geocoder = geocoder.name(),
                    venue = %query.normalized,
                    term = %term,
                    timezone = %canonical,
                    "Venue resolved by geocoder"
                );
                return LiveOutcome::Found(canonical);
            }
        }

        if incomplete {
            LiveOutcome::Incomplete
        } else {
            LiveOutcome::NotFound
        }
    }
}
