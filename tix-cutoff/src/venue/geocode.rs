//! Live geocoding adapters
//!
//! Each adapter turns a free-text place query into a raw IANA identifier, or
//! `Ok(None)` when the service has no match. Validation and alias collapsing
//! happen in the resolver, not here.

use crate::error::GeocodeError;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tix_common::config::GeocodeConfig;
use tracing::debug;

const USER_AGENT: &str = concat!("tix-cutoff/", env!("CARGO_PKG_VERSION"));

/// One free-text → timezone lookup service
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Geocoder identifier for logs
    fn name(&self) -> &'static str;

    /// Raw timezone id for `query`, `Ok(None)` if nothing matched
    async fn lookup_timezone(&self, query: &str) -> Result<Option<String>, GeocodeError>;
}

/// Geocoders in fallback order: Open-Meteo, GeoNames when a username is
/// configured, then the keyless Nominatim lookup unless its URL is blank
pub fn geocoders_from_config(config: &GeocodeConfig) -> Result<Vec<Arc<dyn Geocoder>>, GeocodeError> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let mut geocoders: Vec<Arc<dyn Geocoder>> = vec![Arc::new(OpenMeteoGeocoder::new(
        &config.open_meteo_url,
        timeout,
    )?)];

    match config.geonames_username.as_deref().map(str::trim) {
        Some(username) if !username.is_empty() => {
            geocoders.push(Arc::new(GeoNamesGeocoder::new(
                &config.geonames_url,
                username,
                timeout,
            )?));
        }
        _ => debug!("GeoNames username not configured, skipping GeoNames"),
    }

    if !config.nominatim_url.trim().is_empty() {
        geocoders.push(Arc::new(NominatimGeocoder::new(
            &config.nominatim_url,
            &config.coordinate_timezone_url,
            timeout,
        )?));
    }

    Ok(geocoders)
}

fn http_client(timeout: Duration) -> Result<reqwest::Client, GeocodeError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| GeocodeError::ClientError(e.to_string()))
}

async fn get_json<T: for<'de> Deserialize<'de>>(
    request: reqwest::RequestBuilder,
) -> Result<T, GeocodeError> {
    let response = request
        .send()
        .await
        .map_err(|e| GeocodeError::NetworkError(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(GeocodeError::ApiError(status.as_u16()));
    }

    response
        .json()
        .await
        .map_err(|e| GeocodeError::ParseError(e.to_string()))
}

// ============================================================================
// Open-Meteo
// ============================================================================

#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    #[serde(default)]
    results: Vec<OpenMeteoPlace>,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoPlace {
    timezone: Option<String>,
}

/// `GET /v1/search?name=<q>&count=1` → `results[0].timezone`
pub struct OpenMeteoGeocoder {
    http: reqwest::Client,
    base_url: String,
}

impl OpenMeteoGeocoder {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GeocodeError> {
        Ok(Self {
            http: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Geocoder for OpenMeteoGeocoder {
    fn name(&self) -> &'static str {
        "open-meteo"
    }

    async fn lookup_timezone(&self, query: &str) -> Result<Option<String>, GeocodeError> {
        let url = format!("{}/v1/search", self.base_url);
        debug!(geocoder = self.name(), query = %query, "Geocoding");

        let response: OpenMeteoResponse = get_json(
            self.http
                .get(&url)
                .query(&[("name", query), ("count", "1"), ("format", "json")]),
        )
        .await?;

        Ok(response
            .results
            .into_iter()
            .next()
            .and_then(|place| place.timezone)
            .filter(|tz| !tz.trim().is_empty()))
    }
}

// ============================================================================
// GeoNames
// ============================================================================

#[derive(Debug, Deserialize)]
struct GeoNamesResponse {
    #[serde(default)]
    geonames: Vec<GeoNamesPlace>,
    /// Present instead of results on account/quota errors
    status: Option<GeoNamesStatus>,
}

#[derive(Debug, Deserialize)]
struct GeoNamesPlace {
    timezone: Option<GeoNamesTimezone>,
}

#[derive(Debug, Deserialize)]
struct GeoNamesTimezone {
    #[serde(rename = "timeZoneId")]
    time_zone_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeoNamesStatus {
    message: String,
    value: Option<i64>,
}

/// `GET /searchJSON?q=<q>&maxRows=1&style=FULL&username=<u>` →
/// `geonames[0].timezone.timeZoneId`
pub struct GeoNamesGeocoder {
    http: reqwest::Client,
    base_url: String,
    username: String,
}

impl GeoNamesGeocoder {
    pub fn new(base_url: &str, username: &str, timeout: Duration) -> Result<Self, GeocodeError> {
        Ok(Self {
            http: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
        })
    }
}

#[async_trait]
impl Geocoder for GeoNamesGeocoder {
    fn name(&self) -> &'static str {
        "geonames"
    }

    async fn lookup_timezone(&self, query: &str) -> Result<Option<String>, GeocodeError> {
        let url = format!("{}/searchJSON", self.base_url);
        debug!(geocoder = self.name(), query = %query, "Geocoding");

        let response: GeoNamesResponse = get_json(self.http.get(&url).query(&[
            ("q", query),
            ("maxRows", "1"),
            ("style", "FULL"),
            ("username", self.username.as_str()),
        ]))
        .await?;

        // GeoNames reports errors in the body of a 200 response
        if let Some(status) = response.status {
            return Err(GeocodeError::ServiceError(format!(
                "{} (code {})",
                status.message,
                status.value.unwrap_or_default()
            )));
        }

        Ok(response
            .geonames
            .into_iter()
            .next()
            .and_then(|place| place.timezone)
            .and_then(|tz| tz.time_zone_id)
            .filter(|tz| !tz.trim().is_empty()))
    }
}

// ============================================================================
// Nominatim + coordinate lookup
// ============================================================================

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

#[derive(Debug, Deserialize)]
struct CoordinateTimezone {
    #[serde(rename = "timeZone")]
    time_zone: Option<String>,
}

/// `GET /search?q=<q>&format=jsonv2&limit=1` for coordinates, then
/// `GET /api/TimeZone/coordinate?latitude=..&longitude=..` → `timeZone`.
/// Neither service needs an account.
pub struct NominatimGeocoder {
    http: reqwest::Client,
    search_url: String,
    timezone_url: String,
}

impl NominatimGeocoder {
    pub fn new(search_url: &str, timezone_url: &str, timeout: Duration) -> Result<Self, GeocodeError> {
        Ok(Self {
            http: http_client(timeout)?,
            search_url: search_url.trim_end_matches('/').to_string(),
            timezone_url: timezone_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    fn name(&self) -> &'static str {
        "nominatim"
    }

    async fn lookup_timezone(&self, query: &str) -> Result<Option<String>, GeocodeError> {
        debug!(geocoder = self.name(), query = %query, "Geocoding");

        let places: Vec<NominatimPlace> = get_json(
            self.http
                .get(format!("{}/search", self.search_url))
                .query(&[("q", query), ("format", "jsonv2"), ("limit", "1")]),
        )
        .await?;

        let Some(place) = places.into_iter().next() else {
            return Ok(None);
        };

        let zone: CoordinateTimezone = get_json(
            self.http
                .get(format!("{}/api/TimeZone/coordinate", self.timezone_url))
                .query(&[("latitude", place.lat.as_str()), ("longitude", place.lon.as_str())]),
        )
        .await?;

        Ok(zone.time_zone.filter(|tz| !tz.trim().is_empty()))
    }
}
