//! Time provider adapters
//!
//! Each adapter knows one public "current UTC time" endpoint and how to parse
//! its JSON body. The shared `fetch` does the HTTP round-trip, so adding a
//! provider means implementing `endpoint` and `parse` only.

use crate::error::ClockError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tix_common::config::{TimeProviderConfig, TimeProviderKind};
use tracing::debug;

/// One external source of the current UTC instant
#[async_trait]
pub trait TimeProvider: Send + Sync {
    /// Provider identifier for logs and sync status
    fn name(&self) -> &'static str;

    /// Full request URL
    fn endpoint(&self) -> String;

    /// Extract the instant from a response body
    fn parse(&self, body: &str) -> Result<DateTime<Utc>, ClockError>;

    /// GET the endpoint and parse the body.
    ///
    /// The caller bounds this with its own deadline.
    async fn fetch(&self, http: &reqwest::Client) -> Result<DateTime<Utc>, ClockError> {
        let url = self.endpoint();
        debug!(provider = self.name(), url = %url, "Querying time provider");

        let response = http
            .get(&url)
            .send()
            .await
            .map_err(|e| ClockError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClockError::ApiError(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ClockError::NetworkError(e.to_string()))?;

        self.parse(&body)
    }
}

/// Build the configured providers in priority order
pub fn providers_from_config(configs: &[TimeProviderConfig]) -> Vec<Arc<dyn TimeProvider>> {
    configs
        .iter()
        .map(|config| -> Arc<dyn TimeProvider> {
            match config.kind {
                TimeProviderKind::WorldTimeApi => {
                    Arc::new(WorldTimeApiProvider::new(config.base_url.clone()))
                }
                TimeProviderKind::TimeApiIo => {
                    Arc::new(TimeApiIoProvider::new(config.base_url.clone()))
                }
            }
        })
        .collect()
}

// ============================================================================
// worldtimeapi.org
// ============================================================================

#[derive(Debug, Deserialize)]
struct WorldTimeApiResponse {
    utc_datetime: Option<String>,
    unixtime: Option<i64>,
}

/// `GET /api/timezone/Etc/UTC` → `{"utc_datetime": "...", "unixtime": ...}`
pub struct WorldTimeApiProvider {
    base_url: String,
}

impl WorldTimeApiProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl TimeProvider for WorldTimeApiProvider {
    fn name(&self) -> &'static str {
        "worldtimeapi"
    }

    fn endpoint(&self) -> String {
        format!("{}/api/timezone/Etc/UTC", self.base_url)
    }

    fn parse(&self, body: &str) -> Result<DateTime<Utc>, ClockError> {
        let response: WorldTimeApiResponse =
            serde_json::from_str(body).map_err(|e| ClockError::ParseError(e.to_string()))?;

        if let Some(raw) = response.utc_datetime {
            return DateTime::parse_from_rfc3339(&raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| ClockError::ParseError(format!("utc_datetime {:?}: {}", raw, e)));
        }

        // Older responses only carry whole seconds
        if let Some(secs) = response.unixtime {
            return Utc
                .timestamp_opt(secs, 0)
                .single()
                .ok_or_else(|| ClockError::ParseError(format!("unixtime {} out of range", secs)));
        }

        Err(ClockError::ParseError(
            "missing utc_datetime and unixtime".to_string(),
        ))
    }
}

// ============================================================================
// timeapi.io
// ============================================================================

#[derive(Debug, Deserialize)]
struct TimeApiIoResponse {
    #[serde(rename = "dateTime")]
    date_time: String,
}

/// `GET /api/Time/current/zone?timeZone=UTC` → `{"dateTime": "2025-09-01T17:00:00.1234567", ...}`
pub struct TimeApiIoProvider {
    base_url: String,
}

impl TimeApiIoProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl TimeProvider for TimeApiIoProvider {
    fn name(&self) -> &'static str {
        "timeapi.io"
    }

    fn endpoint(&self) -> String {
        format!("{}/api/Time/current/zone?timeZone=UTC", self.base_url)
    }

    fn parse(&self, body: &str) -> Result<DateTime<Utc>, ClockError> {
        let response: TimeApiIoResponse =
            serde_json::from_str(body).map_err(|e| ClockError::ParseError(e.to_string()))?;

        // Naive timestamp in the requested zone (UTC), up to 7 fractional digits
        let naive = NaiveDateTime::parse_from_str(&response.date_time, "%Y-%m-%dT%H:%M:%S%.f")
            .map_err(|e| ClockError::ParseError(format!("dateTime {:?}: {}", response.date_time, e)))?;

        Ok(Utc.from_utc_datetime(&naive))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worldtimeapi_parses_rfc3339() {
        let provider = WorldTimeApiProvider::new("https://worldtimeapi.org/");
        let body = r#"{"utc_datetime":"2025-09-01T21:00:00.123456+00:00","unixtime":1756760400}"#;
        let parsed = provider.parse(body).unwrap();
        assert_eq!(parsed.timestamp(), 1_756_760_400);
        assert_eq!(parsed.timestamp_subsec_millis(), 123);
        assert_eq!(provider.endpoint(), "https://worldtimeapi.org/api/timezone/Etc/UTC");
    }

    #[test]
    fn test_worldtimeapi_falls_back_to_unixtime() {
        let provider = WorldTimeApiProvider::new("http://localhost");
        let parsed = provider.parse(r#"{"unixtime":1756760400}"#).unwrap();
        assert_eq!(parsed.timestamp(), 1_756_760_400);
    }

    #[test]
    fn test_worldtimeapi_rejects_empty_body() {
        let provider = WorldTimeApiProvider::new("http://localhost");
        assert!(matches!(provider.parse("{}"), Err(ClockError::ParseError(_))));
        assert!(matches!(provider.parse("<html>"), Err(ClockError::ParseError(_))));
    }

    #[test]
    fn test_timeapi_io_parses_seven_digit_fraction() {
        let provider = TimeApiIoProvider::new("https://timeapi.io");
        let body = r#"{"year":2025,"dateTime":"2025-09-01T21:00:00.5000000","timeZone":"UTC"}"#;
        let parsed = provider.parse(body).unwrap();
        assert_eq!(parsed.timestamp(), 1_756_760_400);
        assert_eq!(parsed.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_timeapi_io_rejects_garbage_datetime() {
        let provider = TimeApiIoProvider::new("https://timeapi.io");
        let result = provider.parse(r#"{"dateTime":"yesterday"}"#);
        assert!(matches!(result, Err(ClockError::ParseError(_))));
    }

    #[test]
    fn test_providers_from_config_preserves_order() {
        let providers = providers_from_config(&tix_common::config::ClockConfig::default().providers);
        let names: Vec<_> = providers.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["worldtimeapi", "timeapi.io"]);
    }
}
