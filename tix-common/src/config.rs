//! Configuration loading and config file resolution
//!
//! Resolution priority for every setting:
//! 1. Command-line argument (highest priority, applied by the binary)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is not an error: the service logs a warning and
//! starts on compiled defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "TIX_CONFIG";

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub logging: LoggingConfig,
    pub clock: ClockConfig,
    pub geocode: GeocodeConfig,
    pub resolver: ResolverConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Which parser a time provider endpoint needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeProviderKind {
    WorldTimeApi,
    TimeApiIo,
}

/// One time provider endpoint, tried in list order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeProviderConfig {
    pub kind: TimeProviderKind,
    pub base_url: String,
}

/// Clock synchronization configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Offset age after which `ensure_synced` performs a new sync
    pub refresh_interval_secs: u64,
    /// Per-provider request deadline
    pub provider_timeout_secs: u64,
    /// Providers in priority order
    pub providers: Vec<TimeProviderConfig>,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 30 * 60,
            provider_timeout_secs: 8,
            providers: vec![
                TimeProviderConfig {
                    kind: TimeProviderKind::WorldTimeApi,
                    base_url: "https://worldtimeapi.org".to_string(),
                },
                TimeProviderConfig {
                    kind: TimeProviderKind::TimeApiIo,
                    base_url: "https://timeapi.io".to_string(),
                },
            ],
        }
    }
}

/// Live geocoding configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodeConfig {
    /// Per-query deadline
    pub timeout_secs: u64,
    pub open_meteo_url: String,
    pub geonames_url: String,
    /// GeoNames account name; GeoNames is skipped without it
    pub geonames_username: Option<String>,
    /// Keyless fallback: place search here, then a coordinate → zone lookup
    /// at `coordinate_timezone_url`. Empty disables it.
    pub nominatim_url: String,
    pub coordinate_timezone_url: String,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 6,
            open_meteo_url: "https://geocoding-api.open-meteo.com".to_string(),
            geonames_url: "http://api.geonames.org".to_string(),
            geonames_username: None,
            nominatim_url: "https://nominatim.openstreetmap.org".to_string(),
            coordinate_timezone_url: "https://timeapi.io".to_string(),
        }
    }
}

/// Venue resolution configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// ISO 3166-1 alpha-2 code ranked first when a city name is ambiguous
    pub domestic_country: String,
    /// Maximum concurrent resolutions for batch callers
    pub batch_concurrency: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            domestic_country: "US".to_string(),
            batch_concurrency: 8,
        }
    }
}

impl TomlConfig {
    /// Load from `path` if given and present, otherwise from the default
    /// locations, otherwise compiled defaults. Environment overrides are
    /// applied on top. Never fails; problems are logged.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let mut config = match resolve_config_path(path) {
            Some(config_path) => match load_toml_config(&config_path) {
                Ok(config) => {
                    info!("Loaded configuration from {}", config_path.display());
                    config
                }
                Err(e) => {
                    warn!("{}; using compiled defaults", e);
                    TomlConfig::default()
                }
            },
            None => {
                warn!("No config file found; using compiled defaults");
                TomlConfig::default()
            }
        };
        config.apply_env_overrides();
        config
    }

    /// Apply `TIX_*` environment variables over file values
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("TIX_LOG_LEVEL") {
            if !level.trim().is_empty() {
                self.logging.level = level;
            }
        }
        if let Ok(username) = std::env::var("TIX_GEONAMES_USERNAME") {
            if !username.trim().is_empty() {
                self.geocode.geonames_username = Some(username);
            }
        }
        if let Ok(country) = std::env::var("TIX_DOMESTIC_COUNTRY") {
            if !country.trim().is_empty() {
                self.resolver.domestic_country = country.trim().to_uppercase();
            }
        }
        if let Ok(secs) = std::env::var("TIX_CLOCK_REFRESH_SECS") {
            match secs.parse::<u64>() {
                Ok(secs) => self.clock.refresh_interval_secs = secs,
                Err(_) => warn!("Ignoring TIX_CLOCK_REFRESH_SECS={:?}: not an integer", secs),
            }
        }
    }

    /// Reject values the services cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.clock.provider_timeout_secs == 0 {
            return Err(Error::Config("clock.provider_timeout_secs must be > 0".to_string()));
        }
        if self.clock.providers.is_empty() {
            return Err(Error::Config("clock.providers must not be empty".to_string()));
        }
        if self.geocode.timeout_secs == 0 {
            return Err(Error::Config("geocode.timeout_secs must be > 0".to_string()));
        }
        let country = &self.resolver.domestic_country;
        if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(Error::Config(format!(
                "resolver.domestic_country must be a two-letter country code, got {:?}",
                country
            )));
        }
        if self.resolver.batch_concurrency == 0 {
            return Err(Error::Config("resolver.batch_concurrency must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Find the config file to load.
///
/// Priority: explicit path, then `TIX_CONFIG`, then
/// `<config dir>/tix/config.toml`, then `/etc/tix/config.toml`.
/// Only the default locations are checked for existence.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let user_config = dirs::config_dir().map(|d| d.join("tix").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    let system_config = PathBuf::from("/etc/tix/config.toml");
    if cfg!(unix) && system_config.exists() {
        return Some(system_config);
    }

    None
}
