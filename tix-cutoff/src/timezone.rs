//! Timezone alias normalization and display helpers
//!
//! The alias table collapses regional IANA identifiers onto a small canonical
//! set so that everything downstream (cache, labels, abbreviations) sees one
//! spelling per zone. Both the static index and live geocoder results pass
//! through [`normalize_timezone_alias`].

use crate::error::IndexError;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;

const TIMEZONES_TOML: &str = include_str!("../data/timezones.toml");

/// Alias and label tables loaded from `data/timezones.toml`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimezoneTable {
    #[serde(default)]
    aliases: HashMap<String, String>,
    #[serde(default)]
    labels: HashMap<String, String>,
}

impl TimezoneTable {
    /// Parse the embedded table
    pub fn bundled() -> Result<Self, IndexError> {
        Self::from_toml(TIMEZONES_TOML)
    }

    pub fn from_toml(source: &str) -> Result<Self, IndexError> {
        toml::from_str(source).map_err(|e| IndexError::Tables(format!("timezones.toml: {}", e)))
    }

    /// Canonical spelling for `id`. Unknown ids pass through unchanged.
    pub fn canonical<'a>(&'a self, id: &'a str) -> &'a str {
        self.aliases.get(id).map(String::as_str).unwrap_or(id)
    }

    pub fn label(&self, id: &str) -> Option<&str> {
        self.labels.get(id).map(String::as_str)
    }
}

static TIMEZONES: Lazy<TimezoneTable> = Lazy::new(|| match TimezoneTable::bundled() {
    Ok(table) => table,
    Err(e) => {
        tracing::error!("{}; timezone aliases disabled", e);
        TimezoneTable::default()
    }
});

/// Collapse a regional alias onto its canonical zone.
///
/// Canonical and unknown identifiers are returned unchanged, so the
/// function is idempotent.
pub fn normalize_timezone_alias(id: &str) -> String {
    let trimmed = id.trim();
    TIMEZONES.canonical(trimmed).to_string()
}

/// Parse an IANA identifier, returning `None` for anything chrono-tz does
/// not recognize.
pub fn parse_timezone(id: &str) -> Option<Tz> {
    id.trim().parse::<Tz>().ok()
}

/// Short, DST-aware abbreviation ("EDT", "EST", "MST") for `id` at `at`.
pub fn timezone_abbreviation(id: &str, at: DateTime<Utc>) -> Option<String> {
    let tz = parse_timezone(&normalize_timezone_alias(id))?;
    Some(at.with_timezone(&tz).format("%Z").to_string())
}

/// Human label for reporting screens.
///
/// Curated labels cover the canonical set; other zones fall back to their
/// city segment ("Europe/Paris" → "Paris").
pub fn timezone_display_label(id: &str) -> String {
    let canonical = normalize_timezone_alias(id);
    if let Some(label) = TIMEZONES.label(&canonical) {
        return label.to_string();
    }
    canonical
        .rsplit('/')
        .next()
        .unwrap_or(canonical.as_str())
        .replace('_', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_bundled_table_parses() {
        let table = TimezoneTable::bundled().unwrap();
        assert_eq!(table.canonical("America/Detroit"), "America/New_York");
        assert_eq!(table.label("America/Chicago"), Some("Central Time"));
    }

    #[test]
    fn test_every_alias_target_is_a_real_zone() {
        let table = TimezoneTable::bundled().unwrap();
        for (alias, target) in &table.aliases {
            assert!(parse_timezone(target).is_some(), "{} -> {}", alias, target);
        }
    }

    #[test]
    fn test_aliases_share_wall_clock_with_target() {
        let table = TimezoneTable::bundled().unwrap();
        let instants = [
            Utc.with_ymd_and_hms(2025, 1, 15, 18, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 7, 15, 18, 0, 0).unwrap(),
        ];
        for (alias, target) in &table.aliases {
            let (Some(from), Some(to)) = (parse_timezone(alias), parse_timezone(target)) else {
                panic!("unparseable alias entry {} -> {}", alias, target);
            };
            for at in instants {
                assert_eq!(
                    at.with_timezone(&from).naive_local(),
                    at.with_timezone(&to).naive_local(),
                    "{} -> {} at {}",
                    alias,
                    target,
                    at
                );
            }
        }
    }

    #[test]
    fn test_ojinaga_keeps_central_time() {
        let winter = Utc.with_ymd_and_hms(2025, 1, 15, 18, 0, 0).unwrap();
        assert_eq!(normalize_timezone_alias("America/Ojinaga"), "America/Chicago");
        assert_eq!(timezone_abbreviation("America/Ojinaga", winter).as_deref(), Some("CST"));
    }

    #[test]
    fn test_regional_aliases_collapse() {
        assert_eq!(normalize_timezone_alias("America/Toronto"), "America/New_York");
        assert_eq!(normalize_timezone_alias("America/Indiana/Indianapolis"), "America/New_York");
        assert_eq!(normalize_timezone_alias("America/Winnipeg"), "America/Chicago");
        assert_eq!(normalize_timezone_alias("America/Edmonton"), "America/Denver");
        assert_eq!(normalize_timezone_alias("America/Vancouver"), "America/Los_Angeles");
    }

    #[test]
    fn test_normalization_is_idempotent_on_canonical_ids() {
        for id in [
            "America/New_York",
            "America/Chicago",
            "America/Denver",
            "America/Phoenix",
            "America/Los_Angeles",
            "America/Anchorage",
            "Pacific/Honolulu",
            "Europe/Paris",
        ] {
            assert_eq!(normalize_timezone_alias(id), id);
            let once = normalize_timezone_alias(id);
            assert_eq!(normalize_timezone_alias(&once), once);
        }
    }

    #[test]
    fn test_no_dst_zones_are_not_collapsed() {
        assert_eq!(normalize_timezone_alias("America/Phoenix"), "America/Phoenix");
        assert_eq!(normalize_timezone_alias("America/Regina"), "America/Regina");
    }

    #[test]
    fn test_abbreviation_tracks_dst() {
        let summer = Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap();
        let winter = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();

        assert_eq!(timezone_abbreviation("America/New_York", summer).as_deref(), Some("EDT"));
        assert_eq!(timezone_abbreviation("America/New_York", winter).as_deref(), Some("EST"));
        assert_eq!(timezone_abbreviation("America/Phoenix", summer).as_deref(), Some("MST"));
        assert_eq!(timezone_abbreviation("America/Toronto", winter).as_deref(), Some("EST"));
        assert_eq!(timezone_abbreviation("Not/AZone", summer), None);
    }

    #[test]
    fn test_display_labels() {
        assert_eq!(timezone_display_label("America/New_York"), "Eastern Time");
        assert_eq!(timezone_display_label("America/Vancouver"), "Pacific Time");
        assert_eq!(timezone_display_label("Europe/Paris"), "Paris");
        assert_eq!(timezone_display_label("America/Argentina/Buenos_Aires"), "Buenos Aires");
    }
}
