//! Human-readable elapsed time formatting
//!
//! Used by diagnostics ("last synced 4:12 ago") and the CLI.

/// Format selection thresholds (seconds)
const SHORT_FORMAT_MAX: i64 = 100; // < 100s → Xs
const MEDIUM_FORMAT_MAX: i64 = 6000; // < 100m → M:SS
const LONG_FORMAT_MAX: i64 = 90000; // < 25h → H:MM:SS
                                    // >= 25h → X.Xd

/// Format a number of seconds for display.
///
/// - Short format (`45s`): under 100 seconds
/// - Medium format (`M:SS`): under 100 minutes
/// - Long format (`H:MM:SS`): under 25 hours
/// - Days format (`X.Xd`): 25 hours and above
///
/// # Examples
///
/// ```
/// use tix_common::human_time::format_elapsed;
///
/// assert_eq!(format_elapsed(45), "45s");
/// assert_eq!(format_elapsed(330), "5:30");
/// assert_eq!(format_elapsed(7200), "2:00:00");
/// assert_eq!(format_elapsed(604800), "7d");
/// ```
pub fn format_elapsed(seconds: i64) -> String {
    let is_negative = seconds < 0;
    let abs_seconds = seconds.abs();

    let formatted = if abs_seconds < SHORT_FORMAT_MAX {
        format!("{}s", abs_seconds)
    } else if abs_seconds < MEDIUM_FORMAT_MAX {
        format!("{}:{:02}", abs_seconds / 60, abs_seconds % 60)
    } else if abs_seconds < LONG_FORMAT_MAX {
        let hours = abs_seconds / 3600;
        let mins = (abs_seconds % 3600) / 60;
        let secs = abs_seconds % 60;
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        let days = abs_seconds as f64 / 86400.0;
        let rounded = (days * 10.0).round() / 10.0;
        if (rounded - rounded.floor()).abs() < 0.001 {
            format!("{:.0}d", rounded)
        } else {
            format!("{:.1}d", rounded)
        }
    };

    if is_negative {
        format!("-{}", formatted)
    } else {
        formatted
    }
}

/// Format optional seconds, returning "never" for `None`.
pub fn format_elapsed_opt(seconds_opt: Option<i64>) -> String {
    match seconds_opt {
        Some(seconds) => format_elapsed(seconds),
        None => "never".to_string(),
    }
}
