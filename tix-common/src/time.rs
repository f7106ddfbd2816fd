//! Timestamp utilities and the system clock seam

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::RwLock;

/// Source of the host's (possibly wrong) wall-clock time.
///
/// Services that need "now" take one of these instead of calling
/// `Utc::now()` directly so tests can pin the host clock.
pub trait SystemClock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real host clock
#[derive(Debug, Default, Clone, Copy)]
pub struct HostClock;

impl SystemClock for HostClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and simulations
#[derive(Debug)]
pub struct ManualClock {
    current: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: RwLock::new(start),
        }
    }

    /// Jump to an absolute instant
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = instant;
    }

    /// Move the clock forward (or backward with a negative delta)
    pub fn advance(&self, delta: ChronoDuration) {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current += delta;
    }
}

impl SystemClock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.read().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_host_clock_tracks_utc_now() {
        let before = Utc::now();
        let host = HostClock.now();
        let after = Utc::now();
        assert!(host >= before && host <= after);
    }

    #[test]
    fn test_manual_clock_set_and_advance() {
        let start = Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(ChronoDuration::minutes(90));
        assert_eq!(clock.now(), start + ChronoDuration::minutes(90));

        let later = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        clock.set(later);
        assert_eq!(clock.now(), later);
    }
}
