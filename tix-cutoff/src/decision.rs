//! Stop/no-stop decisions for scheduled events
//!
//! Event timestamps arrive in "fake UTC": the venue's local wall-clock
//! fields stored as if they were UTC (7:00 PM at the venue reads 19:00Z).
//! The engine brings "now" into the same representation by rendering the
//! corrected instant in the venue's zone and relabeling the fields as UTC,
//! so the comparison is a plain instant comparison.

use crate::clock::ClockSyncService;
use crate::timezone::parse_timezone;
use crate::venue::VenueTimezoneResolver;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Timelike, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Verdict for one event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    /// True once the venue's local time plus the threshold has reached the event
    pub should_stop: bool,
    pub timezone: String,
    /// Venue wall-clock "now", fake-UTC
    pub local_now: DateTime<Utc>,
    /// `local_now` + threshold, fake-UTC
    pub cutoff: DateTime<Utc>,
}

/// One event for [`ExpirationDecisionEngine::decide_batch`]
#[derive(Debug, Clone, PartialEq)]
pub struct EventCheck {
    /// Local wall-clock start, fake-UTC
    pub event_at: DateTime<Utc>,
    pub venue: String,
    pub threshold_hours: f64,
}

impl EventCheck {
    pub fn new(event_at: DateTime<Utc>, venue: impl Into<String>, threshold_hours: f64) -> Self {
        Self {
            event_at,
            venue: venue.into(),
            threshold_hours,
        }
    }
}

/// Compare an event against the venue's current wall clock.
///
/// `None` when the zone id is unknown, the threshold is not finite, or the
/// cutoff would fall outside the representable range.
pub fn evaluate(
    event_at: DateTime<Utc>,
    timezone: &str,
    true_now: DateTime<Utc>,
    threshold_hours: f64,
) -> Option<Decision> {
    if !threshold_hours.is_finite() {
        return None;
    }
    let tz = parse_timezone(timezone)?;

    // Whole seconds only: year through second are carried over
    let wall_clock = true_now.with_timezone(&tz).naive_local().with_nanosecond(0)?;
    let local_now = Utc.from_utc_datetime(&wall_clock);

    // `as` saturates; out-of-range millis are rejected by try_milliseconds
    let threshold = ChronoDuration::try_milliseconds((threshold_hours * MILLIS_PER_HOUR).round() as i64)?;
    let cutoff = local_now.checked_add_signed(threshold)?;

    Some(Decision {
        should_stop: event_at <= cutoff,
        timezone: timezone.to_string(),
        local_now,
        cutoff,
    })
}

/// Decides whether an event has crossed its venue-local cutoff
#[derive(Clone)]
pub struct ExpirationDecisionEngine {
    clock: ClockSyncService,
    resolver: Arc<VenueTimezoneResolver>,
}

impl ExpirationDecisionEngine {
    pub fn new(clock: ClockSyncService, resolver: Arc<VenueTimezoneResolver>) -> Self {
        Self { clock, resolver }
    }

    pub fn clock(&self) -> &ClockSyncService {
        &self.clock
    }

    pub fn resolver(&self) -> &VenueTimezoneResolver {
        &self.resolver
    }

    /// Resolve the venue (with live fallback) and compare against the
    /// corrected clock as it stands. `None` means "do not act".
    pub async fn decide(&self, event_at: DateTime<Utc>, venue: &str, threshold_hours: f64) -> Option<Decision> {
        let timezone = self.resolver.resolve(venue).await?;
        self.finish(event_at, venue, &timezone, threshold_hours)
    }

    /// Offline counterpart of [`decide`](Self::decide): static stages and
    /// the current offset only, no I/O.
    pub fn decide_static(&self, event_at: DateTime<Utc>, venue: &str, threshold_hours: f64) -> Option<Decision> {
        let timezone = self.resolver.resolve_static(venue)?;
        self.finish(event_at, venue, &timezone, threshold_hours)
    }

    /// [`decide`](Self::decide) after making sure the clock offset is fresh
    pub async fn decide_synced(&self, event_at: DateTime<Utc>, venue: &str, threshold_hours: f64) -> Option<Decision> {
        self.clock.ensure_synced().await;
        self.decide(event_at, venue, threshold_hours).await
    }

    /// Decide many events with at most `concurrency` in flight. The clock
    /// is synced once up front; output is in input order.
    pub async fn decide_batch(&self, events: &[EventCheck], concurrency: usize) -> Vec<Option<Decision>> {
        self.clock.ensure_synced().await;

        stream::iter(events.iter())
            .map(|event| self.decide(event.event_at, &event.venue, event.threshold_hours))
            .buffered(concurrency.max(1))
            .collect()
            .await
    }

    fn finish(&self, event_at: DateTime<Utc>, venue: &str, timezone: &str, threshold_hours: f64) -> Option<Decision> {
        let decision = evaluate(event_at, timezone, self.clock.now(), threshold_hours)?;
        debug!(
            venue = %venue,
            timezone = %decision.timezone,
            event_at = %event_at,
            cutoff = %decision.cutoff,
            should_stop = decision.should_stop,
            "Event checked"
        );
        Some(decision)
    }
}
