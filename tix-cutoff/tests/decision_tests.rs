//! Integration tests for the expiration decision engine
//!
//! Covers:
//! - Cutoff boundary in the fake-UTC convention (New York, 2 h threshold)
//! - Corrected clock feeding the decision
//! - Unresolved venues never producing a verdict, even after both geocoders miss
//! - Batch ordering and config wiring

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tix_common::config::TomlConfig;
use tix_common::ManualClock;
use tix_cutoff::clock::{ClockSyncService, WorldTimeApiProvider};
use tix_cutoff::venue::{Geocoder, StaticVenueIndex, VenueTimezoneResolver};
use tix_cutoff::{build_engine, EventCheck, ExpirationDecisionEngine, GeocodeError};
use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

/// Event at 7:00 PM venue-local, stored fake-UTC
fn event_at() -> DateTime<Utc> {
    utc(2025, 9, 1, 19, 0)
}

/// Geocoder that never finds anything
#[derive(Default)]
struct NoMatchGeocoder {
    calls: AtomicUsize,
}

#[async_trait]
impl Geocoder for NoMatchGeocoder {
    fn name(&self) -> &'static str {
        "no-match"
    }

    async fn lookup_timezone(&self, _query: &str) -> Result<Option<String>, GeocodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }
}

fn engine_with(clock: Arc<ManualClock>, clock_service: Option<ClockSyncService>) -> ExpirationDecisionEngine {
    let clock_service = clock_service.unwrap_or_else(|| {
        ClockSyncService::builder(vec![])
            .system_clock(clock)
            .build()
            .unwrap()
    });
    let index = StaticVenueIndex::bundled("US").unwrap();
    let resolver = VenueTimezoneResolver::new(Arc::new(index), vec![]);
    ExpirationDecisionEngine::new(clock_service, Arc::new(resolver))
}

// ============================================================================
// Cutoff boundary
// ============================================================================

#[tokio::test]
async fn test_local_five_pm_with_two_hour_threshold_stops() {
    // 21:00Z = 17:00 EDT
    let clock = Arc::new(ManualClock::new(utc(2025, 9, 1, 21, 0)));
    let engine = engine_with(clock, None);

    let decision = engine
        .decide(event_at(), "Madison Square Garden", 2.0)
        .await
        .expect("venue resolves");

    assert!(decision.should_stop);
    assert_eq!(decision.timezone, "America/New_York");
    assert_eq!(decision.local_now, utc(2025, 9, 1, 17, 0));
    assert_eq!(decision.cutoff, event_at());
}

#[tokio::test]
async fn test_local_four_fifty_nine_does_not_stop() {
    let clock = Arc::new(ManualClock::new(utc(2025, 9, 1, 20, 59)));
    let engine = engine_with(clock, None);

    let decision = engine
        .decide(event_at(), "Madison Square Garden", 2.0)
        .await
        .expect("venue resolves");

    assert!(!decision.should_stop);
    assert_eq!(decision.local_now, utc(2025, 9, 1, 16, 59));
}

#[test]
fn test_static_and_async_paths_agree() {
    let clock = Arc::new(ManualClock::new(utc(2025, 9, 1, 21, 0)));
    let engine = engine_with(clock, None);

    let sync = engine.decide_static(event_at(), "Red Rocks Amphitheatre, Morrison, CO", 2.0);
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let async_decision =
        runtime.block_on(engine.decide(event_at(), "Red Rocks Amphitheatre, Morrison, CO", 2.0));

    assert_eq!(sync, async_decision);
    let decision = sync.unwrap();
    // 21:00Z = 15:00 MDT; cutoff 17:00 < 19:00
    assert_eq!(decision.timezone, "America/Denver");
    assert_eq!(decision.local_now, utc(2025, 9, 1, 15, 0));
    assert!(!decision.should_stop);
}

// ============================================================================
// Corrected clock
// ============================================================================

#[tokio::test]
async fn test_synced_offset_moves_the_verdict() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("GET"))
        .and(matchers::path("/api/timezone/Etc/UTC"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"utc_datetime":"2025-09-01T21:00:00+00:00"}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    // Host clock is 90 s slow: raw reading is 16:58:30 EDT
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 9, 1, 20, 58, 30).unwrap()));
    let clock_service = ClockSyncService::builder(vec![Arc::new(WorldTimeApiProvider::new(server.uri()))])
        .system_clock(clock.clone())
        .build()
        .unwrap();
    let engine = engine_with(clock, Some(clock_service));

    let before = engine.decide(event_at(), "Madison Square Garden", 2.0).await.unwrap();
    assert!(!before.should_stop);

    let after = engine
        .decide_synced(event_at(), "Madison Square Garden", 2.0)
        .await
        .unwrap();
    assert!(after.should_stop);
    assert_eq!(after.local_now, utc(2025, 9, 1, 17, 0));
}

// ============================================================================
// Unresolved
// ============================================================================

#[tokio::test]
async fn test_unresolved_venue_never_acts() {
    let primary = Arc::new(NoMatchGeocoder::default());
    let secondary = Arc::new(NoMatchGeocoder::default());
    let clock_service = ClockSyncService::builder(vec![])
        .system_clock(Arc::new(ManualClock::new(utc(2025, 9, 1, 21, 0))))
        .build()
        .unwrap();
    let index = StaticVenueIndex::bundled("US").unwrap();
    let geocoders: Vec<Arc<dyn Geocoder>> = vec![primary.clone(), secondary.clone()];
    let resolver = VenueTimezoneResolver::new(Arc::new(index), geocoders);
    let engine = ExpirationDecisionEngine::new(clock_service, Arc::new(resolver));
    let long_past = utc(1999, 12, 31, 20, 0);

    assert_eq!(engine.decide(long_past, "Zzyzx Qwerty Blorp", 2.0).await, None);
    assert_eq!(engine.decide_static(long_past, "Zzyzx Qwerty Blorp", 2.0), None);
    assert_eq!(engine.decide_synced(long_past, "Zzyzx Qwerty Blorp", 0.0).await, None);
    assert_eq!(engine.decide(long_past, "", 2.0).await, None);

    // Both providers were asked for every search term and came back empty
    let primary_calls = primary.calls.load(Ordering::SeqCst);
    assert!(primary_calls > 0);
    assert_eq!(secondary.calls.load(Ordering::SeqCst), primary_calls);
}

#[tokio::test]
async fn test_non_finite_threshold_withholds_judgment() {
    let clock = Arc::new(ManualClock::new(utc(2025, 9, 1, 21, 0)));
    let engine = engine_with(clock, None);

    assert_eq!(engine.decide(event_at(), "Madison Square Garden", f64::NAN).await, None);
}

// ============================================================================
// Batch + wiring
// ============================================================================

#[tokio::test]
async fn test_decide_batch_preserves_order() {
    let clock = Arc::new(ManualClock::new(utc(2025, 9, 1, 21, 0)));
    let engine = engine_with(clock, None);

    let events = vec![
        EventCheck::new(event_at(), "Madison Square Garden", 2.0),
        EventCheck::new(event_at(), "Zzyzx Qwerty Blorp", 2.0),
        EventCheck::new(event_at(), "Ball Arena, Denver", 2.0),
        EventCheck::new(utc(2025, 9, 1, 12, 0), "Crypto.com Arena", 0.0),
    ];

    let decisions = engine.decide_batch(&events, 3).await;
    assert_eq!(decisions.len(), 4);

    let summary: Vec<_> = decisions
        .iter()
        .map(|d| d.as_ref().map(|d| (d.timezone.as_str(), d.should_stop)))
        .collect();
    assert_eq!(
        summary,
        vec![
            Some(("America/New_York", true)),
            None,
            Some(("America/Denver", false)),
            // 21:00Z = 14:00 PDT, noon event already passed
            Some(("America/Los_Angeles", true)),
        ]
    );
}

#[test]
fn test_build_engine_from_default_config() {
    let engine = build_engine(&TomlConfig::default()).unwrap();
    assert!(!engine.clock().status().ever_synced);
    assert_eq!(
        engine.resolver().resolve_static("Madison Square Garden").as_deref(),
        Some("America/New_York")
    );
}
