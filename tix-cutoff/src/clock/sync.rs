//! Clock drift correction
//!
//! The host clock on the dashboard machine is not trusted. The service asks
//! external time providers for the current UTC instant, stores the signed
//! difference as an offset, and applies it to every `now()` reading. The
//! offset is only replaced by a successful provider response.
//!
//! Overlapping sync requests share one in-flight operation: the first caller
//! stores a shared future, later callers await a clone of it, and the slot is
//! cleared when it settles.

use super::provider::{providers_from_config, TimeProvider};
use crate::error::ClockError;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tix_common::config::ClockConfig;
use tix_common::human_time::format_elapsed_opt;
use tix_common::{HostClock, SystemClock};
use tracing::{debug, info, warn};

const DEFAULT_REFRESH_INTERVAL_SECS: i64 = 30 * 60;
const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(8);

/// Current drift correction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClockOffset {
    /// Milliseconds to add to the host clock
    pub offset_millis: i64,
    /// Corrected instant of the last successful sync
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Result of one sync attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Offset was young enough; nothing was sent
    Fresh,
    /// A provider answered and the offset was replaced
    Synced {
        provider: &'static str,
        offset_millis: i64,
    },
    /// Every provider failed; the previous offset is still in effect
    AllProvidersFailed,
}

/// Read-only diagnostic snapshot
#[derive(Debug, Clone, Serialize)]
pub struct ClockStatus {
    pub offset_millis: i64,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub since_last_sync_secs: Option<i64>,
    /// Human-readable form of `since_last_sync_secs`
    pub since_last_sync: String,
    pub ever_synced: bool,
}

type SharedSync = Shared<BoxFuture<'static, SyncOutcome>>;

struct ClockInner {
    providers: Vec<Arc<dyn TimeProvider>>,
    http: reqwest::Client,
    system: Arc<dyn SystemClock>,
    refresh_interval: ChronoDuration,
    provider_timeout: Duration,
    offset: RwLock<ClockOffset>,
    in_flight: Mutex<Option<SharedSync>>,
}

/// Owns the process clock offset. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ClockSyncService {
    inner: Arc<ClockInner>,
}

/// Builder for [`ClockSyncService`]
pub struct ClockSyncBuilder {
    providers: Vec<Arc<dyn TimeProvider>>,
    system: Arc<dyn SystemClock>,
    refresh_interval: ChronoDuration,
    provider_timeout: Duration,
}

impl ClockSyncBuilder {
    /// Host clock to correct (defaults to the real one)
    pub fn system_clock(mut self, system: Arc<dyn SystemClock>) -> Self {
        self.system = system;
        self
    }

    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval =
            ChronoDuration::from_std(interval).unwrap_or(ChronoDuration::MAX);
        self
    }

    pub fn provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<ClockSyncService, ClockError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("tix-cutoff/", env!("CARGO_PKG_VERSION")))
            .timeout(self.provider_timeout)
            .build()
            .map_err(|e| ClockError::ClientError(e.to_string()))?;

        Ok(ClockSyncService {
            inner: Arc::new(ClockInner {
                providers: self.providers,
                http,
                system: self.system,
                refresh_interval: self.refresh_interval,
                provider_timeout: self.provider_timeout,
                offset: RwLock::new(ClockOffset::default()),
                in_flight: Mutex::new(None),
            }),
        })
    }
}

impl ClockSyncService {
    /// Start building a service over `providers` (tried in order)
    pub fn builder(providers: Vec<Arc<dyn TimeProvider>>) -> ClockSyncBuilder {
        ClockSyncBuilder {
            providers,
            system: Arc::new(HostClock),
            refresh_interval: ChronoDuration::seconds(DEFAULT_REFRESH_INTERVAL_SECS),
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    /// Service wired to the configured providers and the host clock
    pub fn from_config(config: &ClockConfig) -> Result<Self, ClockError> {
        Self::builder(providers_from_config(&config.providers))
            .refresh_interval(Duration::from_secs(config.refresh_interval_secs))
            .provider_timeout(Duration::from_secs(config.provider_timeout_secs))
            .build()
    }

    /// Corrected current instant: host clock plus offset.
    ///
    /// Never blocks on the network; before the first successful sync the
    /// offset is zero.
    pub fn now(&self) -> DateTime<Utc> {
        let offset = self.offset();
        self.inner.system.now() + ChronoDuration::milliseconds(offset.offset_millis)
    }

    /// Snapshot of the stored offset
    pub fn offset(&self) -> ClockOffset {
        *self.inner.offset.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn status(&self) -> ClockStatus {
        let offset = self.offset();
        let since_last_sync_secs = offset
            .last_synced_at
            .map(|synced| (self.now() - synced).num_seconds());

        ClockStatus {
            offset_millis: offset.offset_millis,
            last_synced_at: offset.last_synced_at,
            since_last_sync_secs,
            since_last_sync: format_elapsed_opt(since_last_sync_secs),
            ever_synced: offset.last_synced_at.is_some(),
        }
    }

    /// Sync unless the offset is younger than the refresh interval.
    ///
    /// Never fails: a failed sync leaves the previous offset in place.
    pub async fn ensure_synced(&self) -> SyncOutcome {
        match self.join_or_start(false) {
            Some(sync) => sync.await,
            None => SyncOutcome::Fresh,
        }
    }

    /// Sync regardless of offset age (still shares an in-flight sync)
    pub async fn sync_now(&self) -> SyncOutcome {
        match self.join_or_start(true) {
            Some(sync) => sync.await,
            None => SyncOutcome::Fresh,
        }
    }

    fn is_fresh(&self) -> bool {
        match self.offset().last_synced_at {
            Some(synced) => self.now() - synced < self.inner.refresh_interval,
            None => false,
        }
    }

    /// Return the in-flight sync, starting one if needed.
    ///
    /// `None` means the offset is fresh and `force` was not set. The slot
    /// lock is released before anyone awaits.
    fn join_or_start(&self, force: bool) -> Option<SharedSync> {
        let mut slot = self.inner.in_flight.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(existing) = slot.as_ref() {
            debug!("Joining in-flight clock sync");
            return Some(existing.clone());
        }

        if !force && self.is_fresh() {
            return None;
        }

        let inner = Arc::clone(&self.inner);
        let sync = async move {
            let outcome = inner.run_sync().await;
            inner.in_flight.lock().unwrap_or_else(|e| e.into_inner()).take();
            outcome
        }
        .boxed()
        .shared();

        *slot = Some(sync.clone());
        Some(sync)
    }
}

impl ClockInner {
    async fn run_sync(&self) -> SyncOutcome {
        for provider in &self.providers {
            let sent_at = self.system.now();
            let result = tokio::time::timeout(self.provider_timeout, provider.fetch(&self.http))
                .await
                .unwrap_or(Err(ClockError::Timeout(self.provider_timeout)));
            let received_at = self.system.now();

            match result {
                Ok(remote) => {
                    // Half the round trip is attributed to each direction
                    let midpoint = sent_at + (received_at - sent_at) / 2;
                    let offset_millis = (remote - midpoint).num_milliseconds();
                    let synced_at = received_at + ChronoDuration::milliseconds(offset_millis);

                    *self.offset.write().unwrap_or_else(|e| e.into_inner()) = ClockOffset {
                        offset_millis,
                        last_synced_at: Some(synced_at),
                    };

                    info!(
                        provider = provider.name(),
                        offset_ms = offset_millis,
                        rtt_ms = (received_at - sent_at).num_milliseconds(),
                        "Clock synchronized"
                    );
                    return SyncOutcome::Synced {
                        provider: provider.name(),
                        offset_millis,
                    };
                }
                Err(e) => {
                    debug!(provider = provider.name(), error = %e, "Time provider failed");
                }
            }
        }

        let kept = self.offset.read().unwrap_or_else(|e| e.into_inner()).offset_millis;
        warn!(
            providers = self.providers.len(),
            offset_ms = kept,
            "All time providers failed; keeping previous clock offset"
        );
        SyncOutcome::AllProvidersFailed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tix_common::ManualClock;

    /// Reports the manual clock shifted by a fixed skew
    struct SkewedProvider {
        clock: Arc<ManualClock>,
        skew: ChronoDuration,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TimeProvider for SkewedProvider {
        fn name(&self) -> &'static str {
            "skewed"
        }

        fn endpoint(&self) -> String {
            "memory://skewed".to_string()
        }

        fn parse(&self, _body: &str) -> Result<DateTime<Utc>, ClockError> {
            unreachable!()
        }

        async fn fetch(&self, _http: &reqwest::Client) -> Result<DateTime<Utc>, ClockError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.clock.now() + self.skew)
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_now_is_host_clock_before_first_sync() {
        let clock = Arc::new(ManualClock::new(start()));
        let service = ClockSyncService::builder(vec![])
            .system_clock(clock.clone())
            .build()
            .unwrap();

        assert_eq!(service.now(), start());
        let status = service.status();
        assert!(!status.ever_synced);
        assert_eq!(status.offset_millis, 0);
        assert_eq!(status.since_last_sync, "never");
    }

    #[tokio::test]
    async fn test_sync_applies_offset() {
        let clock = Arc::new(ManualClock::new(start()));
        let provider = Arc::new(SkewedProvider {
            clock: clock.clone(),
            skew: ChronoDuration::seconds(-90),
            calls: AtomicUsize::new(0),
        });
        let service = ClockSyncService::builder(vec![provider.clone()])
            .system_clock(clock.clone())
            .build()
            .unwrap();

        let outcome = service.ensure_synced().await;
        assert_eq!(
            outcome,
            SyncOutcome::Synced {
                provider: "skewed",
                offset_millis: -90_000
            }
        );
        assert_eq!(service.now(), start() - ChronoDuration::seconds(90));
        assert!(service.status().ever_synced);
    }

    #[tokio::test]
    async fn test_fresh_offset_skips_network() {
        let clock = Arc::new(ManualClock::new(start()));
        let provider = Arc::new(SkewedProvider {
            clock: clock.clone(),
            skew: ChronoDuration::seconds(3),
            calls: AtomicUsize::new(0),
        });
        let service = ClockSyncService::builder(vec![provider.clone()])
            .system_clock(clock.clone())
            .build()
            .unwrap();

        service.ensure_synced().await;
        clock.advance(ChronoDuration::minutes(29));
        assert_eq!(service.ensure_synced().await, SyncOutcome::Fresh);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        clock.advance(ChronoDuration::minutes(2));
        assert!(matches!(service.ensure_synced().await, SyncOutcome::Synced { .. }));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_sync_now_ignores_freshness() {
        let clock = Arc::new(ManualClock::new(start()));
        let provider = Arc::new(SkewedProvider {
            clock: clock.clone(),
            skew: ChronoDuration::zero(),
            calls: AtomicUsize::new(0),
        });
        let service = ClockSyncService::builder(vec![provider.clone()])
            .system_clock(clock)
            .build()
            .unwrap();

        service.sync_now().await;
        service.sync_now().await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_no_providers_keeps_zero_offset() {
        let clock = Arc::new(ManualClock::new(start()));
        let service = ClockSyncService::builder(vec![])
            .system_clock(clock)
            .build()
            .unwrap();

        assert_eq!(service.ensure_synced().await, SyncOutcome::AllProvidersFailed);
        assert_eq!(service.now(), start());
    }
}
