//! Time-to-live cache over the fleet ranking.
//!
//! Reads are served from a single shared entry behind a reader/writer lock.
//! When the entry is missing or older than the TTL, one caller refreshes it
//! while concurrent callers keep receiving the previous (stale) entry.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::aggregate::FleetAggregator;
use crate::error::{AppError, Result};
use crate::models::{CompositeRecord, TopDestinations};
use crate::points::PointStore;

const DESCRIPTION: &str =
    "Top 10 coolest and cleanest districts based on 7-day forecast (2PM temperature and PM2.5 levels)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Empty,
    Fresh,
    Stale,
    Refreshing,
}

struct CacheEntry {
    records: Vec<CompositeRecord>,
    computed_at: DateTime<Utc>,
    refreshed: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.refreshed.elapsed() < ttl
    }

    /// Readers always get their own copy of the records.
    fn snapshot(&self) -> TopDestinations {
        TopDestinations {
            generated_at: self.computed_at,
            description: DESCRIPTION.to_string(),
            destinations: self.records.clone(),
        }
    }
}

#[derive(Default)]
struct Inner {
    entry: Option<CacheEntry>,
    refreshing: bool,
}

impl Inner {
    fn fresh_snapshot(&self, ttl: Duration) -> Option<TopDestinations> {
        self.entry
            .as_ref()
            .filter(|entry| entry.is_fresh(ttl))
            .map(CacheEntry::snapshot)
    }
}

/// Clears the in-progress flag even when the refreshing future is dropped.
struct RefreshGuard<'a> {
    inner: &'a RwLock<Inner>,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .refreshing = false;
    }
}

pub struct RefreshingCache {
    fleet: FleetAggregator,
    points: Arc<PointStore>,
    ttl: Duration,
    inner: RwLock<Inner>,
}

impl RefreshingCache {
    pub fn new(fleet: FleetAggregator, points: Arc<PointStore>, ttl: Duration) -> Self {
        Self {
            fleet,
            points,
            ttl,
            inner: RwLock::new(Inner::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> CacheState {
        let inner = self.read();
        match (&inner.entry, inner.refreshing) {
            (_, true) => CacheState::Refreshing,
            (None, false) => CacheState::Empty,
            (Some(entry), false) if entry.is_fresh(self.ttl) => CacheState::Fresh,
            (Some(_), false) => CacheState::Stale,
        }
    }

    /// Returns the ranked fleet, refreshing it first when it is missing or
    /// expired and nobody else is already doing so.
    pub async fn get_top(&self) -> Result<TopDestinations> {
        self.refresh_older_than(self.ttl).await
    }

    /// Recomputes the ranking even when the entry is still fresh. A refresh
    /// already in flight is joined by serving the current entry.
    pub async fn refresh(&self) -> Result<TopDestinations> {
        self.refresh_older_than(Duration::ZERO).await
    }

    async fn refresh_older_than(&self, max_age: Duration) -> Result<TopDestinations> {
        let cached = self.read().fresh_snapshot(max_age);
        if let Some(top) = cached {
            return Ok(top);
        }

        {
            let mut inner = self.write();
            if let Some(top) = inner.fresh_snapshot(max_age) {
                return Ok(top);
            }
            if inner.refreshing {
                if let Some(entry) = &inner.entry {
                    debug!("refresh in progress, serving stale destinations");
                    return Ok(entry.snapshot());
                }
            }
            inner.refreshing = true;
        }

        let _guard = RefreshGuard { inner: &self.inner };
        let started = Instant::now();
        let records = self.fleet.aggregate_all(self.points.points()).await;

        if records.is_empty() {
            let stale = self.read().entry.as_ref().map(CacheEntry::snapshot);
            return match stale {
                Some(top) => {
                    warn!("refresh produced no data, keeping stale destinations");
                    Ok(top)
                }
                None => Err(AppError::Transport(
                    "no forecast data available for any tracked point".to_string(),
                )),
            };
        }

        let entry = CacheEntry {
            records,
            computed_at: Utc::now(),
            refreshed: Instant::now(),
        };
        let top = entry.snapshot();
        self.write().entry = Some(entry);

        info!(count = top.destinations.len(), elapsed = ?started.elapsed(), "destinations cache refreshed");
        Ok(top)
    }

    /// [`get_top`](Self::get_top) bounded by `deadline`. On expiry any cached
    /// entry is served; only a never-populated cache yields `Timeout`.
    pub async fn get_top_within(&self, deadline: Duration) -> Result<TopDestinations> {
        match tokio::time::timeout(deadline, self.get_top()).await {
            Ok(result) => result,
            Err(_) => {
                let stale = self.read().entry.as_ref().map(CacheEntry::snapshot);
                stale.ok_or_else(|| {
                    AppError::Timeout(format!("top destinations not ready within {:?}", deadline))
                })
            }
        }
    }

    pub async fn warm(&self, deadline: Duration) -> Result<()> {
        self.get_top_within(deadline).await.map(|_| ())
    }

    /// Calls [`refresh`](Self::refresh) every `ttl / 2` until `shutdown`
    /// turns true or its sender is dropped, so the entry is replaced before
    /// it reaches the TTL.
    pub fn start_background_refresh(
        self: &Arc<Self>,
        deadline: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let cache = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval((cache.ttl / 2).max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        match tokio::time::timeout(deadline, cache.refresh()).await {
                            Ok(Ok(top)) => debug!(count = top.destinations.len(), "background refresh tick"),
                            Ok(Err(e)) => warn!(error = %e, "background refresh failed"),
                            Err(_) => warn!(?deadline, "background refresh exceeded its deadline"),
                        }
                    }
                }
            }

            info!("background refresh stopped");
        })
    }
}
