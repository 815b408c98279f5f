pub mod advisory;
pub mod aggregate;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod points;
pub mod provider;
pub mod ranking;
pub mod shutdown;

#[cfg(test)]
mod testing;

use std::sync::Arc;
use advisory::AdvisoryComparator;
use aggregate::FleetAggregator;
use cache::RefreshingCache;
use config::Config;
use points::PointStore;
use provider::ForecastSource;

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cache: Arc<RefreshingCache>,
    pub advisor: Arc<AdvisoryComparator>,
}

impl AppState {
    /// Wires the cache and the advisory comparator over one forecast source.
    pub fn build(config: Config, points: PointStore, source: Arc<dyn ForecastSource>) -> Self {
        let points = Arc::new(points);
        let fleet = FleetAggregator::new(Arc::clone(&source), config.fetch_concurrency);
        let cache = RefreshingCache::new(fleet, Arc::clone(&points), config.cache_ttl);
        let advisor = AdvisoryComparator::new(source, points, config.forecast_horizon_days);

        AppState {
            config: Arc::new(config),
            cache: Arc::new(cache),
            advisor: Arc::new(advisor),
        }
    }
}
