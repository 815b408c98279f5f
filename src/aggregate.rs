//! Per-point and fleet-wide forecast aggregation.

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::models::{CompositeRecord, DailyReading};
use crate::points::Point;
use crate::provider::{ForecastSource, ForecastWindow, Metric};
use crate::ranking;

/// Fetches temperature and PM2.5 concurrently. A temperature failure wins
/// over a PM2.5 failure when both fail.
pub async fn fetch_reading(
    source: &dyn ForecastSource,
    lat: f64,
    long: f64,
    window: ForecastWindow,
) -> Result<DailyReading> {
    let (temperature, pm25) = tokio::join!(
        source.fetch_daily(Metric::Temperature, lat, long, window),
        source.fetch_daily(Metric::Pm25, lat, long, window),
    );

    Ok(DailyReading {
        temperature_celsius: temperature?,
        pm25: pm25?,
    })
}

pub async fn aggregate_point(source: &dyn ForecastSource, point: &Point) -> Result<CompositeRecord> {
    let reading = fetch_reading(source, point.lat, point.long, ForecastWindow::SevenDay).await?;

    Ok(CompositeRecord {
        point_id: point.id.clone(),
        point_name: point.name.clone(),
        bn_name: point.bn_name.clone(),
        avg_temp_celsius: reading.temperature_celsius,
        avg_pm25: reading.pm25,
        rank: 0,
    })
}

enum Outcome {
    Fetched(CompositeRecord),
    Failed { point: Point, error: AppError },
}

pub struct FleetAggregator {
    source: Arc<dyn ForecastSource>,
    concurrency: usize,
}

impl FleetAggregator {
    pub fn new(source: Arc<dyn ForecastSource>, concurrency: usize) -> Self {
        Self { source, concurrency: concurrency.max(1) }
    }

    /// Aggregates every point with at most `concurrency` points in flight and
    /// returns the ranked top list. Points that fail are logged and dropped.
    pub async fn aggregate_all(&self, points: &[Point]) -> Vec<CompositeRecord> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let (tx, mut rx) = mpsc::channel(points.len().max(1));
        let mut tasks = JoinSet::new();

        for point in points.iter().cloned() {
            let tx = tx.clone();
            let source = Arc::clone(&self.source);
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                let outcome = match aggregate_point(source.as_ref(), &point).await {
                    Ok(record) => Outcome::Fetched(record),
                    Err(error) => Outcome::Failed { point, error },
                };
                // Receiver only goes away when the caller was cancelled.
                let _ = tx.send(outcome).await;
            });
        }
        drop(tx);

        let mut records = Vec::with_capacity(points.len());
        let mut failed = 0usize;
        while let Some(outcome) = rx.recv().await {
            match outcome {
                Outcome::Fetched(record) => {
                    debug!(id = %record.point_id, temp = record.avg_temp_celsius, pm25 = record.avg_pm25, "point aggregated");
                    records.push(record);
                }
                Outcome::Failed { point, error } => {
                    failed += 1;
                    warn!(id = %point.id, name = %point.name, %error, "dropping point from fleet result");
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                failed += 1;
                warn!(error = %e, "aggregation task did not complete");
            }
        }

        info!(succeeded = records.len(), failed, "fleet aggregation finished");
        ranking::rank(records)
    }
}
