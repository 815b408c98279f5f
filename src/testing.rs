//! Test doubles shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::points::Point;
use crate::provider::{ForecastSource, ForecastWindow, Metric};

fn key(metric: Metric, lat: f64, long: f64) -> (Metric, String) {
    (metric, format!("{:.4},{:.4}", lat, long))
}

/// Canned provider keyed by metric and coordinates.
#[derive(Default)]
pub struct FakeSource {
    values: Mutex<HashMap<(Metric, String), f64>>,
    failures: Mutex<HashMap<(Metric, String), String>>,
    windows: Mutex<Vec<ForecastWindow>>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self { delay, ..Self::default() }
    }

    pub fn set(&self, lat: f64, long: f64, temp: f64, pm25: f64) {
        let mut values = self.values.lock().unwrap();
        values.insert(key(Metric::Temperature, lat, long), temp);
        values.insert(key(Metric::Pm25, lat, long), pm25);
    }

    pub fn set_point(&self, point: &Point, temp: f64, pm25: f64) {
        self.set(point.lat, point.long, temp, pm25);
    }

    pub fn fail(&self, metric: Metric, lat: f64, long: f64, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(key(metric, lat, long), message.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn windows(&self) -> Vec<ForecastWindow> {
        self.windows.lock().unwrap().clone()
    }
}

#[async_trait]
impl ForecastSource for FakeSource {
    async fn fetch_daily(
        &self,
        metric: Metric,
        lat: f64,
        long: f64,
        window: ForecastWindow,
    ) -> Result<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.windows.lock().unwrap().push(window);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let key = key(metric, lat, long);
        if let Some(message) = self.failures.lock().unwrap().get(&key) {
            return Err(AppError::Transport(message.clone()));
        }
        self.values
            .lock()
            .unwrap()
            .get(&key)
            .copied()
            .ok_or_else(|| AppError::DataFormat(format!("no 14:00 {} samples in forecast", metric)))
    }
}

pub fn point(id: &str, name: &str, lat: f64, long: f64) -> Point {
    Point { id: id.to_string(), name: name.to_string(), bn_name: format!("{} (bn)", name), lat, long }
}

/// `count` points on distinct coordinates, named `Point 1`..`Point N`.
pub fn grid(count: usize) -> Vec<Point> {
    (1..=count)
        .map(|i| point(&i.to_string(), &format!("Point {}", i), 20.0 + i as f64, 90.0 + i as f64))
        .collect()
}
