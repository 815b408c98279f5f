//! Open-Meteo forecast access.
//!
//! Both providers (temperature and air quality) answer with an hourly series
//! that is reduced to one daily value by sampling 14:00 local time.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use reqwest::{Client, ClientBuilder};
use serde::Deserialize;
use tracing::debug;

use crate::config::Config;
use crate::error::{AppError, Result};

// Create a static client to reuse connections
static CLIENT: Lazy<Client> = Lazy::new(|| {
    ClientBuilder::new()
        .timeout(Duration::from_secs(10))
        .connect_timeout(Duration::from_secs(5))
        .pool_max_idle_per_host(100)
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .expect("Failed to build HTTP client")
});

const SAMPLE_HOUR: &str = "14";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Temperature,
    Pm25,
}

impl Metric {
    /// Name of the hourly field in both the query and the response.
    pub fn field(self) -> &'static str {
        match self {
            Metric::Temperature => "temperature_2m",
            Metric::Pm25 => "pm2_5",
        }
    }

    fn path(self) -> &'static str {
        match self {
            Metric::Temperature => "/v1/forecast",
            Metric::Pm25 => "/v1/air-quality",
        }
    }

    fn provider(self) -> &'static str {
        match self {
            Metric::Temperature => "weather API",
            Metric::Pm25 => "air quality API",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastWindow {
    /// Provider default: the next 7 days.
    SevenDay,
    /// A single calendar day.
    Date(NaiveDate),
}

#[async_trait]
pub trait ForecastSource: Send + Sync {
    /// Returns the 14:00 value of `metric` at the given coordinates, averaged
    /// over every day in `window` and rounded to two decimals.
    async fn fetch_daily(
        &self,
        metric: Metric,
        lat: f64,
        long: f64,
        window: ForecastWindow,
    ) -> Result<f64>;
}

#[derive(Debug, Deserialize)]
pub struct HourlySeries {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(flatten)]
    pub values: HashMap<String, Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
struct HourlyResponse {
    hourly: HourlySeries,
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Averages every sample whose timestamp (`YYYY-MM-DDTHH:MM`) falls on hour 14.
pub fn reduce_hourly(series: &HourlySeries, field: &str) -> Result<f64> {
    let values = series
        .values
        .get(field)
        .ok_or_else(|| AppError::DataFormat(format!("response has no hourly {} series", field)))?;

    let samples: Vec<f64> = series
        .time
        .iter()
        .zip(values.iter())
        .filter(|(time, _)| time.get(11..13) == Some(SAMPLE_HOUR))
        .filter_map(|(_, value)| *value)
        .collect();

    if samples.is_empty() {
        return Err(AppError::DataFormat(format!("no 14:00 {} samples in forecast", field)));
    }

    let avg = samples.iter().sum::<f64>() / samples.len() as f64;
    Ok(round2(avg))
}

#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: Client,
    forecast_base_url: String,
    air_quality_base_url: String,
}

impl OpenMeteoClient {
    pub fn new(forecast_base_url: &str, air_quality_base_url: &str) -> Self {
        Self::with_client(CLIENT.clone(), forecast_base_url, air_quality_base_url)
    }

    pub fn with_client(client: Client, forecast_base_url: &str, air_quality_base_url: &str) -> Self {
        Self {
            client,
            forecast_base_url: forecast_base_url.trim_end_matches('/').to_string(),
            air_quality_base_url: air_quality_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.forecast_base_url, &config.air_quality_base_url)
    }

    fn url(&self, metric: Metric) -> String {
        let base = match metric {
            Metric::Temperature => &self.forecast_base_url,
            Metric::Pm25 => &self.air_quality_base_url,
        };
        format!("{}{}", base, metric.path())
    }

    fn query(metric: Metric, lat: f64, long: f64, window: ForecastWindow) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("latitude", format!("{:.4}", lat)),
            ("longitude", format!("{:.4}", long)),
            ("hourly", metric.field().to_string()),
            ("timezone", "auto".to_string()),
        ];
        if let ForecastWindow::Date(date) = window {
            let day = date.format("%Y-%m-%d").to_string();
            query.push(("start_date", day.clone()));
            query.push(("end_date", day));
        }
        query
    }
}

#[async_trait]
impl ForecastSource for OpenMeteoClient {
    async fn fetch_daily(
        &self,
        metric: Metric,
        lat: f64,
        long: f64,
        window: ForecastWindow,
    ) -> Result<f64> {
        debug!(%metric, lat, long, ?window, "fetching forecast");

        let response = self
            .client
            .get(self.url(metric))
            .query(&Self::query(metric, lat, long, window))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Transport(format!(
                "{} returned status {}",
                metric.provider(),
                status.as_u16()
            )));
        }

        let body = response.text().await?;
        let data: HourlyResponse = serde_json::from_str(&body)?;

        reduce_hourly(&data.hourly, metric.field())
    }
}
