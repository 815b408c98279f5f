use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Same-day, same-hour pair of provider values for one location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyReading {
    pub temperature_celsius: f64,
    pub pm25: f64,
}

/// Per-point merge of the two provider values. `rank` is 0 until ranked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeRecord {
    #[serde(rename = "id")]
    pub point_id: String,
    #[serde(rename = "name")]
    pub point_name: String,
    #[serde(default)]
    pub bn_name: String,
    #[serde(rename = "avg_temp_2pm_celsius")]
    pub avg_temp_celsius: f64,
    pub avg_pm25: f64,
    pub rank: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopDestinations {
    pub generated_at: DateTime<Utc>,
    pub description: String,
    pub destinations: Vec<CompositeRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Recommended,
    #[serde(rename = "Not Recommended")]
    NotRecommended,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationReading {
    pub name: String,
    #[serde(rename = "temp_2pm_celsius")]
    pub temp_celsius: f64,
    pub pm25: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvisoryResult {
    #[serde(rename = "recommendation")]
    pub verdict: Verdict,
    pub reason: String,
    pub travel_date: NaiveDate,
    #[serde(rename = "current_location")]
    pub current: LocationReading,
    pub destination: LocationReading,
    #[serde(rename = "temperature_difference_celsius")]
    pub temp_diff: f64,
    #[serde(rename = "pm25_difference")]
    pub pm25_diff: f64,
}

/// Caller-supplied location; not required to be a tracked point.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentLocation {
    pub lat: f64,
    pub long: f64,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdvisoryRequest {
    pub current: CurrentLocation,
    pub destination_name: String,
    pub travel_date: String,
}
