//! Point-to-point travel advisory for a single date.

use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use tracing::info;

use crate::aggregate::fetch_reading;
use crate::error::{AppError, Result, ValidationError};
use crate::models::{AdvisoryRequest, AdvisoryResult, LocationReading, Verdict};
use crate::points::PointStore;
use crate::provider::{round2, ForecastSource, ForecastWindow};

pub const DEFAULT_CURRENT_NAME: &str = "Current Location";

pub struct AdvisoryComparator {
    source: Arc<dyn ForecastSource>,
    points: Arc<PointStore>,
    horizon_days: u32,
}

impl AdvisoryComparator {
    pub fn new(source: Arc<dyn ForecastSource>, points: Arc<PointStore>, horizon_days: u32) -> Self {
        Self { source, points, horizon_days }
    }

    pub async fn compare(&self, request: &AdvisoryRequest) -> Result<AdvisoryResult> {
        self.compare_as_of(Utc::now().date_naive(), request).await
    }

    /// Same as [`compare`](Self::compare) with an explicit current date.
    pub async fn compare_as_of(&self, today: NaiveDate, request: &AdvisoryRequest) -> Result<AdvisoryResult> {
        let travel_date = validate_travel_date(today, &request.travel_date, self.horizon_days)?;
        let destination = self
            .points
            .find_by_name(&request.destination_name)
            .ok_or_else(|| ValidationError::UnknownDestination(request.destination_name.clone()))?;

        let current_name = request
            .current
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_CURRENT_NAME)
            .to_string();

        let window = ForecastWindow::Date(travel_date);
        let source = self.source.as_ref();
        let (current, dest) = tokio::join!(
            fetch_reading(source, request.current.lat, request.current.long, window),
            fetch_reading(source, destination.lat, destination.long, window),
        );
        let current = current.map_err(|e| with_context(e, "current location"))?;
        let dest = dest.map_err(|e| with_context(e, "destination"))?;

        let temp_diff = round2(current.temperature_celsius - dest.temperature_celsius);
        let pm25_diff = round2(current.pm25 - dest.pm25);
        let verdict = verdict(temp_diff, pm25_diff);
        let reason = generate_reason(&destination.name, temp_diff, pm25_diff, verdict);

        info!(
            from = %current_name,
            to = %destination.name,
            date = %travel_date,
            temp_diff,
            pm25_diff,
            ?verdict,
            "travel advisory computed"
        );

        Ok(AdvisoryResult {
            verdict,
            reason,
            travel_date,
            current: LocationReading {
                name: current_name,
                temp_celsius: current.temperature_celsius,
                pm25: current.pm25,
            },
            destination: LocationReading {
                name: destination.name.clone(),
                temp_celsius: dest.temperature_celsius,
                pm25: dest.pm25,
            },
            temp_diff,
            pm25_diff,
        })
    }
}

fn with_context(err: AppError, location: &str) -> AppError {
    match err {
        AppError::Transport(msg) => AppError::Transport(format!("{} forecast: {}", location, msg)),
        AppError::DataFormat(msg) => AppError::DataFormat(format!("{} forecast: {}", location, msg)),
        AppError::Timeout(msg) => AppError::Timeout(format!("{} forecast: {}", location, msg)),
        other => other,
    }
}

/// Accepts `YYYY-MM-DD` dates from `today` through `today + horizon_days`.
pub fn validate_travel_date(
    today: NaiveDate,
    raw: &str,
    horizon_days: u32,
) -> std::result::Result<NaiveDate, ValidationError> {
    // chrono accepts unpadded fields and a leading sign, so require the
    // canonical spelling back.
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .filter(|date| date.format("%Y-%m-%d").to_string() == raw)
        .ok_or(ValidationError::InvalidDate)?;
    let last = today
        .checked_add_days(Days::new(u64::from(horizon_days)))
        .unwrap_or(NaiveDate::MAX);

    if date < today || date > last {
        return Err(ValidationError::OutOfRange { horizon_days });
    }
    Ok(date)
}

/// Only a strictly cooler and strictly cleaner destination qualifies.
pub fn verdict(temp_diff: f64, pm25_diff: f64) -> Verdict {
    if temp_diff > 0.0 && pm25_diff > 0.0 {
        Verdict::Recommended
    } else {
        Verdict::NotRecommended
    }
}

fn describe_temperature(temp_diff: f64) -> String {
    let magnitude = temp_diff.abs();
    if magnitude < 1.0 {
        return "has about the same temperature".to_string();
    }

    let strength = if magnitude <= 3.0 { "slightly" } else { "significantly" };
    let (direction, delta) = if temp_diff > 0.0 { ("cooler", "less") } else { ("hotter", "more") };
    format!("is {} {} ({:.1}°C {})", strength, direction, magnitude, delta)
}

fn describe_air(pm25_diff: f64) -> String {
    let magnitude = pm25_diff.abs();
    if magnitude < 5.0 {
        return "has similar air quality".to_string();
    }

    let direction = if pm25_diff > 0.0 { "better" } else { "worse" };
    if magnitude <= 15.0 {
        format!("has {} air quality", direction)
    } else {
        format!("has significantly {} air quality", direction)
    }
}

pub fn generate_reason(destination: &str, temp_diff: f64, pm25_diff: f64, verdict: Verdict) -> String {
    let closing = match verdict {
        Verdict::Recommended => "Enjoy your trip!",
        Verdict::NotRecommended => "You may want to reconsider this trip.",
    };
    format!(
        "{} {} and {}. {}",
        destination,
        describe_temperature(temp_diff),
        describe_air(pm25_diff),
        closing
    )
}
