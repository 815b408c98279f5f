use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::models::{AdvisoryRequest, CurrentLocation};

#[derive(Deserialize)]
pub struct LocationBody {
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub long: f64,
    pub name: Option<String>,
}

#[derive(Deserialize)]
pub struct RecommendationRequest {
    pub current_location: LocationBody,
    #[serde(default)]
    pub destination_district_name: String,
    #[serde(default)]
    pub travel_date: String,
}

impl TryFrom<RecommendationRequest> for AdvisoryRequest {
    type Error = ValidationError;

    fn try_from(body: RecommendationRequest) -> Result<Self, Self::Error> {
        if body.current_location.lat == 0.0 && body.current_location.long == 0.0 {
            return Err(ValidationError::MissingField(
                "current_location lat and long are required".to_string(),
            ));
        }
        if body.destination_district_name.trim().is_empty() {
            return Err(ValidationError::MissingField(
                "destination_district_name is required".to_string(),
            ));
        }
        if body.travel_date.trim().is_empty() {
            return Err(ValidationError::MissingField(
                "travel_date is required (format: YYYY-MM-DD)".to_string(),
            ));
        }

        Ok(AdvisoryRequest {
            current: CurrentLocation {
                lat: body.current_location.lat,
                long: body.current_location.long,
                name: body.current_location.name,
            },
            destination_name: body.destination_district_name,
            travel_date: body.travel_date,
        })
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}
