use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::{HeaderName, HeaderValue, Method},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::api::models::{HealthResponse, RecommendationRequest};
use crate::api::response;
use crate::error::Result;
use crate::models::{AdvisoryRequest, AdvisoryResult};
use crate::AppState;

const RESPONSE_TIME_HEADER: HeaderName = HeaderName::from_static("x-response-time");

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/destinations/top", get(top_destinations_handler))
        .route("/api/v1/travel/recommendation", post(recommendation_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(Any),
        )
        .with_state(app_state)
}

async fn health_handler() -> impl IntoResponse {
    response::success(HealthResponse { status: "healthy".to_string() })
}

async fn top_destinations_handler(State(state): State<AppState>) -> Response {
    let start_time = Instant::now();
    let result = state.cache.get_top_within(state.config.top_deadline).await;
    let elapsed = start_time.elapsed();

    let response = match result {
        Ok(top) => {
            info!(count = top.destinations.len(), ?elapsed, "served top destinations");
            response::success(top).into_response()
        }
        Err(err) => {
            warn!(error = %err, ?elapsed, "top destinations request failed");
            err.into_response()
        }
    };
    with_response_time(response, elapsed)
}

async fn recommendation_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RecommendationRequest>, JsonRejection>,
) -> Response {
    let start_time = Instant::now();
    let result = process_recommendation(&state, payload).await;
    let elapsed = start_time.elapsed();

    let response = match result {
        Ok(advisory) => {
            info!(destination = %advisory.destination.name, ?elapsed, "served travel recommendation");
            response::success(advisory).into_response()
        }
        Err(err) => {
            warn!(error = %err, ?elapsed, "travel recommendation failed");
            err.into_response()
        }
    };
    with_response_time(response, elapsed)
}

async fn process_recommendation(
    state: &AppState,
    payload: std::result::Result<Json<RecommendationRequest>, JsonRejection>,
) -> Result<AdvisoryResult> {
    let Json(body) = payload?;
    let request = AdvisoryRequest::try_from(body)?;
    state.advisor.compare(&request).await
}

fn with_response_time(mut response: Response, elapsed: Duration) -> Response {
    if let Ok(value) = HeaderValue::from_str(&format!("{:?}", elapsed)) {
        response.headers_mut().insert(RESPONSE_TIME_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::LocationBody;
    use crate::config::Config;
    use crate::points::PointStore;
    use crate::testing::{point, FakeSource};
    use axum::http::StatusCode;
    use chrono::{Days, Utc};
    use serde_json::Value;
    use std::sync::Arc;

    fn state(source: Arc<FakeSource>) -> AppState {
        let points = vec![
            point("1", "Sylhet", 24.8949, 91.8687),
            point("2", "Bandarban", 22.1953, 92.2184),
        ];
        source.set_point(&points[0], 29.0, 45.0);
        source.set_point(&points[1], 26.5, 20.0);
        let store = PointStore::from_points(points).unwrap();
        AppState::build(Config::default(), store, source)
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn recommendation(destination: &str, travel_date: &str) -> RecommendationRequest {
        RecommendationRequest {
            current_location: LocationBody { lat: 23.8103, long: 90.4125, name: Some("Dhaka".to_string()) },
            destination_district_name: destination.to_string(),
            travel_date: travel_date.to_string(),
        }
    }

    fn tomorrow() -> String {
        (Utc::now().date_naive() + Days::new(1)).format("%Y-%m-%d").to_string()
    }

    #[tokio::test]
    async fn top_destinations_are_ranked_in_envelope() {
        let state = state(Arc::new(FakeSource::new()));

        let response = top_destinations_handler(State(state)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-response-time"));

        let body = json_body(response).await;
        assert_eq!(body["meta"]["status"], "success");
        let destinations = body["data"]["destinations"].as_array().unwrap();
        assert_eq!(destinations.len(), 2);
        assert_eq!(destinations[0]["name"], "Bandarban");
        assert_eq!(destinations[0]["bn_name"], "Bandarban (bn)");
        assert_eq!(destinations[0]["rank"], 1);
        assert_eq!(destinations[0]["avg_temp_2pm_celsius"], 26.5);
        assert!(body["data"]["generated_at"].is_string());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_first_fetch_maps_to_gateway_timeout() {
        let source = Arc::new(FakeSource::with_delay(Duration::from_secs(5)));
        let state = state(source);

        let response = top_destinations_handler(State(state)).await;
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        let body = json_body(response).await;
        assert_eq!(body["meta"]["status"], "error");
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn recommendation_success() {
        let source = Arc::new(FakeSource::new());
        source.set(23.8103, 90.4125, 33.0, 80.0);
        let state = state(source);

        let response =
            recommendation_handler(State(state), Ok(Json(recommendation("Bandarban", &tomorrow())))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["data"]["recommendation"], "Recommended");
        assert_eq!(body["data"]["temperature_difference_celsius"], 6.5);
        assert_eq!(body["data"]["pm25_difference"], 60.0);
        assert_eq!(body["data"]["current_location"]["name"], "Dhaka");
    }

    #[tokio::test]
    async fn recommendation_validation_errors_are_bad_requests() {
        let state = state(Arc::new(FakeSource::new()));

        let unknown = recommendation_handler(
            State(state.clone()),
            Ok(Json(recommendation("Atlantis", &tomorrow()))),
        )
        .await;
        assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);
        let body = json_body(unknown).await;
        assert!(body["meta"]["message"].as_str().unwrap().contains("destination not found"));

        let bad_date =
            recommendation_handler(State(state.clone()), Ok(Json(recommendation("Sylhet", "invalid-date")))).await;
        assert_eq!(bad_date.status(), StatusCode::BAD_REQUEST);

        let missing =
            recommendation_handler(State(state), Ok(Json(recommendation("", &tomorrow())))).await;
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn recommendation_provider_failure_is_bad_gateway() {
        // no values registered for the current location
        let state = state(Arc::new(FakeSource::new()));

        let response =
            recommendation_handler(State(state), Ok(Json(recommendation("Sylhet", &tomorrow())))).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn health_reports_healthy() {
        let response = health_handler().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["data"]["status"], "healthy");
    }
}
