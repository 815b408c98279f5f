use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::api::response;

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid travel date format, use YYYY-MM-DD")]
    InvalidDate,

    #[error("travel date must be within the next {horizon_days} days")]
    OutOfRange { horizon_days: u32 },

    #[error("destination not found: {0}")]
    UnknownDestination(String),

    #[error("{0}")]
    MissingField(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Upstream request failed: {0}")]
    Transport(String),

    #[error("Unexpected forecast data: {0}")]
    DataFormat(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Transport(_) | AppError::DataFormat(_) => StatusCode::BAD_GATEWAY,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        response::error::<()>(status, self.to_string()).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Timeout(err.to_string())
        } else {
            AppError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::DataFormat(err.to_string())
    }
}

impl From<std::env::VarError> for AppError {
    fn from(err: std::env::VarError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(ValidationError::MissingField(format!(
            "invalid request body: {}",
            rejection.body_text()
        )))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
