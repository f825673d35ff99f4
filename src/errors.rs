use crate::subscribe::SubscribeError;
use axum::{http::StatusCode, Json};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please select a departure date.")]
    MissingDate,
    #[error("The return date must not be before the departure date.")]
    ReversedDates,
    #[error("Please select a valid destination with an IATA code.")]
    UnknownDestination,
    #[error("Please enter your email.")]
    MissingEmail,
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<SubscribeError> for AppError {
    fn from(err: SubscribeError) -> Self {
        match err {
            SubscribeError::MissingEmail => Self::bad_request("email is required"),
            SubscribeError::MissingConfiguration => {
                error!("subscription provider credentials are not configured");
                Self::configuration("Missing subscription configuration")
            }
            other => {
                warn!("subscription failed: {other}");
                Self::bad_gateway("Failed to subscribe")
            }
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
