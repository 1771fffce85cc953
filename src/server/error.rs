//! Mapping of library errors onto `(status, {"error": …})` responses.

use crate::error::ShotError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

/// Error type returned by every handler.
#[derive(Debug)]
pub enum ApiError {
    /// The request body could not be read as the expected JSON.
    BadRequest(String),
    /// The library refused or failed the call.
    Shot(ShotError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Shot(err) => {
                let status = StatusCode::from_u16(err.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                if status.is_server_error() {
                    error!("Request failed: {}", err);
                } else {
                    warn!("Request rejected: {}", err);
                }
                (status, err.public_message())
            }
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

impl From<ShotError> for ApiError {
    fn from(err: ShotError) -> Self {
        ApiError::Shot(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}
