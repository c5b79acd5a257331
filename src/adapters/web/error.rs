//! HTTP error responses for web adapter.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::domain::error::SnowballError;

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub message: String,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<SnowballError> for WebError {
    fn from(err: SnowballError) -> Self {
        Self::new(status_from_error(&err), err.to_string())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Validation problems are the caller's fault, data gaps are unprocessable,
/// everything the caller cannot influence is a server error.
pub fn status_from_error(err: &SnowballError) -> StatusCode {
    match err {
        SnowballError::ConfigMissing { .. }
        | SnowballError::ConfigInvalid { .. }
        | SnowballError::ConfigParse { .. }
        | SnowballError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
        SnowballError::NotFound { .. } => StatusCode::NOT_FOUND,
        SnowballError::NoData { .. }
        | SnowballError::InsufficientHistory { .. }
        | SnowballError::InsufficientData { .. }
        | SnowballError::DegenerateTimeSpan
        | SnowballError::InvalidPrice { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        SnowballError::Database { .. }
        | SnowballError::DatabaseQuery { .. }
        | SnowballError::UnknownTicker { .. }
        | SnowballError::PriceSheet { .. }
        | SnowballError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
