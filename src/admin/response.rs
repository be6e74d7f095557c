//! Response envelope and error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::admin::validation::ValidationError;
use crate::error::RegistryError;

/// `{"success":true,"data":<data>}`
pub fn success<T: Serialize>(data: T) -> Response {
    Json(json!({ "success": true, "data": data })).into_response()
}

fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "error": message }))).into_response()
}

/// Everything an admin handler can fail with.
#[derive(Debug)]
pub enum ApiError {
    BadJson,
    TooLarge,
    NotFound,
    Validation(ValidationError),
    Registry(RegistryError),
    /// The registry task panicked or was cancelled.
    Internal,
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::Validation(e)
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        ApiError::Registry(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadJson => failure(StatusCode::BAD_REQUEST, "400 Body Not A Valid JSON"),
            ApiError::TooLarge => failure(StatusCode::PAYLOAD_TOO_LARGE, "413 Body Too Large"),
            ApiError::NotFound => failure(StatusCode::NOT_FOUND, "404 NotFound"),
            ApiError::Validation(e) => failure(StatusCode::OK, &e.to_string()),
            ApiError::Registry(e) => failure(StatusCode::OK, &e.to_string()),
            ApiError::Internal => failure(StatusCode::INTERNAL_SERVER_ERROR, "system error"),
        }
    }
}
