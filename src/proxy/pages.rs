//! Locally generated HTML pages.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

pub const NOT_FOUND_PAGE: &str = "<!DOCTYPE html><html><head><title>APROXY SERVER</title></head><body><h3>APROXY SERVER 404 NotFound</h3></body></html>";

pub const INTERNAL_ERROR_PAGE: &str = "<!DOCTYPE html><html><head><title>APROXY SERVER</title></head><body><h3>APROXY SERVER INTERNAL ERROR</h3></body></html>";

pub const UNAVAILABLE_PAGE: &str = "<!DOCTYPE html><html><head><title>APROXY SERVER</title></head><body><h3>APROXY SERVER 503 Service Unavailable</h3></body></html>";

/// No location matched, or the pool is empty.
pub fn not_found() -> Response {
    page(StatusCode::NOT_FOUND, NOT_FOUND_PAGE)
}

/// The peer could not be reached or the target could not be built.
pub fn internal_error() -> Response {
    page(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_PAGE)
}

/// The instance is closing.
pub fn unavailable() -> Response {
    page(StatusCode::SERVICE_UNAVAILABLE, UNAVAILABLE_PAGE)
}

fn page(status: StatusCode, body: &'static str) -> Response {
    (status, [(header::CONTENT_TYPE, "text/html")], body).into_response()
}
