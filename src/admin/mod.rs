//! Admin API (REST gateway).
//!
//! # Data Flow
//! ```text
//! HTTP request on the manager listener
//!     → router (exact path + method, otherwise 404 JSON)
//!     → handlers.rs (body → JSON → validation.rs)
//!     → ProxyRegistry on the blocking pool
//!     → response.rs ({"success":true,"data":..} or {"success":false,"error":..})
//! ```
//!
//! # Design Decisions
//! - Validation and domain failures answer HTTP 200 with `success:false`
//! - Only malformed JSON (400), oversized bodies (413), unknown routes (404)
//!   and internal faults (500) raise the status code

pub mod handlers;
pub mod response;
pub mod validation;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::registry::ProxyRegistry;
use self::handlers::*;

/// State shared by admin handlers.
#[derive(Debug, Clone)]
pub struct AdminState {
    pub registry: Arc<ProxyRegistry>,
}

pub fn setup_admin_router(registry: Arc<ProxyRegistry>, max_body_size: usize) -> Router {
    Router::new()
        .route("/aproxy/list", get(list_proxies).fallback(not_found))
        .route("/aproxy/add", post(add_proxy).fallback(not_found))
        .route("/aproxy/delete", post(delete_proxy).fallback(not_found))
        .route("/aproxy/location/add", post(add_location).fallback(not_found))
        .route("/aproxy/location/delete", post(delete_location).fallback(not_found))
        .route("/aproxy/backend/add", post(add_backend).fallback(not_found))
        .route("/aproxy/backend/delete", post(delete_backend).fallback(not_found))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(TraceLayer::new_for_http())
        .with_state(AdminState { registry })
}
