//! Admin endpoint handlers.
//!
//! Each handler parses and validates its body, then runs one registry call on
//! the blocking pool.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use serde_json::Value;

use crate::admin::response::{success, ApiError};
use crate::admin::validation;
use crate::admin::AdminState;
use crate::error::RegistryError;
use crate::registry::ProxyRegistry;

type RawBody = Result<Bytes, BytesRejection>;

/// Empty bodies parse as `null`.
fn parse_body(body: RawBody) -> Result<Value, ApiError> {
    let bytes = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::TooLarge
        } else {
            ApiError::BadJson
        }
    })?;
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&bytes).map_err(|_| ApiError::BadJson)
}

/// Run a registry call on the blocking pool; it does synchronous store I/O.
async fn run<T, F>(registry: Arc<ProxyRegistry>, call: F) -> Result<T, ApiError>
where
    F: FnOnce(&ProxyRegistry) -> Result<T, RegistryError> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(move || call(&registry))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Registry task failed");
            ApiError::Internal
        })?;
    result.map_err(|e| {
        tracing::debug!(error = %e, "Registry rejected request");
        ApiError::from(e)
    })
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

pub async fn list_proxies(
    State(state): State<AdminState>,
    body: RawBody,
) -> Result<Response, ApiError> {
    parse_body(body)?;
    let proxies = run(state.registry, |registry| registry.list_all_proxy()).await?;
    Ok(success(proxies))
}

pub async fn add_proxy(State(state): State<AdminState>, body: RawBody) -> Result<Response, ApiError> {
    let draft = validation::proxy_draft(&parse_body(body)?)?;
    let id = run(state.registry, move |registry| registry.add_proxy(draft)).await?;
    Ok(success(id))
}

pub async fn delete_proxy(
    State(state): State<AdminState>,
    body: RawBody,
) -> Result<Response, ApiError> {
    let key = validation::proxy_key(&parse_body(body)?)?;
    run(state.registry, move |registry| registry.del_proxy(&key)).await?;
    Ok(success(()))
}

pub async fn add_location(
    State(state): State<AdminState>,
    body: RawBody,
) -> Result<Response, ApiError> {
    let value = parse_body(body)?;
    let key = validation::proxy_key(&value)?;
    let location = validation::location(&value)?;
    run(state.registry, move |registry| registry.add_location(&key, location)).await?;
    Ok(success(()))
}

pub async fn delete_location(
    State(state): State<AdminState>,
    body: RawBody,
) -> Result<Response, ApiError> {
    let value = parse_body(body)?;
    let key = validation::proxy_key(&value)?;
    let location = validation::location(&value)?;
    run(state.registry, move |registry| {
        registry.del_location(&key, &location.src, &location.dst)
    })
    .await?;
    Ok(success(()))
}

pub async fn add_backend(
    State(state): State<AdminState>,
    body: RawBody,
) -> Result<Response, ApiError> {
    let value = parse_body(body)?;
    let key = validation::proxy_key(&value)?;
    let backend = validation::backend(&value)?;
    run(state.registry, move |registry| registry.add_backend(&key, backend)).await?;
    Ok(success(()))
}

pub async fn delete_backend(
    State(state): State<AdminState>,
    body: RawBody,
) -> Result<Response, ApiError> {
    let value = parse_body(body)?;
    let key = validation::proxy_key(&value)?;
    let backend = validation::backend(&value)?;
    run(state.registry, move |registry| registry.del_backend(&key, &backend)).await?;
    Ok(success(()))
}
