//! Request dispatch: the per-request hot path of a proxy instance.
//!
//! # Responsibilities
//! - Refuse new work once the instance is closing
//! - Resolve location and peer, rewrite the target
//! - Forward to the peer and relay its response as a stream
//!
//! # Design Decisions
//! - Both "no location" and "no peers" answer 404
//! - Transport failures answer 500 and leave the peer pooled
//! - `Host` is replaced with the peer's host; hop-by-hop headers are dropped

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::uri::Scheme;
use axum::http::{Uri, Version};
use axum::response::Response;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use thiserror::Error;

use crate::load_balancer::peer::Peer;
use crate::proxy::instance::{ProxyInstance, Resolution};
use crate::proxy::pages;

/// Failure while forwarding to a selected peer.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("upstream transport error: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("invalid upstream target: {0}")]
    InvalidTarget(String),
}

const HOP_BY_HOP: [HeaderName; 6] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Axum fallback handler bound to an instance.
pub(crate) async fn handle(
    State(instance): State<Arc<ProxyInstance>>,
    request: Request,
) -> Response {
    dispatch(&instance, request).await
}

/// Route one request through `instance`.
pub async fn dispatch(instance: &ProxyInstance, request: Request) -> Response {
    let start_time = Instant::now();
    let events = instance.events();
    let proxy = instance.label();

    if !instance.is_accepting() {
        let response = pages::unavailable();
        events.on_response(proxy, None, response.status(), start_time.elapsed());
        return response;
    }

    events.on_request(proxy, request.method(), request.uri());

    let (peer, path_and_query) = match instance.resolve(request.uri()) {
        Resolution::Forward {
            peer,
            path_and_query,
        } => (peer, path_and_query),
        Resolution::NoRoute => {
            tracing::debug!(proxy, path = %request.uri().path(), "No location matched");
            let response = pages::not_found();
            events.on_response(proxy, None, response.status(), start_time.elapsed());
            return response;
        }
        Resolution::NoPeers => {
            tracing::debug!(proxy, path = %request.uri().path(), "Location matched but pool is empty");
            let response = pages::not_found();
            events.on_response(proxy, None, response.status(), start_time.elapsed());
            return response;
        }
    };

    tracing::trace!(proxy, peer = %peer, target = %path_and_query, "Forwarding to peer");

    let response = match forward(instance.client(), request, &peer, &path_and_query).await {
        Ok(response) => response,
        Err(e) => {
            events.on_error(proxy, &peer, &e);
            pages::internal_error()
        }
    };
    events.on_response(proxy, Some(peer.as_ref()), response.status(), start_time.elapsed());
    response
}

async fn forward(
    client: &Client<HttpConnector, Body>,
    request: Request,
    peer: &Peer,
    path_and_query: &str,
) -> Result<Response, DispatchError> {
    let (mut parts, body) = request.into_parts();

    parts.uri = Uri::builder()
        .scheme(Scheme::HTTP)
        .authority(peer.authority.as_str())
        .path_and_query(path_and_query)
        .build()
        .map_err(|e| DispatchError::InvalidTarget(e.to_string()))?;
    parts.version = Version::HTTP_11;

    strip_hop_by_hop(&mut parts.headers);
    let host = HeaderValue::from_str(&peer.host_header)
        .map_err(|e| DispatchError::InvalidTarget(e.to_string()))?;
    parts.headers.insert(header::HOST, host);

    let response = client.request(Request::from_parts(parts, body)).await?;

    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Ok(Response::from_parts(parts, Body::new(body)))
}

/// Remove hop-by-hop headers, including any named by `Connection`.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
    headers.remove("keep-alive");
    headers.remove("proxy-connection");
}
