//! Per-instance event hooks.

use std::fmt;
use std::time::Duration;

use axum::http::{Method, StatusCode, Uri};

use crate::load_balancer::peer::Peer;
use crate::observability::metrics;
use crate::proxy::dispatch::DispatchError;

/// Hooks fired by a proxy instance. All methods default to no-ops.
///
/// `proxy` is the instance label (`address:port`).
pub trait ProxyEvents: Send + Sync + fmt::Debug {
    /// A request arrived and the instance is accepting.
    fn on_request(&self, _proxy: &str, _method: &Method, _uri: &Uri) {}

    /// A response is about to be returned. `peer` is `None` for locally
    /// generated pages that never reached a peer.
    fn on_response(
        &self,
        _proxy: &str,
        _peer: Option<&Peer>,
        _status: StatusCode,
        _elapsed: Duration,
    ) {
    }

    /// Forwarding to `peer` failed.
    fn on_error(&self, _proxy: &str, _peer: &Peer, _error: &DispatchError) {}

    /// The accept loop has ended.
    fn on_close(&self, _proxy: &str) {}
}

/// Default hooks: `tracing` events plus request metrics.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEvents;

impl ProxyEvents for TracingEvents {
    fn on_request(&self, proxy: &str, method: &Method, uri: &Uri) {
        tracing::trace!(proxy, method = %method, uri = %uri, "Proxy access");
    }

    fn on_response(&self, proxy: &str, peer: Option<&Peer>, status: StatusCode, elapsed: Duration) {
        match peer {
            Some(peer) => tracing::debug!(
                proxy,
                peer = %peer,
                status = status.as_u16(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Request proxied"
            ),
            None => tracing::debug!(proxy, status = status.as_u16(), "Request answered locally"),
        }
        metrics::record_request(proxy, status.as_u16(), elapsed);
    }

    fn on_error(&self, proxy: &str, peer: &Peer, error: &DispatchError) {
        tracing::warn!(proxy, peer = %peer, error = %error, "Peer request failed");
        metrics::record_upstream_error(proxy, &peer.authority);
    }

    fn on_close(&self, proxy: &str) {
        tracing::info!(proxy, "Proxy stopped");
    }
}
