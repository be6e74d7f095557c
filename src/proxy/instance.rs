//! A running proxy front-end.
//!
//! # Responsibilities
//! - Own the live location table and peer pool of one `(address, port)`
//! - Run the accept/dispatch loop on a dedicated thread and runtime
//! - Publish lifecycle transitions: Created → Starting → Active → Stopped
//!
//! # Design Decisions
//! - `close()` stops new dispatches first, then signals graceful shutdown;
//!   dispatches already past route matching drain
//! - Listen failures are logged and end in `Stopped`; they are not returned
//!   to whoever called `start()`

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::Uri;
use axum::Router;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use tokio::net::TcpListener;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::watch;

use crate::load_balancer::peer::Peer;
use crate::load_balancer::pool::PeerPool;
use crate::proxy::dispatch;
use crate::proxy::events::{ProxyEvents, TracingEvents};
use crate::routing::table::LocationTable;
use crate::topology::{Backend, Location};

const STOP_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Rebinding a port right after its previous owner closed can briefly fail.
const BIND_ATTEMPTS: u32 = 10;
const BIND_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Lifecycle of a proxy instance. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Starting,
    Active,
    Stopped,
}

/// Outcome of matching a request against the live tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No location matched the path.
    NoRoute,
    /// A location matched but the pool is empty.
    NoPeers,
    Forward {
        peer: Arc<Peer>,
        /// Rewritten path with the original query re-appended.
        path_and_query: String,
    },
}

/// Construction options shared by every instance a registry builds.
#[derive(Debug, Clone)]
pub struct InstanceOptions {
    /// Worker threads; `None` or `0` runs a current-thread runtime.
    pub threads: Option<u16>,
    pub connect_timeout: Duration,
    pub events: Arc<dyn ProxyEvents>,
}

impl Default for InstanceOptions {
    fn default() -> Self {
        Self {
            threads: None,
            connect_timeout: Duration::from_secs(5),
            events: Arc::new(TracingEvents),
        }
    }
}

/// One proxy front-end bound to `address:port`.
#[derive(Debug)]
pub struct ProxyInstance {
    address: String,
    port: u16,
    label: String,
    threads: Option<u16>,
    peers: PeerPool,
    locations: LocationTable,
    state: watch::Sender<LifecycleState>,
    accepting: AtomicBool,
    shutdown: watch::Sender<bool>,
    client: Client<HttpConnector, Body>,
    events: Arc<dyn ProxyEvents>,
}

impl ProxyInstance {
    pub fn new(address: impl Into<String>, port: u16, options: InstanceOptions) -> Self {
        let address = address.into();
        let label = format!("{}:{}", address, port);

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(options.connect_timeout));
        connector.set_nodelay(true);
        let client = Client::builder(TokioExecutor::new()).build(connector);

        let (state, _) = watch::channel(LifecycleState::Created);
        let (shutdown, _) = watch::channel(false);

        Self {
            address,
            port,
            label,
            threads: options.threads,
            peers: PeerPool::new(),
            locations: LocationTable::new(),
            state,
            accepting: AtomicBool::new(true),
            shutdown,
            client,
            events: options.events,
        }
    }

    /// Seed the tables. Duplicates are skipped the same way live adds are.
    pub fn with_routes(mut self, backends: &[Backend], locations: &[Location]) -> Self {
        self.peers = PeerPool::from_backends(backends);
        self.locations = LocationTable::from_locations(locations);
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `address:port`, used in logs and metric labels.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn threads(&self) -> Option<u16> {
        self.threads
    }

    pub fn add_peer(&self, host: &str, port: u16) -> bool {
        let added = self.peers.add(host, port);
        if added {
            tracing::info!(proxy = %self.label, peer_host = host, peer_port = port, "Peer added");
        }
        added
    }

    pub fn del_peer(&self, host: &str, port: u16) -> bool {
        let removed = self.peers.remove(host, port);
        if removed {
            tracing::info!(proxy = %self.label, peer_host = host, peer_port = port, "Peer removed");
        }
        removed
    }

    pub fn add_location(&self, location: Location) -> bool {
        let (order, src, dst) = (location.order, location.src.clone(), location.dst.clone());
        let added = self.locations.add(location);
        if added {
            tracing::info!(proxy = %self.label, order, src = %src, dst = %dst, "Location added");
        }
        added
    }

    pub fn del_location(&self, src: &str, dst: &str) -> bool {
        let removed = self.locations.remove(src, dst);
        if removed {
            tracing::info!(proxy = %self.label, src, dst, "Location removed");
        }
        removed
    }

    pub fn backends(&self) -> Vec<Backend> {
        self.peers.snapshot()
    }

    pub fn locations(&self) -> Vec<Location> {
        self.locations.snapshot()
    }

    /// Match `uri` against the location table and pick a peer.
    ///
    /// The table lock is released before the pool lock is taken.
    pub fn resolve(&self, uri: &Uri) -> Resolution {
        let Some(mut target) = self.locations.rewrite(uri.path()) else {
            return Resolution::NoRoute;
        };
        let Some(peer) = self.peers.next() else {
            return Resolution::NoPeers;
        };

        if !target.starts_with('/') {
            target.insert(0, '/');
        }
        if let Some(query) = uri.query() {
            target.push('?');
            target.push_str(query);
        }

        Resolution::Forward {
            peer,
            path_and_query: target,
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// True while the accept/dispatch loop is running.
    pub fn is_active(&self) -> bool {
        self.state() == LifecycleState::Active
    }

    /// Wait until the instance is `Active` or `Stopped`.
    pub async fn ready(&self) -> LifecycleState {
        let mut rx = self.state.subscribe();
        let state = match rx
            .wait_for(|s| matches!(s, LifecycleState::Active | LifecycleState::Stopped))
            .await
        {
            Ok(state) => *state,
            Err(_) => LifecycleState::Stopped,
        };
        state
    }

    /// Wait until the accept loop has ended.
    pub async fn stopped(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|s| *s == LifecycleState::Stopped).await;
    }

    /// Block the calling thread until `Stopped` or `timeout`. Returns whether
    /// the instance stopped. Once stopped, its listener has been released.
    ///
    /// Must not be called from inside an async task.
    pub fn wait_stopped(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.state() != LifecycleState::Stopped {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(STOP_POLL_INTERVAL);
        }
        true
    }

    pub(crate) fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    pub(crate) fn client(&self) -> &Client<HttpConnector, Body> {
        &self.client
    }

    pub(crate) fn events(&self) -> &dyn ProxyEvents {
        self.events.as_ref()
    }

    /// Spawn the instance thread. Calling it again is a no-op.
    pub fn start(self: &Arc<Self>) -> io::Result<()> {
        let claimed = self.state.send_if_modified(|state| {
            if *state == LifecycleState::Created {
                *state = LifecycleState::Starting;
                true
            } else {
                false
            }
        });
        if !claimed {
            return Ok(());
        }

        let instance = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(format!("aproxy-{}", self.label))
            .spawn(move || instance.run());

        if let Err(e) = spawned {
            self.state.send_replace(LifecycleState::Stopped);
            return Err(e);
        }
        Ok(())
    }

    /// Stop accepting. Returns immediately; in-flight dispatches drain.
    pub fn close(&self) {
        self.accepting.store(false, Ordering::Release);
        self.shutdown.send_replace(true);
        // Never started: nothing will publish the final transition.
        self.state.send_if_modified(|state| {
            if *state == LifecycleState::Created {
                *state = LifecycleState::Stopped;
                true
            } else {
                false
            }
        });
        tracing::info!(proxy = %self.label, "Proxy closing");
    }

    fn build_runtime(&self) -> io::Result<Runtime> {
        match self.threads {
            Some(threads) if threads > 0 => Builder::new_multi_thread()
                .worker_threads(threads as usize)
                .thread_name(format!("aproxy-{}-worker", self.label))
                .enable_all()
                .build(),
            _ => Builder::new_current_thread().enable_all().build(),
        }
    }

    fn run(self: Arc<Self>) {
        match self.build_runtime() {
            Ok(runtime) => runtime.block_on(Arc::clone(&self).serve()),
            Err(e) => {
                tracing::error!(proxy = %self.label, error = %e, "Failed to build proxy runtime");
            }
        }
        self.state.send_replace(LifecycleState::Stopped);
        self.events.on_close(&self.label);
    }

    async fn serve(self: Arc<Self>) {
        let listener = match self.bind().await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(proxy = %self.label, error = %e, "Proxy listen failed");
                return;
            }
        };

        let mut shutdown = self.shutdown.subscribe();
        if *shutdown.borrow() {
            return;
        }

        let app = Router::new()
            .fallback(dispatch::handle)
            .with_state(Arc::clone(&self));

        self.state.send_replace(LifecycleState::Active);
        tracing::info!(proxy = %self.label, threads = ?self.threads, "Proxy listening");

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|closed| *closed).await;
            })
            .await;

        if let Err(e) = result {
            tracing::error!(proxy = %self.label, error = %e, "Proxy server error");
        }
    }
}

impl ProxyInstance {
    async fn bind(&self) -> io::Result<TcpListener> {
        let mut attempt = 1;
        loop {
            match TcpListener::bind((self.address.as_str(), self.port)).await {
                Err(e) if e.kind() == io::ErrorKind::AddrInUse && attempt < BIND_ATTEMPTS => {
                    tracing::debug!(proxy = %self.label, attempt, "Port busy, retrying bind");
                    attempt += 1;
                    tokio::time::sleep(BIND_RETRY_DELAY).await;
                }
                result => return result,
            }
        }
    }
}

impl Drop for ProxyInstance {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance() -> ProxyInstance {
        ProxyInstance::new("127.0.0.1", 0, InstanceOptions::default())
    }

    fn forward_target(resolution: Resolution) -> (u16, String) {
        match resolution {
            Resolution::Forward {
                peer,
                path_and_query,
            } => (peer.port, path_and_query),
            other => panic!("expected forward, got {:?}", other),
        }
    }

    #[test]
    fn test_no_route_and_no_peers() {
        let instance = instance();
        let uri: Uri = "/hello".parse().unwrap();
        assert_eq!(instance.resolve(&uri), Resolution::NoRoute);

        instance.add_location(Location::new(0, "/", "/"));
        assert_eq!(instance.resolve(&uri), Resolution::NoPeers);
    }

    #[test]
    fn test_rewrite_keeps_query_and_leading_slash() {
        let instance = instance().with_routes(
            &[Backend::new("127.0.0.1", 9100)],
            &[Location::new(0, "/api", ""), Location::new(1, "/", "/root/")],
        );

        let (_, target) = forward_target(instance.resolve(&"/api?x=1".parse().unwrap()));
        assert_eq!(target, "/?x=1");

        let (_, target) = forward_target(instance.resolve(&"/api/users?id=7".parse().unwrap()));
        assert_eq!(target, "/users?id=7");

        let (_, target) = forward_target(instance.resolve(&"/other".parse().unwrap()));
        assert_eq!(target, "/root/other");
    }

    #[test]
    fn test_round_robin_then_removal() {
        let instance = instance().with_routes(
            &[
                Backend::new("127.0.0.1", 9100),
                Backend::new("127.0.0.1", 9101),
                Backend::new("127.0.0.1", 9102),
            ],
            &[Location::new(0, "/", "/")],
        );
        let uri: Uri = "/".parse().unwrap();
        let picks: Vec<u16> = (0..3).map(|_| forward_target(instance.resolve(&uri)).0).collect();
        assert_eq!(picks, vec![9100, 9101, 9102]);

        assert!(instance.del_peer("127.0.0.1", 9101));
        let (port, _) = forward_target(instance.resolve(&uri));
        assert!(port == 9100 || port == 9102);
    }

    #[test]
    fn test_duplicate_location_does_not_change_routing() {
        let instance = instance().with_routes(
            &[Backend::new("127.0.0.1", 9100)],
            &[Location::new(0, "/a", "/x")],
        );
        let uri: Uri = "/a/b".parse().unwrap();
        let before = forward_target(instance.resolve(&uri)).1;
        assert!(!instance.add_location(Location::new(-1, "/a", "/z")));
        let after = forward_target(instance.resolve(&uri)).1;
        assert_eq!(before, "/x/b");
        assert_eq!(before, after);
    }

    #[test]
    fn test_close_before_start_is_terminal() {
        let instance = Arc::new(instance());
        assert_eq!(instance.state(), LifecycleState::Created);
        instance.close();
        assert_eq!(instance.state(), LifecycleState::Stopped);
        assert!(!instance.is_accepting());
        instance.start().unwrap();
        assert_eq!(instance.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn test_start_becomes_active_then_stops() {
        let instance = Arc::new(ProxyInstance::new(
            "127.0.0.1",
            28711,
            InstanceOptions::default(),
        ));
        instance.start().unwrap();
        assert_eq!(instance.ready().await, LifecycleState::Active);
        assert!(instance.is_active());

        instance.close();
        instance.stopped().await;
        assert!(!instance.is_active());
    }

    #[test]
    fn test_wait_stopped_releases_port() {
        let instance = Arc::new(ProxyInstance::new(
            "127.0.0.1",
            28713,
            InstanceOptions::default(),
        ));
        instance.start().unwrap();
        assert!(!instance.wait_stopped(Duration::from_millis(200)));

        instance.close();
        assert!(instance.wait_stopped(Duration::from_secs(5)));
        std::net::TcpListener::bind("127.0.0.1:28713").unwrap();
    }

    #[tokio::test]
    async fn test_listen_failure_ends_stopped() {
        let _holder = std::net::TcpListener::bind("127.0.0.1:28712").unwrap();
        let instance = Arc::new(ProxyInstance::new(
            "127.0.0.1",
            28712,
            InstanceOptions::default(),
        ));
        instance.start().unwrap();
        assert_eq!(instance.ready().await, LifecycleState::Stopped);
    }
}
