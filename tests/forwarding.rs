//! End-to-end forwarding through live proxy instances.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use aproxy::proxy::{InstanceOptions, LifecycleState};
use aproxy::registry::{ProxyRegistry, ProxyStatus};
use aproxy::store::{ConfigStore, MemoryEngine};
use aproxy::topology::{Backend, Location, ProxyDraft, ProxyKey};
use tokio::sync::Notify;

mod common;

fn registry() -> ProxyRegistry {
    ProxyRegistry::new(ConfigStore::in_memory(), InstanceOptions::default())
}

async fn wait_active(registry: &ProxyRegistry, port: u16) {
    let instance = registry.instance("127.0.0.1", port).unwrap();
    let state = tokio::time::timeout(Duration::from_secs(5), instance.ready())
        .await
        .unwrap();
    assert_eq!(state, LifecycleState::Active);
}

async fn get(port: u16, path: &str) -> (u16, String) {
    let res = common::client()
        .get(format!("http://127.0.0.1:{}{}", port, path))
        .send()
        .await
        .expect("Proxy unreachable");
    let status = res.status().as_u16();
    (status, res.text().await.unwrap())
}

/// Registry mutations block while a replaced instance drains; keep them off
/// the test runtime.
async fn blocking<T, F>(registry: &Arc<ProxyRegistry>, call: F) -> T
where
    T: Send + 'static,
    F: FnOnce(&ProxyRegistry) -> T + Send + 'static,
{
    let registry = Arc::clone(registry);
    tokio::task::spawn_blocking(move || call(&registry))
        .await
        .unwrap()
}

fn hello_draft(port: u16, backend_port: u16) -> ProxyDraft {
    ProxyDraft::new("127.0.0.1", port)
        .with_backend(Backend::new("127.0.0.1", backend_port))
        .with_location(Location::new(0, "/", "/"))
}

#[tokio::test]
async fn test_forward_hello_to_single_backend() {
    let backend: SocketAddr = "127.0.0.1:28901".parse().unwrap();
    common::start_echo_backend(backend, "b0").await;

    let registry = registry();
    let id = registry
        .add_proxy(
            ProxyDraft::new("127.0.0.1", 28801)
                .with_backend(Backend::new("127.0.0.1", 28901))
                .with_location(Location::new(0, "/", "/")),
        )
        .unwrap();
    assert_eq!(id.as_str().len(), 32);
    assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    wait_active(&registry, 28801).await;

    let (status, body) = get(28801, "/hello").await;
    assert_eq!(status, 200);
    assert_eq!(body, "b0 /hello 127.0.0.1:28901");

    let listed = registry.list_all_proxy().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].status, ProxyStatus::Available);
}

#[tokio::test]
async fn test_round_robin_and_peer_removal() {
    for (port, name) in [(28902, "b0"), (28903, "b1"), (28904, "b2")] {
        common::start_echo_backend(format!("127.0.0.1:{}", port).parse().unwrap(), name).await;
    }

    let registry = registry();
    let id = registry
        .add_proxy(
            ProxyDraft::new("127.0.0.1", 28802)
                .with_backend(Backend::new("127.0.0.1", 28902))
                .with_backend(Backend::new("127.0.0.1", 28903))
                .with_backend(Backend::new("127.0.0.1", 28904))
                .with_location(Location::new(0, "/", "/")),
        )
        .unwrap();
    wait_active(&registry, 28802).await;

    let mut names = Vec::new();
    for _ in 0..3 {
        let (_, body) = get(28802, "/").await;
        names.push(body.split(' ').next().unwrap().to_string());
    }
    assert_eq!(names, vec!["b0", "b1", "b2"]);

    let key = ProxyKey::new(id, "127.0.0.1", 28802);
    registry
        .del_backend(&key, &Backend::new("127.0.0.1", 28903))
        .unwrap();

    for _ in 0..4 {
        let (status, body) = get(28802, "/").await;
        assert_eq!(status, 200);
        assert!(body.starts_with("b0 ") || body.starts_with("b2 "), "got {}", body);
    }
}

#[tokio::test]
async fn test_rewrite_is_order_first_and_keeps_query() {
    common::start_echo_backend("127.0.0.1:28905".parse().unwrap(), "b0").await;

    let registry = registry();
    registry
        .add_proxy(
            ProxyDraft::new("127.0.0.1", 28803)
                .with_backend(Backend::new("127.0.0.1", 28905))
                .with_location(Location::new(1, "/ab", "/y"))
                .with_location(Location::new(0, "/a", "/x")),
        )
        .unwrap();
    wait_active(&registry, 28803).await;

    let (_, body) = get(28803, "/ab/c").await;
    assert_eq!(body, "b0 /xb/c 127.0.0.1:28905");

    let (_, body) = get(28803, "/a/users?id=7&x=y").await;
    assert_eq!(body, "b0 /x/users?id=7&x=y 127.0.0.1:28905");
}

#[tokio::test]
async fn test_not_found_without_route_or_peers() {
    let registry = registry();
    let id = registry
        .add_proxy(
            ProxyDraft::new("127.0.0.1", 28804).with_location(Location::new(0, "/api", "/")),
        )
        .unwrap();
    wait_active(&registry, 28804).await;

    let (status, body) = get(28804, "/other").await;
    assert_eq!(status, 404);
    assert!(body.contains("APROXY SERVER 404 NotFound"));

    // Route matches, pool is empty.
    let (status, body) = get(28804, "/api/x").await;
    assert_eq!(status, 404);
    assert!(body.contains("404 NotFound"));

    // A location whose src is already present changes nothing.
    let key = ProxyKey::new(id, "127.0.0.1", 28804);
    assert!(registry
        .add_location(&key, Location::new(0, "/api", "/elsewhere"))
        .is_err());
    let instance = registry.instance("127.0.0.1", 28804).unwrap();
    assert_eq!(instance.locations(), vec![Location::new(0, "/api", "/")]);
}

#[tokio::test]
async fn test_dead_peer_yields_500_and_stays_pooled() {
    let registry = registry();
    registry
        .add_proxy(
            ProxyDraft::new("127.0.0.1", 28805)
                .with_backend(Backend::new("127.0.0.1", 28999))
                .with_location(Location::new(0, "/", "/")),
        )
        .unwrap();
    wait_active(&registry, 28805).await;

    for _ in 0..2 {
        let (status, body) = get(28805, "/").await;
        assert_eq!(status, 500);
        assert!(body.contains("INTERNAL ERROR"));
    }
    let instance = registry.instance("127.0.0.1", 28805).unwrap();
    assert_eq!(instance.backends(), vec![Backend::new("127.0.0.1", 28999)]);
}

#[tokio::test]
async fn test_response_is_streamed() {
    let release = Arc::new(Notify::new());
    common::start_streaming_backend("127.0.0.1:28906".parse().unwrap(), release.clone()).await;

    let registry = registry();
    registry
        .add_proxy(
            ProxyDraft::new("127.0.0.1", 28806)
                .with_backend(Backend::new("127.0.0.1", 28906))
                .with_location(Location::new(0, "/", "/")),
        )
        .unwrap();
    wait_active(&registry, 28806).await;

    let mut res = common::client()
        .get("http://127.0.0.1:28806/stream")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let first = tokio::time::timeout(Duration::from_secs(3), res.chunk())
        .await
        .expect("first chunk must arrive before the peer finishes")
        .unwrap()
        .unwrap();
    assert_eq!(&first[..], b"first");

    release.notify_one();
    let mut rest = Vec::new();
    while let Some(chunk) = res.chunk().await.unwrap() {
        rest.extend_from_slice(&chunk);
    }
    assert_eq!(rest, b"last");
}

#[tokio::test]
async fn test_deleted_proxy_stops_listening() {
    common::start_echo_backend("127.0.0.1:28907".parse().unwrap(), "b0").await;

    let registry = registry();
    let id = registry
        .add_proxy(
            ProxyDraft::new("127.0.0.1", 28807)
                .with_backend(Backend::new("127.0.0.1", 28907))
                .with_location(Location::new(0, "/", "/")),
        )
        .unwrap();
    wait_active(&registry, 28807).await;
    assert_eq!(get(28807, "/").await.0, 200);

    let instance = registry.instance("127.0.0.1", 28807).unwrap();
    let registry = Arc::new(registry);
    let key = ProxyKey::new(id, "127.0.0.1", 28807);
    blocking(&registry, move |r| r.del_proxy(&key)).await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), instance.stopped())
        .await
        .unwrap();

    assert!(!instance.is_active());
    assert!(registry.list_all_proxy().unwrap().is_empty());
    assert!(common::client()
        .get("http://127.0.0.1:28807/")
        .send()
        .await
        .is_err());
}

#[tokio::test]
async fn test_add_retried_after_failed_save_serves() {
    common::start_echo_backend("127.0.0.1:28908".parse().unwrap(), "b0").await;

    let engine = Arc::new(MemoryEngine::new());
    let registry = Arc::new(ProxyRegistry::new(
        ConfigStore::with_engine(engine.clone()),
        InstanceOptions::default(),
    ));

    engine.fail_next_put();
    let first = blocking(&registry, |r| r.add_proxy(hello_draft(28808, 28908))).await;
    assert_eq!(first.unwrap_err().to_string(), "system error");
    wait_active(&registry, 28808).await;
    let stale = registry.instance("127.0.0.1", 28808).unwrap();

    blocking(&registry, |r| r.add_proxy(hello_draft(28808, 28908)))
        .await
        .unwrap();
    assert_eq!(stale.state(), LifecycleState::Stopped);
    wait_active(&registry, 28808).await;

    let listed = registry.list_all_proxy().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].status, ProxyStatus::Available);
    assert_eq!(get(28808, "/again").await, (200, "b0 /again 127.0.0.1:28908".to_string()));
}

#[tokio::test]
async fn test_delete_then_readd_same_port() {
    common::start_echo_backend("127.0.0.1:28909".parse().unwrap(), "b0").await;
    let registry = Arc::new(registry());

    for _ in 0..10 {
        let id = blocking(&registry, |r| r.add_proxy(hello_draft(28809, 28909)))
            .await
            .unwrap();
        wait_active(&registry, 28809).await;
        assert_eq!(get(28809, "/").await.0, 200);

        let key = ProxyKey::new(id, "127.0.0.1", 28809);
        blocking(&registry, move |r| r.del_proxy(&key)).await.unwrap();
    }
    assert_eq!(registry.live_count(), 0);
}
