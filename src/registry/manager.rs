//! Live instance set and its persisted counterpart.
//!
//! # Responsibilities
//! - Start every persisted proxy at startup
//! - Apply proxy, location and backend mutations live and in the store
//! - Report persisted proxies with their live status
//!
//! Mutations block while a replaced or deleted instance releases its port;
//! call them from a blocking context.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use dashmap::DashMap;

use crate::error::RegistryError;
use crate::observability::metrics;
use crate::proxy::{InstanceOptions, ProxyInstance};
use crate::registry::view::{ProxyStatus, ProxyView};
use crate::store::{ConfigStore, StoreError};
use crate::topology::{
    Backend, Location, ProxyDefinition, ProxyDraft, ProxyId, ProxyKey, Topology,
};

type ListenKey = (String, u16);

/// How long a mutation waits for a closed instance to release its port.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Owns the running proxy instances and mediates with the store.
#[derive(Debug)]
pub struct ProxyRegistry {
    store: ConfigStore,
    instances: DashMap<ListenKey, Arc<ProxyInstance>>,
    /// Serializes topology mutations.
    gate: Mutex<()>,
    options: InstanceOptions,
}

impl ProxyRegistry {
    /// Registry with no instances. Call [`ProxyRegistry::startup`] to load
    /// the persisted topology instead.
    pub fn new(store: ConfigStore, options: InstanceOptions) -> Self {
        Self {
            store,
            instances: DashMap::new(),
            gate: Mutex::new(()),
            options,
        }
    }

    /// Load the persisted topology and start an instance per definition.
    pub fn startup(store: ConfigStore, options: InstanceOptions) -> Result<Self, StoreError> {
        let registry = Self::new(store, options);
        let topology = registry.store.load()?;

        for definition in &topology {
            registry.launch(
                &definition.address,
                definition.port,
                definition.threads,
                &definition.backends,
                &definition.locations,
            );
        }

        tracing::info!(proxies = topology.len(), "Persisted proxies started");
        Ok(registry)
    }

    /// Start a proxy and persist it. Returns the new id.
    pub fn add_proxy(&self, draft: ProxyDraft) -> Result<ProxyId, RegistryError> {
        let _gate = self.lock_gate();

        let mut topology = self.store.load()?;
        if topology
            .iter()
            .any(|d| d.listens_on(&draft.address, draft.port))
        {
            return Err(RegistryError::DuplicatedPort(draft.port));
        }

        self.launch(
            &draft.address,
            draft.port,
            draft.threads,
            &draft.backends,
            &draft.locations,
        );

        let id = ProxyId::generate();
        let address = draft.address.clone();
        let port = draft.port;
        topology.push(draft.into_definition(id.clone()));
        self.store.save(&topology)?;

        tracing::info!(id = %id, address = %address, port, "Proxy added");
        Ok(id)
    }

    /// Stop and forget the proxy matching `key` exactly.
    pub fn del_proxy(&self, key: &ProxyKey) -> Result<(), RegistryError> {
        let _gate = self.lock_gate();

        let mut topology = self.store.load()?;
        if !topology.iter().any(|d| key.matches(d)) {
            return Err(RegistryError::ProxyNotFound);
        }

        if let Some((_, instance)) = self.instances.remove(&(key.address.clone(), key.port)) {
            retire(&instance);
        }
        metrics::record_live_instances(self.instances.len());

        topology.retain(|d| !key.matches(d));
        self.store.save(&topology)?;

        tracing::info!(proxy = %key, "Proxy deleted");
        Ok(())
    }

    pub fn add_location(&self, key: &ProxyKey, location: Location) -> Result<(), RegistryError> {
        let _gate = self.lock_gate();

        if let Some(instance) = self.live(key) {
            instance.add_location(location.clone());
        }

        self.update_persisted(key, |definition| {
            if definition.locations.iter().any(|l| l.src == location.src) {
                return Err(RegistryError::DuplicatedLocation);
            }
            definition.locations.push(location);
            Ok(())
        })
    }

    pub fn del_location(&self, key: &ProxyKey, src: &str, dst: &str) -> Result<(), RegistryError> {
        let _gate = self.lock_gate();

        if let Some(instance) = self.live(key) {
            instance.del_location(src, dst);
        }

        self.update_persisted(key, |definition| {
            let index = definition
                .locations
                .iter()
                .position(|l| l.src == src && l.dst == dst)
                .ok_or(RegistryError::LocationNotFound)?;
            definition.locations.remove(index);
            Ok(())
        })
    }

    pub fn add_backend(&self, key: &ProxyKey, backend: Backend) -> Result<(), RegistryError> {
        let _gate = self.lock_gate();

        if let Some(instance) = self.live(key) {
            instance.add_peer(&backend.host, backend.port);
        }

        self.update_persisted(key, |definition| {
            if definition.backends.contains(&backend) {
                return Err(RegistryError::DuplicatedBackend);
            }
            definition.backends.push(backend);
            Ok(())
        })
    }

    pub fn del_backend(&self, key: &ProxyKey, backend: &Backend) -> Result<(), RegistryError> {
        let _gate = self.lock_gate();

        if let Some(instance) = self.live(key) {
            instance.del_peer(&backend.host, backend.port);
        }

        self.update_persisted(key, |definition| {
            let index = definition
                .backends
                .iter()
                .position(|b| b == backend)
                .ok_or(RegistryError::BackendNotFound)?;
            definition.backends.remove(index);
            Ok(())
        })
    }

    /// Persisted proxies with live status. Does not take the mutation gate.
    pub fn list_all_proxy(&self) -> Result<Vec<ProxyView>, RegistryError> {
        let topology = self.store.load()?;
        Ok(topology
            .into_iter()
            .map(|definition| {
                let active = self
                    .instance(&definition.address, definition.port)
                    .is_some_and(|instance| instance.is_active());
                ProxyView {
                    definition,
                    status: ProxyStatus::from_active(active),
                }
            })
            .collect())
    }

    /// The live instance bound to `address:port`, if any.
    pub fn instance(&self, address: &str, port: u16) -> Option<Arc<ProxyInstance>> {
        self.instances
            .get(&(address.to_string(), port))
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn live_count(&self) -> usize {
        self.instances.len()
    }

    /// Close every live instance.
    pub fn shutdown(&self) {
        let keys: Vec<ListenKey> = self.instances.iter().map(|e| e.key().clone()).collect();
        for key in keys {
            if let Some((_, instance)) = self.instances.remove(&key) {
                instance.close();
            }
        }
        metrics::record_live_instances(0);
        tracing::info!("All proxies closed");
    }

    fn lock_gate(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn live(&self, key: &ProxyKey) -> Option<Arc<ProxyInstance>> {
        self.instance(&key.address, key.port)
    }

    /// Build, start and register an instance. A previous instance on the
    /// same `(address, port)` is closed and awaited first so the port is free.
    fn launch(
        &self,
        address: &str,
        port: u16,
        threads: Option<u16>,
        backends: &[Backend],
        locations: &[Location],
    ) -> Arc<ProxyInstance> {
        if let Some((_, previous)) = self.instances.remove(&(address.to_string(), port)) {
            retire(&previous);
        }

        let options = InstanceOptions {
            threads,
            ..self.options.clone()
        };
        let instance =
            Arc::new(ProxyInstance::new(address, port, options).with_routes(backends, locations));

        if let Err(e) = instance.start() {
            tracing::error!(proxy = %instance.label(), error = %e, "Failed to spawn proxy thread");
        }

        self.instances
            .insert((address.to_string(), port), Arc::clone(&instance));
        metrics::record_live_instances(self.instances.len());
        instance
    }

    /// Load, apply `mutate` to the entry matching `key`, save.
    fn update_persisted<F>(&self, key: &ProxyKey, mutate: F) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut ProxyDefinition) -> Result<(), RegistryError>,
    {
        let mut topology: Topology = self.store.load()?;
        let definition = topology
            .iter_mut()
            .find(|d| key.matches(d))
            .ok_or(RegistryError::ProxyNotFound)?;
        mutate(definition)?;
        self.store.save(&topology)?;
        tracing::info!(proxy = %key, "Proxy definition updated");
        Ok(())
    }
}

/// Close `instance` and wait, bounded, for its listener to go away.
fn retire(instance: &ProxyInstance) {
    instance.close();
    if !instance.wait_stopped(STOP_TIMEOUT) {
        tracing::warn!(proxy = %instance.label(), "Proxy still draining after close");
    }
}

impl Drop for ProxyRegistry {
    fn drop(&mut self) {
        for entry in self.instances.iter() {
            entry.value().close();
        }
    }
}
