//! Topology document types.
//!
//! The persisted document is an ordered list of [`ProxyDefinition`]s. The same
//! types are used by the live proxy instances, the registry and the admin API.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The whole persisted topology, in document order.
pub type Topology = Vec<ProxyDefinition>;

/// Identifier assigned to a proxy at creation: 16 random bytes as 32 hex chars.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProxyId(String);

impl ProxyId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(format!("{:032x}", rand::random::<u128>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ProxyId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ProxyId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ProxyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An upstream server a proxy forwards matched requests to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Backend {
    pub host: String,
    pub port: u16,
}

impl Backend {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

/// A path-prefix rewrite rule. `src` is replaced by `dst` on the outbound path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Sort key, ascending.
    pub order: i32,
    pub src: String,
    pub dst: String,
}

impl Location {
    pub fn new(order: i32, src: impl Into<String>, dst: impl Into<String>) -> Self {
        Self {
            order,
            src: src.into(),
            dst: dst.into(),
        }
    }
}

/// Persisted description of one proxy front-end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyDefinition {
    pub id: ProxyId,
    pub address: String,
    pub port: u16,
    /// Worker threads for this proxy's runtime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<u16>,
    #[serde(default)]
    pub backends: Vec<Backend>,
    #[serde(default)]
    pub locations: Vec<Location>,
}

impl ProxyDefinition {
    /// True when this definition listens on `address:port`.
    pub fn listens_on(&self, address: &str, port: u16) -> bool {
        self.address == address && self.port == port
    }
}

/// A proxy definition before it has been assigned an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyDraft {
    pub address: String,
    pub port: u16,
    pub threads: Option<u16>,
    pub backends: Vec<Backend>,
    pub locations: Vec<Location>,
}

impl ProxyDraft {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            threads: None,
            backends: Vec::new(),
            locations: Vec::new(),
        }
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backends.push(backend);
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.locations.push(location);
        self
    }

    pub fn with_threads(mut self, threads: u16) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn into_definition(self, id: ProxyId) -> ProxyDefinition {
        ProxyDefinition {
            id,
            address: self.address,
            port: self.port,
            threads: self.threads,
            backends: self.backends,
            locations: self.locations,
        }
    }
}

/// The `(id, address, port)` triple that addresses a persisted proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyKey {
    pub id: ProxyId,
    pub address: String,
    pub port: u16,
}

impl ProxyKey {
    pub fn new(id: impl Into<ProxyId>, address: impl Into<String>, port: u16) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            port,
        }
    }

    /// All three fields must match.
    pub fn matches(&self, definition: &ProxyDefinition) -> bool {
        definition.id == self.id && definition.listens_on(&self.address, self.port)
    }
}

impl fmt::Display for ProxyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.id, self.address, self.port)
    }
}
