//! Upstream peer.

use std::fmt;

use crate::topology::Backend;

/// A single upstream server in a proxy's pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Peer {
    pub host: String,
    pub port: u16,
    /// Pre-calculated `host:port` for outbound URIs.
    pub authority: String,
    /// Pre-calculated `Host` header value; the port is omitted when it is 80.
    pub host_header: String,
}

impl Peer {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        let authority = format!("{}:{}", host, port);
        let host_header = if port == 80 {
            host.clone()
        } else {
            authority.clone()
        };
        Self {
            host,
            port,
            authority,
            host_header,
        }
    }

    pub fn is(&self, host: &str, port: u16) -> bool {
        self.host == host && self.port == port
    }

    pub fn to_backend(&self) -> Backend {
        Backend::new(self.host.clone(), self.port)
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.authority)
    }
}
