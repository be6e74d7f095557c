//! Listing view of a persisted proxy.

use serde::{Deserialize, Serialize};

use crate::topology::ProxyDefinition;

/// Whether a live instance is serving the definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProxyStatus {
    Available,
    Unavailable,
}

impl ProxyStatus {
    pub fn from_active(active: bool) -> Self {
        if active {
            Self::Available
        } else {
            Self::Unavailable
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyView {
    #[serde(flatten)]
    pub definition: ProxyDefinition,
    pub status: ProxyStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{ProxyDraft, ProxyId};

    #[test]
    fn test_view_is_flat() {
        let view = ProxyView {
            definition: ProxyDraft::new("127.0.0.1", 9001).into_definition(ProxyId::from("abc")),
            status: ProxyStatus::Unavailable,
        };
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["id"], "abc");
        assert_eq!(value["port"], 9001);
        assert_eq!(value["status"], "UNAVAILABLE");
        assert_eq!(value["backends"], serde_json::json!([]));
    }
}
