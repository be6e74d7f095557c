//! Admin payload validation.
//!
//! Turns loosely-typed JSON bodies into topology types, reporting the first
//! missing or mistyped field.

use serde_json::Value;
use thiserror::Error;

use crate::topology::{Backend, Location, ProxyDraft, ProxyKey};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} is required and must be {expected}")]
pub struct ValidationError {
    pub field: String,
    pub expected: &'static str,
}

impl ValidationError {
    fn new(field: impl Into<String>, expected: &'static str) -> Self {
        Self {
            field: field.into(),
            expected,
        }
    }
}

fn string(value: &Value, field: &str, label: &str) -> Result<String, ValidationError> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ValidationError::new(label, "string"))
}

fn port(value: &Value, field: &str, label: &str) -> Result<u16, ValidationError> {
    value
        .get(field)
        .and_then(Value::as_u64)
        .and_then(|p| u16::try_from(p).ok())
        .ok_or_else(|| ValidationError::new(label, "integer in 0-65535"))
}

fn integer(value: &Value, field: &str, label: &str) -> Result<i32, ValidationError> {
    value
        .get(field)
        .and_then(Value::as_i64)
        .and_then(|n| i32::try_from(n).ok())
        .ok_or_else(|| ValidationError::new(label, "integer"))
}

fn array<'a>(value: &'a Value, field: &str) -> Result<&'a Vec<Value>, ValidationError> {
    value
        .get(field)
        .and_then(Value::as_array)
        .ok_or_else(|| ValidationError::new(field, "array"))
}

fn object<'a>(value: &'a Value, field: &str) -> Result<&'a Value, ValidationError> {
    value
        .get(field)
        .filter(|v| v.is_object())
        .ok_or_else(|| ValidationError::new(field, "object"))
}

fn backend_item(item: &Value, prefix: &str) -> Result<Backend, ValidationError> {
    Ok(Backend::new(
        string(item, "host", &format!("{prefix} host"))?,
        port(item, "port", &format!("{prefix} port"))?,
    ))
}

fn location_item(item: &Value, prefix: &str) -> Result<Location, ValidationError> {
    Ok(Location::new(
        integer(item, "order", &format!("{prefix} order"))?,
        string(item, "src", &format!("{prefix} src"))?,
        string(item, "dst", &format!("{prefix} dst"))?,
    ))
}

/// Body of `POST /aproxy/add`.
pub fn proxy_draft(value: &Value) -> Result<ProxyDraft, ValidationError> {
    let mut draft = ProxyDraft::new(
        string(value, "address", "address")?,
        port(value, "port", "port")?,
    );

    for item in array(value, "backends")? {
        draft.backends.push(backend_item(item, "backend item")?);
    }
    for item in array(value, "locations")? {
        draft.locations.push(location_item(item, "location item")?);
    }

    // Honoured only when it is a usable integer.
    draft.threads = value
        .get("threads")
        .and_then(Value::as_u64)
        .and_then(|t| u16::try_from(t).ok());

    Ok(draft)
}

/// The `(id, address, port)` triple carried by every mutation body.
pub fn proxy_key(value: &Value) -> Result<ProxyKey, ValidationError> {
    Ok(ProxyKey::new(
        string(value, "id", "id")?,
        string(value, "address", "address")?,
        port(value, "port", "port")?,
    ))
}

/// `location` object of the location add/delete bodies.
pub fn location(value: &Value) -> Result<Location, ValidationError> {
    location_item(object(value, "location")?, "location")
}

/// `backend` object of the backend add/delete bodies.
pub fn backend(value: &Value) -> Result<Backend, ValidationError> {
    backend_item(object(value, "backend")?, "backend")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_draft() {
        let draft = proxy_draft(&json!({
            "address": "127.0.0.1",
            "port": 9001,
            "threads": 2,
            "backends": [{"host": "127.0.0.1", "port": 9100}],
            "locations": [{"order": 0, "src": "/", "dst": "/"}]
        }))
        .unwrap();
        assert_eq!(draft.port, 9001);
        assert_eq!(draft.threads, Some(2));
        assert_eq!(draft.backends, vec![Backend::new("127.0.0.1", 9100)]);
        assert_eq!(draft.locations, vec![Location::new(0, "/", "/")]);
    }

    #[test]
    fn test_threads_ignored_unless_integer() {
        let draft = proxy_draft(&json!({
            "address": "0.0.0.0", "port": 80, "threads": "two",
            "backends": [], "locations": []
        }))
        .unwrap();
        assert_eq!(draft.threads, None);
    }

    #[test]
    fn test_missing_fields() {
        let err = proxy_draft(&Value::Null).unwrap_err();
        assert_eq!(err.to_string(), "address is required and must be string");

        let err = proxy_draft(&json!({"address": "a", "port": 70000})).unwrap_err();
        assert_eq!(err.to_string(), "port is required and must be integer in 0-65535");

        let err = proxy_draft(&json!({"address": "a", "port": 1, "backends": []})).unwrap_err();
        assert_eq!(err.to_string(), "locations is required and must be array");

        let err = proxy_draft(&json!({
            "address": "a", "port": 1,
            "backends": [{"host": "h"}], "locations": []
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "backend item port is required and must be integer in 0-65535");
    }

    #[test]
    fn test_mutation_payloads() {
        let body = json!({
            "id": "abc", "address": "127.0.0.1", "port": 9001,
            "location": {"order": 3, "src": "/a", "dst": "/b"},
            "backend": {"host": "10.0.0.1", "port": 8080}
        });
        assert_eq!(proxy_key(&body).unwrap(), ProxyKey::new("abc", "127.0.0.1", 9001));
        assert_eq!(location(&body).unwrap(), Location::new(3, "/a", "/b"));
        assert_eq!(backend(&body).unwrap(), Backend::new("10.0.0.1", 8080));

        let err = location(&json!({"location": "nope"})).unwrap_err();
        assert_eq!(err.to_string(), "location is required and must be object");
        let err = backend(&json!({"backend": {"port": 1}})).unwrap_err();
        assert_eq!(err.to_string(), "backend host is required and must be string");
    }
}
