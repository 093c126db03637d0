//! Rekon core types: composite ids, named collection items, remote errors.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod id;

pub use id::{decode_id, encode_id, CompositeId, IdError, ID_SEPARATOR};

/// One entry of a named key/value collection (label, annotation, env var) as sent to
/// the remote upsert endpoint. `delete` marks a tombstone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabeledItem {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub delete: bool,
}

impl LabeledItem {
    pub fn live(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into(), delete: false }
    }

    pub fn tombstone(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into(), delete: true }
    }
}

/// Declared `(name, value)` pair, the shape labels/annotations have in configuration.
pub type NamedValue = (String, String);

/// Error surface the retry classifier and read handlers need from a remote API client.
pub trait RemoteError: std::error::Error + Send + Sync + 'static {
    /// Raw response body, if the failure carried one.
    fn body(&self) -> &[u8];
    /// HTTP status of the failed call, when known.
    fn status(&self) -> Option<u16> { None }

    fn is_not_found(&self) -> bool { self.status() == Some(404) }
}

/// Generic remote API failure: status plus raw body.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("remote api error (status {status}): {}", String::from_utf8_lossy(.body).trim())]
pub struct ApiError {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiError {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { status, body: body.into() }
    }
}

impl RemoteError for ApiError {
    fn body(&self) -> &[u8] { &self.body }
    fn status(&self) -> Option<u16> { Some(self.status) }
}

pub mod prelude {
    pub use super::{
        decode_id, encode_id, ApiError, CompositeId, IdError, LabeledItem, NamedValue, RemoteError,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_exposes_body_and_status() {
        let e = ApiError::new(409, "event locked: app myapp\n");
        assert_eq!(e.body(), b"event locked: app myapp\n");
        assert_eq!(e.status(), Some(409));
        assert!(!e.is_not_found());
        assert_eq!(e.to_string(), "remote api error (status 409): event locked: app myapp");
        assert!(ApiError::new(404, "").is_not_found());
    }

    #[test]
    fn labeled_item_omits_false_delete_flag() {
        let live = serde_json::to_value(LabeledItem::live("team", "infra")).unwrap();
        assert_eq!(live, serde_json::json!({ "name": "team", "value": "infra" }));
        let gone = serde_json::to_value(LabeledItem::tombstone("team", "infra")).unwrap();
        assert_eq!(gone, serde_json::json!({ "name": "team", "value": "infra", "delete": true }));
        let back: LabeledItem = serde_json::from_value(live).unwrap();
        assert!(!back.delete);
    }
}
