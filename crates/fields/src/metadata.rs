//! Labels and annotations attached to an app or a process, reconciled as a pair.

#![forbid(unsafe_code)]

use rekon_core::{LabeledItem, NamedValue};
use serde::{Deserialize, Serialize};

use crate::{live_items, reconcile};

/// Labels and annotations as declared in configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredMetadata {
    #[serde(default)]
    pub labels: Vec<NamedValue>,
    #[serde(default)]
    pub annotations: Vec<NamedValue>,
}

impl DeclaredMetadata {
    pub fn is_empty(&self) -> bool { self.labels.is_empty() && self.annotations.is_empty() }
}

/// Labels and annotations as sent to the remote API (tombstones included).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub labels: Vec<LabeledItem>,
    #[serde(default)]
    pub annotations: Vec<LabeledItem>,
}

impl Metadata {
    /// What remains after the remote side applies the tombstones.
    pub fn live(&self) -> DeclaredMetadata {
        DeclaredMetadata { labels: live_items(&self.labels), annotations: live_items(&self.annotations) }
    }
}

/// Labels and annotations are reconciled independently.
pub fn reconcile_metadata(previous: &DeclaredMetadata, next: &DeclaredMetadata) -> Metadata {
    Metadata {
        labels: reconcile(&previous.labels, &next.labels),
        annotations: reconcile(&previous.annotations, &next.annotations),
    }
}
