//! Rekon fields: tombstone diff for named key/value collections.
//!
//! The remote API upserts labels, annotations and environment variables one item at a
//! time and only removes an item when it is sent back with `delete: true`. There is no
//! "replace the whole collection" call, so every update sends the full list produced by
//! [`reconcile`]: the new declaration plus a tombstone for each name that disappeared.

#![forbid(unsafe_code)]

use metrics::counter;
use rekon_core::{LabeledItem, NamedValue};
use rustc_hash::FxHashMap;
use tracing::debug;

pub mod metadata;
pub mod process;

pub use metadata::{reconcile_metadata, DeclaredMetadata, Metadata};
pub use process::{partition_processes, reconcile_processes, DeclaredProcess, ProcessChange, ProcessPartition, DEFAULT_PLAN};

/// Upserts for every entry of `next` (in order), followed by tombstones for names of
/// `previous` that `next` no longer declares (in `previous` order).
///
/// A name repeated within one snapshot is emitted once, at its first position, with
/// its last value. Names compare exactly (case-sensitive).
pub fn reconcile<N, V>(previous: &[(N, V)], next: &[(N, V)]) -> Vec<LabeledItem>
where
    N: AsRef<str>,
    V: AsRef<str>,
{
    let mut out: Vec<LabeledItem> = Vec::with_capacity(next.len() + previous.len());
    let mut pos: FxHashMap<&str, usize> = FxHashMap::default();

    for (name, value) in next {
        let name = name.as_ref();
        match pos.get(name) {
            Some(&i) => out[i].value = value.as_ref().to_string(),
            None => {
                pos.insert(name, out.len());
                out.push(LabeledItem::live(name, value.as_ref()));
            }
        }
    }

    let live = out.len();
    for (name, value) in previous {
        let name = name.as_ref();
        match pos.get(name) {
            Some(&i) if i < live => {}
            Some(&i) => out[i].value = value.as_ref().to_string(),
            None => {
                pos.insert(name, out.len());
                out.push(LabeledItem::tombstone(name, value.as_ref()));
            }
        }
    }

    let tombstones = out.len() - live;
    if tombstones > 0 {
        counter!("fields_tombstones_total", tombstones as u64);
        debug!(live, tombstones, "reconciled named collection");
    }
    out
}

/// The non-deleted subset, in the shape persisted back into state.
pub fn live_items(items: &[LabeledItem]) -> Vec<NamedValue> {
    items
        .iter()
        .filter(|it| !it.delete)
        .map(|it| (it.name.clone(), it.value.clone()))
        .collect()
}
