//! Process list reconciliation.
//!
//! Processes are keyed by name. A process dropped from the declaration cannot be
//! deleted remotely; it is reset to the pool's default plan and its metadata is
//! tombstoned instead.

#![forbid(unsafe_code)]

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::metadata::{reconcile_metadata, DeclaredMetadata, Metadata};

/// Plan sentinel telling the remote side to fall back to the default plan.
pub const DEFAULT_PLAN: &str = "$default";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredProcess {
    pub name: String,
    /// Empty means the pool's default plan.
    #[serde(default)]
    pub plan: String,
    #[serde(default)]
    pub metadata: DeclaredMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessChange {
    pub name: String,
    pub plan: String,
    pub metadata: Metadata,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ProcessPartition<'a> {
    /// Only in the previous declaration.
    pub removed: Vec<&'a DeclaredProcess>,
    /// Only in the new declaration.
    pub added: Vec<&'a DeclaredProcess>,
    /// In both, as `(previous, next)`.
    pub retained: Vec<(&'a DeclaredProcess, &'a DeclaredProcess)>,
}

fn index_by_name(procs: &[DeclaredProcess]) -> (Vec<&str>, FxHashMap<&str, &DeclaredProcess>) {
    let mut order = Vec::with_capacity(procs.len());
    let mut by_name: FxHashMap<&str, &DeclaredProcess> = FxHashMap::default();
    for p in procs {
        if by_name.insert(p.name.as_str(), p).is_none() {
            order.push(p.name.as_str());
        }
    }
    (order, by_name)
}

fn plan_or_default(plan: &str) -> String {
    if plan.is_empty() { DEFAULT_PLAN.to_string() } else { plan.to_string() }
}

/// Split two declarations by process name. Declaration order is kept; a name declared
/// twice resolves to its last declaration.
pub fn partition_processes<'a>(previous: &'a [DeclaredProcess], next: &'a [DeclaredProcess]) -> ProcessPartition<'a> {
    let (prev_order, prev_by_name) = index_by_name(previous);
    let (next_order, next_by_name) = index_by_name(next);
    let mut part = ProcessPartition::default();

    for name in prev_order {
        let old = prev_by_name[name];
        match next_by_name.get(name) {
            Some(new) => part.retained.push((old, *new)),
            None => part.removed.push(old),
        }
    }
    for name in next_order {
        if !prev_by_name.contains_key(name) {
            part.added.push(next_by_name[name]);
        }
    }
    part
}

/// Full process list to send: new and retained processes with reconciled metadata,
/// removed ones reset to [`DEFAULT_PLAN`]. A process declared without a plan is sent
/// with [`DEFAULT_PLAN`] too. Sorted by name.
pub fn reconcile_processes(previous: &[DeclaredProcess], next: &[DeclaredProcess]) -> Vec<ProcessChange> {
    let part = partition_processes(previous, next);
    let empty = DeclaredMetadata::default();
    let mut out = Vec::with_capacity(part.added.len() + part.retained.len() + part.removed.len());

    for new in part.added {
        out.push(ProcessChange {
            name: new.name.clone(),
            plan: plan_or_default(&new.plan),
            metadata: reconcile_metadata(&empty, &new.metadata),
        });
    }
    for old in part.removed {
        out.push(ProcessChange {
            name: old.name.clone(),
            plan: DEFAULT_PLAN.to_string(),
            metadata: reconcile_metadata(&old.metadata, &empty),
        });
    }
    for (old, new) in part.retained {
        out.push(ProcessChange {
            name: new.name.clone(),
            plan: plan_or_default(&new.plan),
            metadata: reconcile_metadata(&old.metadata, &new.metadata),
        });
    }

    out.sort_by(|a, b| a.name.cmp(&b.name));
    out
}
