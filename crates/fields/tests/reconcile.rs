#![forbid(unsafe_code)]

use std::collections::HashSet;

use rekon_core::{LabeledItem, NamedValue};
use rekon_fields::{live_items, reconcile};

fn nv(items: &[(&str, &str)]) -> Vec<NamedValue> {
    items.iter().map(|(n, v)| (n.to_string(), v.to_string())).collect()
}

/// Small deterministic corpus of snapshot pairs, including overlaps and duplicates.
fn cases() -> Vec<(Vec<NamedValue>, Vec<NamedValue>)> {
    let snaps = vec![
        nv(&[]),
        nv(&[("a", "1")]),
        nv(&[("a", "1"), ("b", "2")]),
        nv(&[("b", "20"), ("c", "3")]),
        nv(&[("c", "3"), ("d", "4"), ("a", "9")]),
        nv(&[("x", "1"), ("x", "2")]),
    ];
    let mut out = Vec::new();
    for p in &snaps {
        for n in &snaps {
            out.push((p.clone(), n.clone()));
        }
    }
    out
}

#[test]
fn live_and_deleted_names_are_disjoint() {
    for (prev, next) in cases() {
        let out = reconcile(&prev, &next);
        let live: HashSet<&str> = out.iter().filter(|i| !i.delete).map(|i| i.name.as_str()).collect();
        let gone: HashSet<&str> = out.iter().filter(|i| i.delete).map(|i| i.name.as_str()).collect();
        assert!(live.is_disjoint(&gone), "prev={:?} next={:?} out={:?}", prev, next, out);
    }
}

#[test]
fn output_has_no_duplicate_names_and_expected_length() {
    for (prev, next) in cases() {
        let out = reconcile(&prev, &next);
        let names: HashSet<&str> = out.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names.len(), out.len(), "duplicate names in {:?}", out);

        let next_names: HashSet<&str> = next.iter().map(|(n, _)| n.as_str()).collect();
        let prev_names: HashSet<&str> = prev.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(out.len(), next_names.len() + prev_names.difference(&next_names).count());
    }
}

#[test]
fn live_entries_precede_tombstones() {
    for (prev, next) in cases() {
        let out = reconcile(&prev, &next);
        if let Some(first_gone) = out.iter().position(|i| i.delete) {
            assert!(out[first_gone..].iter().all(|i| i.delete), "out={:?}", out);
        }
    }
}

#[test]
fn identity_cases() {
    let next = nv(&[("b", "2"), ("a", "1")]);
    let out = reconcile::<String, String>(&[], &next);
    assert_eq!(out, vec![LabeledItem::live("b", "2"), LabeledItem::live("a", "1")]);

    let out = reconcile::<String, String>(&next, &[]);
    assert_eq!(out, vec![LabeledItem::tombstone("b", "2"), LabeledItem::tombstone("a", "1")]);
    assert!(live_items(&out).is_empty());
}

#[test]
fn unchanged_entries_are_resent_without_tombstones() {
    let out = reconcile(
        &nv(&[("label_name", "label_value")]),
        &nv(&[("label_name", "label_value"), ("new_label_name", "new_label_value")]),
    );
    assert_eq!(
        out,
        vec![
            LabeledItem::live("label_name", "label_value"),
            LabeledItem::live("new_label_name", "new_label_value"),
        ]
    );
}

#[test]
fn env_vars_round_through_state() {
    // previous state as persisted, next declaration from config
    let prev = nv(&[("DATABASE_URL", "postgres://old"), ("DEBUG", "1"), ("PORT", "8080")]);
    let next = nv(&[("PORT", "9090"), ("DATABASE_URL", "postgres://old")]);
    let out = reconcile(&prev, &next);
    assert_eq!(
        out,
        vec![
            LabeledItem::live("PORT", "9090"),
            LabeledItem::live("DATABASE_URL", "postgres://old"),
            LabeledItem::tombstone("DEBUG", "1"),
        ]
    );
    assert_eq!(live_items(&out), next);
}
