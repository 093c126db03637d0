//! Rekon policy: default-suppressing normalization of nested numeric policies.
//!
//! The server fills omitted policy fields with hardcoded defaults. When reading a
//! policy back, a field is reported only if the user declared it or its remote value
//! differs from the default; otherwise every plan would show a diff the user cannot
//! resolve.

#![forbid(unsafe_code)]

use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use thiserror::Error;
use tracing::debug;

pub mod scale_down;

pub use scale_down::{normalize_scale_down, ScaleDownBehavior, ScaleDownRequest, ScaleDownState};

/// A fixed policy field and the value the server applies when it is omitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDefault {
    pub key: &'static str,
    pub default: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyField {
    pub key: String,
    pub remote_value: i64,
    pub default_value: i64,
    pub explicitly_set: bool,
}

impl PolicyField {
    pub fn is_reported(&self) -> bool { self.explicitly_set || self.remote_value != self.default_value }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProposedError {
    #[error("expected a list of records, got {0}")]
    NotAList(&'static str),
    #[error("element {index} is not a record (got {kind})")]
    NotARecord { index: usize, kind: &'static str },
    #[error("element {index}: field {key:?} holds a nested {kind}")]
    Nested { index: usize, key: String, kind: &'static str },
}

fn kind_of(v: &Json) -> &'static str {
    match v {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

/// Interpret the user's proposed value as a list of flat records. `null` means nothing
/// was declared.
pub fn parse_proposed(proposed: &Json) -> Result<Vec<&Map<String, Json>>, ProposedError> {
    let items = match proposed {
        Json::Null => return Ok(Vec::new()),
        Json::Array(items) => items,
        other => return Err(ProposedError::NotAList(kind_of(other))),
    };
    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let rec = item.as_object().ok_or(ProposedError::NotARecord { index, kind: kind_of(item) })?;
        if let Some((key, v)) = rec.iter().find(|(_, v)| v.is_array() || v.is_object()) {
            return Err(ProposedError::Nested { index, key: key.clone(), kind: kind_of(v) });
        }
        out.push(rec);
    }
    Ok(out)
}

/// True when some record carries `key` with a non-null value.
pub fn is_declared(records: &[&Map<String, Json>], key: &str) -> bool {
    records.iter().any(|r| r.get(key).is_some_and(|v| !v.is_null()))
}

/// Build the per-field view of a policy from remote values and the proposed input.
pub fn policy_fields(remote: &[(FieldDefault, i64)], proposed: &Json) -> Result<Vec<PolicyField>, ProposedError> {
    let records = parse_proposed(proposed)?;
    Ok(remote
        .iter()
        .map(|(f, value)| PolicyField {
            key: f.key.to_string(),
            remote_value: *value,
            default_value: f.default,
            explicitly_set: is_declared(&records, f.key),
        })
        .collect())
}

/// Fields to write back into state, or `None` when nothing qualifies (the policy is
/// then reported as absent, not as an empty record). Malformed proposed input falls
/// back to reporting every remote field.
pub fn normalize_fields(remote: &[(FieldDefault, i64)], proposed: &Json) -> Option<Vec<PolicyField>> {
    let fields = match policy_fields(remote, proposed) {
        Ok(fields) => fields.into_iter().filter(PolicyField::is_reported).collect::<Vec<_>>(),
        Err(e) => {
            counter!("policy_fallback_total", 1u64);
            debug!(error = %e, "proposed policy is malformed; reporting remote policy as is");
            remote
                .iter()
                .map(|(f, value)| PolicyField {
                    key: f.key.to_string(),
                    remote_value: *value,
                    default_value: f.default,
                    explicitly_set: false,
                })
                .collect()
        }
    };
    if fields.is_empty() { None } else { Some(fields) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const A: FieldDefault = FieldDefault { key: "a", default: 1 };
    const B: FieldDefault = FieldDefault { key: "b", default: 2 };

    fn keys(fields: &Option<Vec<PolicyField>>) -> Vec<&str> {
        fields.iter().flatten().map(|f| f.key.as_str()).collect()
    }

    #[test]
    fn parse_accepts_null_and_flat_records() {
        assert!(parse_proposed(&Json::Null).unwrap().is_empty());
        assert_eq!(parse_proposed(&json!([{ "a": 1 }, {}])).unwrap().len(), 2);
    }

    #[test]
    fn parse_rejects_malformed_shapes() {
        assert_eq!(parse_proposed(&json!({ "a": 1 })), Err(ProposedError::NotAList("object")));
        assert_eq!(parse_proposed(&json!([1])), Err(ProposedError::NotARecord { index: 0, kind: "number" }));
        assert!(matches!(
            parse_proposed(&json!([{ "a": 1 }, { "b": [2] }])),
            Err(ProposedError::Nested { index: 1, .. })
        ));
    }

    #[test]
    fn null_values_do_not_count_as_declared() {
        let out = normalize_fields(&[(A, 1), (B, 2)], &json!([{ "a": null }]));
        assert_eq!(out, None);
    }

    #[test]
    fn reports_declared_or_non_default() {
        let out = normalize_fields(&[(A, 1), (B, 5)], &json!([{ "a": 1 }]));
        assert_eq!(keys(&out), vec!["a", "b"]);
        let out = normalize_fields(&[(A, 1), (B, 5)], &json!([]));
        assert_eq!(keys(&out), vec!["b"]);
    }

    #[test]
    fn malformed_input_reports_everything() {
        let out = normalize_fields(&[(A, 1), (B, 2)], &json!("garbage"));
        assert_eq!(keys(&out), vec!["a", "b"]);
    }

    #[test]
    fn policy_fields_flags_explicit_mentions() {
        let fields = policy_fields(&[(A, 1), (B, 2)], &json!([{ "b": 2 }])).unwrap();
        assert!(!fields[0].explicitly_set);
        assert!(fields[1].explicitly_set);
        assert!(fields[1].is_reported());
        assert!(!fields[0].is_reported());
    }
}
