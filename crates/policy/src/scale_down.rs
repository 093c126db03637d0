//! Autoscale scale-down behavior: `units`, `percentage`, `stabilization_window`.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::{normalize_fields, FieldDefault};

pub const UNITS: FieldDefault = FieldDefault { key: "units", default: 3 };
pub const PERCENTAGE: FieldDefault = FieldDefault { key: "percentage", default: 10 };
pub const STABILIZATION_WINDOW: FieldDefault = FieldDefault { key: "stabilization_window", default: 300 };

/// Scale-down behavior as the server reports it (defaults already applied).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleDownBehavior {
    pub units: i32,
    pub percentage: i32,
    pub stabilization_window: i32,
}

impl Default for ScaleDownBehavior {
    fn default() -> Self {
        Self {
            units: UNITS.default as i32,
            percentage: PERCENTAGE.default as i32,
            stabilization_window: STABILIZATION_WINDOW.default as i32,
        }
    }
}

/// Normalized scale-down written back into state. Unset fields are omitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleDownState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stabilization_window: Option<i32>,
}

impl ScaleDownBehavior {
    /// From the optional wire fields. `None` when the server reports no policy at all;
    /// a partially filled policy gets the server defaults for the missing fields.
    pub fn from_optional(units: Option<i32>, percentage: Option<i32>, stabilization_window: Option<i32>) -> Option<Self> {
        if units.is_none() && percentage.is_none() && stabilization_window.is_none() {
            return None;
        }
        let d = Self::default();
        Some(Self {
            units: units.unwrap_or(d.units),
            percentage: percentage.unwrap_or(d.percentage),
            stabilization_window: stabilization_window.unwrap_or(d.stabilization_window),
        })
    }

    fn fields(&self) -> [(FieldDefault, i64); 3] {
        [
            (UNITS, self.units as i64),
            (PERCENTAGE, self.percentage as i64),
            (STABILIZATION_WINDOW, self.stabilization_window as i64),
        ]
    }

    /// Report only declared or non-default fields; `None` when no field qualifies.
    pub fn normalize(&self, proposed: &Json) -> Option<ScaleDownState> {
        let fields = normalize_fields(&self.fields(), proposed)?;
        let mut state = ScaleDownState::default();
        for f in fields {
            match f.key.as_str() {
                k if k == UNITS.key => state.units = Some(self.units),
                k if k == PERCENTAGE.key => state.percentage = Some(self.percentage),
                k if k == STABILIZATION_WINDOW.key => state.stabilization_window = Some(self.stabilization_window),
                _ => {}
            }
        }
        Some(state)
    }
}

/// Normalize a remote scale-down that may be missing entirely.
pub fn normalize_scale_down(remote: Option<&ScaleDownBehavior>, proposed: &Json) -> Option<ScaleDownState> {
    remote.and_then(|r| r.normalize(proposed))
}

/// Scale-down request body built from the declared configuration. Fields the user left
/// out stay unset so the server applies its defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleDownRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stabilization_window: Option<i32>,
}

impl ScaleDownRequest {
    /// Later records override earlier ones; non-integer values and non-record
    /// elements are ignored.
    pub fn from_declared(declared: &Json) -> Self {
        let mut req = Self::default();
        let Some(items) = declared.as_array() else { return req };
        for rec in items.iter().filter_map(Json::as_object) {
            let int = |key: &str| rec.get(key).and_then(Json::as_i64).and_then(|v| i32::try_from(v).ok());
            if let Some(v) = int(UNITS.key) { req.units = Some(v); }
            if let Some(v) = int(PERCENTAGE.key) { req.percentage = Some(v); }
            if let Some(v) = int(STABILIZATION_WINDOW.key) { req.stabilization_window = Some(v); }
        }
        req
    }

    pub fn is_empty(&self) -> bool { *self == Self::default() }
}
