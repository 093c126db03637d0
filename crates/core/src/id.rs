//! Composite resource identifiers.
//!
//! A composite id packs several positional segments (e.g. `service::instance::app`)
//! into the single key a resource is tracked by. Segments are joined with
//! [`ID_SEPARATOR`] and are never escaped: a segment must not itself contain the
//! separator. That is a caller obligation; the codec does not check it.

#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage-only separator between id segments. Never sent to the remote API.
pub const ID_SEPARATOR: &str = "::";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("malformed identifier {id:?}: found {found} segment(s), expected at least {expected}")]
    Malformed { id: String, found: usize, expected: usize },
    #[error("identifier {id:?}: segment {index} ({segment:?}) is not valid: {reason}")]
    InvalidSegment { id: String, index: usize, segment: String, reason: String },
}

/// Decoded composite identifier. Segment order is positional.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompositeId {
    segments: Vec<String>,
}

impl CompositeId {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { segments: segments.into_iter().map(Into::into).collect() }
    }

    pub fn len(&self) -> usize { self.segments.len() }
    pub fn is_empty(&self) -> bool { self.segments.is_empty() }
    pub fn segments(&self) -> &[String] { &self.segments }
    pub fn into_segments(self) -> Vec<String> { self.segments }

    /// Segment at `index`. Panics when out of range; only use for indices below the
    /// `min_segments` the id was decoded with.
    pub fn segment(&self, index: usize) -> &str { &self.segments[index] }

    /// Optional (trailing) segment.
    pub fn get(&self, index: usize) -> Option<&str> { self.segments.get(index).map(String::as_str) }

    /// Parse an optional segment, e.g. the version qualifier of `app::process::version`.
    pub fn parse_segment<T>(&self, index: usize) -> Result<Option<T>, IdError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.get(index) {
            None => Ok(None),
            Some(raw) => raw.parse::<T>().map(Some).map_err(|e| IdError::InvalidSegment {
                id: self.encode(),
                index,
                segment: raw.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    pub fn encode(&self) -> String { encode_id(self.segments.as_slice()) }
}

impl fmt::Display for CompositeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.encode()) }
}

/// Join `segments` with the separator and trim surrounding whitespace.
pub fn encode_id<S: AsRef<str>>(segments: &[S]) -> String {
    let mut out = String::new();
    for (i, s) in segments.iter().enumerate() {
        if i > 0 { out.push_str(ID_SEPARATOR); }
        out.push_str(s.as_ref());
    }
    out.trim().to_string()
}

/// Split `id` into segments. Fails only when fewer than `min_segments` are present;
/// extra trailing segments are accepted so newer ids stay readable.
pub fn decode_id(id: &str, min_segments: usize) -> Result<CompositeId, IdError> {
    let segments: Vec<String> = id.split(ID_SEPARATOR).map(str::to_string).collect();
    if segments.len() < min_segments {
        return Err(IdError::Malformed { id: id.to_string(), found: segments.len(), expected: min_segments });
    }
    Ok(CompositeId { segments })
}

impl FromStr for CompositeId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> { decode_id(s, 1) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_joins_with_separator() {
        assert_eq!(encode_id(&["service01", "my-instance", "app01"]), "service01::my-instance::app01");
        assert_eq!(encode_id(&["solo"]), "solo");
        assert_eq!(encode_id::<&str>(&[]), "");
    }

    #[test]
    fn encode_trims_outer_whitespace_only() {
        assert_eq!(encode_id(&[" app", "team "]), "app::team");
        assert_eq!(encode_id(&["a b", "c"]), "a b::c");
    }

    #[test]
    fn decode_round_trips_encoded_segments() {
        let id = encode_id(&["service01", "my-instance", "app01"]);
        let parts = decode_id(&id, 3).unwrap();
        assert_eq!(parts.segments(), &["service01", "my-instance", "app01"]);
        assert_eq!(parts.segment(0), "service01");
        assert_eq!(parts.segment(2), "app01");
    }

    #[test]
    fn decode_rejects_too_few_segments() {
        let err = decode_id("a::b", 3).unwrap_err();
        assert_eq!(err, IdError::Malformed { id: "a::b".into(), found: 2, expected: 3 });
        assert!(err.to_string().contains("expected at least 3"), "err={}", err);
    }

    #[test]
    fn decode_accepts_extra_trailing_segments() {
        let parts = decode_id("app::web::4", 2).unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts.parse_segment::<u32>(2).unwrap(), Some(4));
        assert_eq!(parts.parse_segment::<u32>(3).unwrap(), None);
    }

    #[test]
    fn decode_keeps_empty_segments() {
        let parts = decode_id("app::::web", 3).unwrap();
        assert_eq!(parts.segments(), &["app", "", "web"]);
        // a bare string is always one segment, even when empty
        assert_eq!(decode_id("", 1).unwrap().segments(), &[""]);
    }

    #[test]
    fn parse_segment_reports_bad_values() {
        let parts = decode_id("app::web::latest", 2).unwrap();
        let err = parts.parse_segment::<u32>(2).unwrap_err();
        assert!(matches!(err, IdError::InvalidSegment { index: 2, .. }));
    }

    #[test]
    fn display_matches_encode() {
        let id = CompositeId::new(["pool", "router"]);
        assert_eq!(id.to_string(), "pool::router");
        assert_eq!("pool::router".parse::<CompositeId>().unwrap(), id);
    }
}
