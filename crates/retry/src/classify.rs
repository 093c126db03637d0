//! Transient-vs-fatal classification of remote error bodies.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

/// Body marker the remote API returns while another operation holds the app's event lock.
pub const DEFAULT_TRANSIENT_MARKER: &str = "event locked";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    Retryable,
    Fatal,
}

pub trait Classifier: Send + Sync {
    fn classify(&self, body: &[u8]) -> Classification;
}

impl<F> Classifier for F
where
    F: Fn(&[u8]) -> Classification + Send + Sync,
{
    fn classify(&self, body: &[u8]) -> Classification { self(body) }
}

/// Retryable iff the raw body contains `marker`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerClassifier {
    marker: Vec<u8>,
}

impl MarkerClassifier {
    pub fn new(marker: impl Into<String>) -> Self {
        Self { marker: marker.into().into_bytes() }
    }

    /// `REKON_RETRY_MARKER` when set and non-empty, else [`DEFAULT_TRANSIENT_MARKER`].
    pub fn from_env() -> Self {
        match std::env::var("REKON_RETRY_MARKER") {
            Ok(m) if !m.trim().is_empty() => Self::new(m),
            _ => Self::default(),
        }
    }

    pub fn marker(&self) -> &[u8] { &self.marker }
}

impl Default for MarkerClassifier {
    fn default() -> Self { Self::new(DEFAULT_TRANSIENT_MARKER) }
}

impl Classifier for MarkerClassifier {
    fn classify(&self, body: &[u8]) -> Classification {
        // empty marker matches nothing
        if self.marker.is_empty() || body.len() < self.marker.len() {
            return Classification::Fatal;
        }
        if body.windows(self.marker.len()).any(|w| w == self.marker.as_slice()) {
            Classification::Retryable
        } else {
            Classification::Fatal
        }
    }
}
