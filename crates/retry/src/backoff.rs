//! Exponential backoff with multiplicative jitter.

#![forbid(unsafe_code)]

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Fraction in [0, 1]; each delay is scaled by a factor drawn from `[1-j, 1+j]`.
    pub jitter: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self { base_delay: Duration::from_millis(500), max_delay: Duration::from_secs(10), jitter: 0.2 }
    }
}

impl BackoffPolicy {
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self { base_delay, max_delay, jitter: 0.0 }
    }

    pub fn with_jitter(mut self, fraction: f64) -> Self {
        self.jitter = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
        self
    }

    /// Defaults overridden by `REKON_RETRY_BASE_MS`, `REKON_RETRY_MAX_MS` and
    /// `REKON_RETRY_JITTER`. Unparsable values are ignored.
    pub fn from_env() -> Self {
        let d = Self::default();
        let base = env_parse::<u64>("REKON_RETRY_BASE_MS").map(Duration::from_millis).unwrap_or(d.base_delay);
        let max = env_parse::<u64>("REKON_RETRY_MAX_MS").map(Duration::from_millis).unwrap_or(d.max_delay);
        let jitter = env_parse::<f64>("REKON_RETRY_JITTER").unwrap_or(d.jitter);
        Self::new(base, max).with_jitter(jitter)
    }

    /// Delay before retry number `attempt` (1 = first retry).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        let shift = attempt.saturating_sub(1).min(31);
        let raw = self.base_delay.saturating_mul(1u32 << shift);
        let bounded = if self.max_delay.is_zero() { raw } else { raw.min(self.max_delay) };
        if self.jitter <= 0.0 {
            return bounded;
        }
        let j = self.jitter.min(1.0);
        let factor = rand::thread_rng().gen_range((1.0 - j)..=(1.0 + j));
        Duration::try_from_secs_f64(bounded.as_secs_f64() * factor).unwrap_or(Duration::MAX)
    }
}
