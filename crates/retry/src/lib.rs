//! Rekon retry: bounded, classified retry around remote mutating calls.
//!
//! The remote API rejects concurrent mutations of the same app with a transient
//! "event locked" error. [`Retrier::run`] keeps re-invoking the wrapped call while the
//! classifier says the failure is transient and the deadline has not passed; any other
//! failure is returned after a single call.

#![forbid(unsafe_code)]

use std::future::Future;
use std::time::Duration;

use metrics::{counter, histogram};
use rekon_core::RemoteError;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

pub mod backoff;
pub mod classify;

pub use backoff::BackoffPolicy;
pub use classify::{Classification, Classifier, MarkerClassifier, DEFAULT_TRANSIENT_MARKER};

/// Terminal state of one retried operation.
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    Succeeded { value: T, attempts: u32 },
    FailedFatal { error: E, attempts: u32 },
    FailedTimeout { last: E, attempts: u32 },
}

impl<T, E> RetryOutcome<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Succeeded { attempts, .. }
            | Self::FailedFatal { attempts, .. }
            | Self::FailedTimeout { attempts, .. } => *attempts,
        }
    }

    pub fn is_success(&self) -> bool { matches!(self, Self::Succeeded { .. }) }

    pub fn into_result(self) -> Result<T, RetryError<E>> {
        match self {
            Self::Succeeded { value, .. } => Ok(value),
            Self::FailedFatal { error, .. } => Err(RetryError::Fatal(error)),
            Self::FailedTimeout { last, attempts } => Err(RetryError::Timeout { attempts, last }),
        }
    }
}

#[derive(Debug, Error)]
pub enum RetryError<E: std::error::Error + Send + Sync + 'static> {
    /// Not a transient conflict; surfaced on first occurrence.
    #[error(transparent)]
    Fatal(E),
    /// Transient conflict that outlived the deadline.
    #[error("gave up after {attempts} attempt(s), last error: {last}")]
    Timeout {
        attempts: u32,
        #[source]
        last: E,
    },
}

impl<E: std::error::Error + Send + Sync + 'static> RetryError<E> {
    /// The remote error behind either variant.
    pub fn remote(&self) -> &E {
        match self {
            Self::Fatal(e) => e,
            Self::Timeout { last, .. } => last,
        }
    }

    pub fn into_remote(self) -> E {
        match self {
            Self::Fatal(e) => e,
            Self::Timeout { last, .. } => last,
        }
    }

    pub fn is_timeout(&self) -> bool { matches!(self, Self::Timeout { .. }) }
}

/// Retry executor: backoff policy plus the injected transient-error predicate.
#[derive(Debug, Clone, Default)]
pub struct Retrier<C = MarkerClassifier> {
    policy: BackoffPolicy,
    classifier: C,
}

impl Retrier<MarkerClassifier> {
    /// Policy and marker from `REKON_RETRY_*`.
    pub fn from_env() -> Self {
        Self { policy: BackoffPolicy::from_env(), classifier: MarkerClassifier::from_env() }
    }
}

impl<C: Classifier> Retrier<C> {
    pub fn new(policy: BackoffPolicy, classifier: C) -> Self { Self { policy, classifier } }

    pub fn policy(&self) -> &BackoffPolicy { &self.policy }
    pub fn classifier(&self) -> &C { &self.classifier }

    /// Invoke `op` until it succeeds, fails fatally, or `deadline` (measured from now)
    /// elapses. The first attempt always runs; an attempt in flight when the deadline
    /// passes is allowed to finish but no new one is started.
    pub async fn run<T, E, F, Fut>(&self, deadline: Duration, mut op: F) -> RetryOutcome<T, E>
    where
        E: RemoteError,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let started = Instant::now();
        let until = started.checked_add(deadline);
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            counter!("retry_attempts_total", 1u64);
            let err = match op().await {
                Ok(value) => {
                    counter!("retry_ok_total", 1u64);
                    histogram!("retry_latency_ms", started.elapsed().as_secs_f64() * 1000.0);
                    if attempts > 1 {
                        debug!(attempts, "remote call succeeded after retries");
                    }
                    return RetryOutcome::Succeeded { value, attempts };
                }
                Err(e) => e,
            };

            if self.classifier.classify(err.body()) == Classification::Fatal {
                counter!("retry_fatal_total", 1u64);
                warn!(attempts, status = ?err.status(), error = %err, "remote call failed");
                return RetryOutcome::FailedFatal { error: err, attempts };
            }

            let remaining = match until {
                Some(u) => u.saturating_duration_since(Instant::now()),
                None => Duration::MAX,
            };
            if remaining.is_zero() {
                return self.timed_out(err, attempts, started);
            }
            let delay = self.policy.delay_for_attempt(attempts).min(remaining);
            counter!("retry_backoff_total", 1u64);
            debug!(attempt = attempts, delay_ms = delay.as_millis() as u64, error = %err, "transient conflict, backing off");
            tokio::time::sleep(delay).await;

            if until.is_some_and(|u| Instant::now() >= u) {
                return self.timed_out(err, attempts, started);
            }
        }
    }

    fn timed_out<T, E: RemoteError>(&self, last: E, attempts: u32, started: Instant) -> RetryOutcome<T, E> {
        counter!("retry_timeout_total", 1u64);
        warn!(
            attempts,
            elapsed_ms = started.elapsed().as_millis() as u64,
            error = %last,
            "transient conflict persisted past deadline"
        );
        RetryOutcome::FailedTimeout { last, attempts }
    }
}

/// Retry `op` with the default backoff policy and the given classifier.
pub async fn retry<T, E, F, Fut, C>(op: F, deadline: Duration, classifier: C) -> RetryOutcome<T, E>
where
    E: RemoteError,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Classifier,
{
    Retrier::new(BackoffPolicy::default(), classifier).run(deadline, op).await
}
