//! Rekon public API facade.
//!
//! This crate is what resource lifecycle handlers depend on: id codec, retried
//! mutations against an injected API client, field list reconciliation and policy
//! normalization, behind one error type.

#![forbid(unsafe_code)]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, Instrument};

pub use rekon_core::{decode_id, encode_id, ApiError, CompositeId, IdError, LabeledItem, NamedValue, RemoteError, ID_SEPARATOR};
pub use rekon_fields::{
    live_items, partition_processes, reconcile, reconcile_metadata, reconcile_processes, DeclaredMetadata,
    DeclaredProcess, Metadata, ProcessChange, ProcessPartition, DEFAULT_PLAN,
};
pub use rekon_policy::{normalize_scale_down, PolicyField, ScaleDownBehavior, ScaleDownRequest, ScaleDownState};
pub use rekon_retry::{
    retry, BackoffPolicy, Classification, Classifier, MarkerClassifier, Retrier, RetryError, RetryOutcome,
};

fn env_secs(key: &str) -> Option<Duration> {
    std::env::var(key).ok().and_then(|s| s.trim().parse::<u64>().ok()).map(Duration::from_secs)
}

/// Lifecycle operation a mutation belongs to; selects its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

/// Per-operation deadlines for retried mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        let d = Duration::from_secs(40 * 60);
        Self { create: d, update: d, delete: d }
    }
}

impl Timeouts {
    /// Defaults overridden by `REKON_TIMEOUT_{CREATE,UPDATE,DELETE}_SECS`.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            create: env_secs("REKON_TIMEOUT_CREATE_SECS").unwrap_or(d.create),
            update: env_secs("REKON_TIMEOUT_UPDATE_SECS").unwrap_or(d.update),
            delete: env_secs("REKON_TIMEOUT_DELETE_SECS").unwrap_or(d.delete),
        }
    }

    pub fn for_op(&self, op: Operation) -> Duration {
        match op {
            Operation::Create => self.create,
            Operation::Update => self.update,
            Operation::Delete => self.delete,
        }
    }
}

/// Runtime configuration for a [`Provider`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub timeouts: Timeouts,
    pub backoff: BackoffPolicy,
    pub transient_marker: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            timeouts: Timeouts::default(),
            backoff: BackoffPolicy::default(),
            transient_marker: rekon_retry::DEFAULT_TRANSIENT_MARKER.to_string(),
        }
    }
}

impl ProviderConfig {
    pub fn from_env() -> Self {
        let marker = match std::env::var("REKON_RETRY_MARKER") {
            Ok(m) if !m.trim().is_empty() => m,
            _ => rekon_retry::DEFAULT_TRANSIENT_MARKER.to_string(),
        };
        Self { timeouts: Timeouts::from_env(), backoff: BackoffPolicy::from_env(), transient_marker: marker }
    }
}

/// Errors surfaced to lifecycle handlers.
#[derive(Debug, thiserror::Error)]
pub enum RekonError<E: RemoteError = ApiError> {
    #[error(transparent)]
    MalformedIdentifier(#[from] IdError),
    /// Remote failure that is not a transient conflict; never retried.
    #[error(transparent)]
    Remote(E),
    #[error("transient conflict persisted after {attempts} attempt(s): {last}")]
    Timeout {
        attempts: u32,
        #[source]
        last: E,
    },
    /// Handler-side failure with context, e.g. decoding a remote payload.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl<E: RemoteError> From<RetryError<E>> for RekonError<E> {
    fn from(e: RetryError<E>) -> Self {
        match e {
            RetryError::Fatal(e) => RekonError::Remote(e),
            RetryError::Timeout { attempts, last } => RekonError::Timeout { attempts, last },
        }
    }
}

impl<E: RemoteError> RekonError<E> {
    pub fn remote(&self) -> Option<&E> {
        match self {
            RekonError::Remote(e) | RekonError::Timeout { last: e, .. } => Some(e),
            RekonError::MalformedIdentifier(_) | RekonError::Internal(_) => None,
        }
    }
}

pub type RekonResult<T, E = ApiError> = Result<T, RekonError<E>>;

/// Handle lifecycle handlers hold: the injected API client plus retry configuration.
/// The client is passed explicitly to every wrapped call.
pub struct Provider<A, C = MarkerClassifier> {
    client: Arc<A>,
    retrier: Retrier<C>,
    timeouts: Timeouts,
}

impl<A: Send + Sync + 'static> Provider<A, MarkerClassifier> {
    pub fn new(client: A, config: ProviderConfig) -> Self {
        info!(
            create_s = config.timeouts.create.as_secs(),
            update_s = config.timeouts.update.as_secs(),
            delete_s = config.timeouts.delete.as_secs(),
            marker = %config.transient_marker,
            "provider configured"
        );
        Self {
            client: Arc::new(client),
            retrier: Retrier::new(config.backoff, MarkerClassifier::new(config.transient_marker)),
            timeouts: config.timeouts,
        }
    }

    pub fn from_env(client: A) -> Self { Self::new(client, ProviderConfig::from_env()) }
}

impl<A: Send + Sync + 'static, C: Classifier> Provider<A, C> {
    /// Swap the retry executor, e.g. to inject a different transient-error predicate.
    pub fn with_retrier<C2: Classifier>(self, retrier: Retrier<C2>) -> Provider<A, C2> {
        Provider { client: self.client, retrier, timeouts: self.timeouts }
    }

    pub fn client(&self) -> &Arc<A> { &self.client }
    pub fn timeouts(&self) -> &Timeouts { &self.timeouts }
    pub fn retrier(&self) -> &Retrier<C> { &self.retrier }

    /// Run a create/update/delete call under the operation's deadline, retrying
    /// transient conflicts. `f` receives the client on every attempt and must be safe
    /// to invoke more than once.
    pub async fn mutate<T, E, F, Fut>(&self, op: Operation, mut f: F) -> RekonResult<T, E>
    where
        E: RemoteError,
        F: FnMut(Arc<A>) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let deadline = self.timeouts.for_op(op);
        let client = &self.client;
        let span = info_span!("mutate", op = ?op, deadline_s = deadline.as_secs());
        let outcome = self.retrier.run(deadline, || f(Arc::clone(client))).instrument(span).await;
        outcome.into_result().map_err(RekonError::from)
    }

    /// Single read attempt. A not-found response means the resource is gone remotely
    /// and yields `Ok(None)` so the handler can drop it from state.
    pub async fn read<T, E, F, Fut>(&self, f: F) -> RekonResult<Option<T>, E>
    where
        E: RemoteError,
        F: FnOnce(Arc<A>) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match f(Arc::clone(&self.client)).await {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.is_not_found() => {
                debug!(error = %e, "resource not found remotely");
                Ok(None)
            }
            Err(e) => Err(RekonError::Remote(e)),
        }
    }
}
