//! # Reconciler
//!
//! Finalizer-gated reconciliation of managed records against InfluxDB.
//!
//! One generic engine drives Bucket, Organization and Token records; the
//! per-kind differences live behind [`ExternalKind`]. Every step returns a
//! [`StepOutcome`]. A [`StepOutcome::Mutated`] step wrote the record, so the
//! pass stops and the watch redelivers the new version.
//!
//! Deletion path: finalize status, finalize resources, remove finalizer.
//! Live path: add finalizer, initialize status, reconcile resources.

pub mod clock;
pub mod conditions;
pub mod connection;
pub mod debounce;
pub mod dispatcher;
pub mod engine;
pub mod finalizer;
pub mod kind;

pub use clock::{Clock, ManualClock, SystemClock};
pub use debounce::ConflictDebouncer;
pub use dispatcher::{reconcile, run_pass};
pub use kind::{ExternalEntity, ExternalKind, ExternalScope};

use crate::config::ControllerConfig;
use crate::controller::backoff::FibonacciBackoff;
use crate::influxdb::{InfluxConnector, InfluxError};
use crate::store::{RecordStore, StoreError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Influx(#[from] InfluxError),
    #[error("{kind} {name} is missing the operator finalizer")]
    MissingFinalizer { kind: String, name: String },
    #[error("InfluxDB config {namespace}/{name} not found")]
    ConfigNotFound { namespace: String, name: String },
    #[error("InfluxDB token secret {namespace}/{name} not found")]
    CredentialNotFound { namespace: String, name: String },
    #[error("InfluxDB token secret {namespace}/{name} is unusable: {reason}")]
    InvalidCredential {
        namespace: String,
        name: String,
        reason: String,
    },
    #[error("invalid spec: {0}")]
    InvalidSpec(String),
    #[error("invalid InfluxDB {entity}: {reason}")]
    InvalidExternalEntity {
        entity: &'static str,
        reason: String,
    },
    #[error("reconciliation did not finish within {0:?}")]
    Timeout(Duration),
}

impl ReconcilerError {
    pub fn invalid_entity(entity: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidExternalEntity {
            entity,
            reason: reason.into(),
        }
    }

    /// Whether a later pass may succeed without anyone changing the record
    pub fn is_transient(&self) -> bool {
        match self {
            ReconcilerError::Store(StoreError::Serialization(_)) => false,
            ReconcilerError::Store(_) => true,
            ReconcilerError::Influx(e) => e.is_transient(),
            ReconcilerError::Timeout(_) => true,
            _ => false,
        }
    }

    /// Short label for metrics
    pub fn category(&self) -> &'static str {
        match self {
            ReconcilerError::Store(_) => "store",
            ReconcilerError::Influx(_) => "influxdb",
            ReconcilerError::MissingFinalizer { .. } => "missing_finalizer",
            ReconcilerError::ConfigNotFound { .. } => "config_not_found",
            ReconcilerError::CredentialNotFound { .. }
            | ReconcilerError::InvalidCredential { .. } => "credential",
            ReconcilerError::InvalidSpec(_) => "invalid_spec",
            ReconcilerError::InvalidExternalEntity { .. } => "invalid_entity",
            ReconcilerError::Timeout(_) => "timeout",
        }
    }
}

/// Result of one reconciliation step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    NoChange,
    /// The record was written; stop the pass
    Mutated,
}

impl StepOutcome {
    pub fn is_mutated(self) -> bool {
        self == StepOutcome::Mutated
    }
}

/// Result of one reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Record no longer exists
    Absent,
    /// A step wrote the record
    Mutated,
    /// Deletion path ran to the end without writing
    Finalized,
    /// Live path ran to the end without writing
    Converged,
}

/// Timing knobs for the reconcilers
#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    pub resync_interval: Duration,
    pub debounce_window: Duration,
    pub pass_timeout: Duration,
    pub backoff_min_secs: u64,
    pub backoff_max_secs: u64,
}

impl From<&ControllerConfig> for ReconcilerSettings {
    fn from(config: &ControllerConfig) -> Self {
        Self {
            resync_interval: config.resync_interval,
            debounce_window: config.conflict_debounce,
            pass_timeout: config.reconcile_timeout,
            backoff_min_secs: config.backoff_min_secs,
            backoff_max_secs: config.backoff_max_secs,
        }
    }
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self::from(&ControllerConfig::default())
    }
}

/// Error count and backoff calculator for one record
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_secs, max_secs),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count = self.error_count.saturating_add(1);
    }
}

/// Shared context for every pass over records of kind `K`
pub struct Reconciler<K> {
    pub store: Arc<dyn RecordStore<K>>,
    pub connector: Arc<dyn InfluxConnector>,
    pub debouncer: Arc<ConflictDebouncer>,
    pub clock: Arc<dyn Clock>,
    pub settings: ReconcilerSettings,
    /// Per-record error backoff, keyed by `namespace/name`
    pub backoff_states: Mutex<HashMap<String, BackoffState>>,
}

impl<K> std::fmt::Debug for Reconciler<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("settings", &self.settings)
            .field("debouncer", &self.debouncer)
            .finish_non_exhaustive()
    }
}

impl<K> Reconciler<K> {
    pub fn new(
        store: Arc<dyn RecordStore<K>>,
        connector: Arc<dyn InfluxConnector>,
        debouncer: Arc<ConflictDebouncer>,
        clock: Arc<dyn Clock>,
        settings: ReconcilerSettings,
    ) -> Self {
        Self {
            store,
            connector,
            debouncer,
            clock,
            settings,
            backoff_states: Mutex::new(HashMap::new()),
        }
    }

    /// Forget accumulated errors after a successful pass
    pub fn reset_backoff(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states.remove(resource_key);
        }
    }

    /// Count an error for `resource_key` and return the next delay in seconds
    /// together with the consecutive error count
    pub fn next_backoff(&self, resource_key: &str) -> (u64, u32) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let state = states.entry(resource_key.to_string()).or_insert_with(|| {
                    BackoffState::new(self.settings.backoff_min_secs, self.settings.backoff_max_secs)
                });
                state.increment_error();
                (state.backoff.next_backoff_seconds(), state.error_count)
            }
            Err(_) => (self.settings.backoff_min_secs, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_influx_conflict_is_not_transient() {
        let err = ReconcilerError::from(InfluxError::http(422, "exists"));
        assert!(!err.is_transient());
        assert_eq!(err.category(), "influxdb");
    }

    #[test]
    fn test_timeout_is_transient() {
        assert!(ReconcilerError::Timeout(Duration::from_secs(60)).is_transient());
    }

    #[test]
    fn test_store_conflict_is_transient() {
        let err = ReconcilerError::from(StoreError::Conflict {
            kind: "Bucket".into(),
            namespace: "default".into(),
            name: "metrics".into(),
        });
        assert!(err.is_transient());
    }

    #[test]
    fn test_missing_finalizer_message() {
        let err = ReconcilerError::MissingFinalizer {
            kind: "Token".into(),
            name: "telegraf".into(),
        };
        assert_eq!(err.to_string(), "Token telegraf is missing the operator finalizer");
        assert!(!err.is_transient());
    }
}
