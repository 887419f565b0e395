//! # Error Policy
//!
//! Error handling and backoff for failed reconciliation passes, plus
//! classification of controller stream errors.

use crate::controller::reconciler::{ExternalKind, Reconciler, ReconcilerError};
use crate::observability;
use kube::ResourceExt;
use kube_runtime::controller::{self, Action};
use kube_runtime::reflector::ObjectRef;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Requeue a failed record with Fibonacci backoff
///
/// Backoff state is tracked per record so that one failing record does not
/// slow down the others. The next successful pass resets it.
pub fn error_policy<K: ExternalKind>(
    obj: Arc<K>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler<K>>,
) -> Action {
    let kind = K::kind(&());
    let name = obj.name_any();
    let namespace = obj.namespace().unwrap_or_default();

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.reconciliation_error",
        resource.kind = %kind,
        resource.name = %name,
        resource.namespace = %namespace,
        error.transient = error.is_transient(),
        error.category = error.category(),
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {} {}/{}: {}", kind, namespace, name, error);
    observability::metrics::increment_reconciliation_errors(&kind);

    let resource_key = format!("{namespace}/{name}");
    let (backoff_seconds, error_count) = ctx.next_backoff(&resource_key);

    let next_trigger_time =
        chrono::Utc::now() + chrono::Duration::seconds(i64::try_from(backoff_seconds).unwrap_or(i64::MAX));
    info!(
        "Retrying with Fibonacci backoff: {}s (error count: {}, next attempt at {})",
        backoff_seconds,
        error_count,
        next_trigger_time.to_rfc3339()
    );

    observability::metrics::increment_requeues_total("error-backoff");
    Action::requeue(Duration::from_secs(backoff_seconds))
}

/// Log the result of one controller stream item
pub fn report_controller_result<K: ExternalKind>(
    result: Result<(ObjectRef<K>, Action), controller::Error<ReconcilerError, kube_runtime::watcher::Error>>,
) {
    match result {
        Ok((object, action)) => debug!("reconciled {}: {:?}", object, action),
        // Already logged by error_policy
        Err(controller::Error::ReconcilerFailed(_, object)) => {
            debug!("reconcile of {} failed", object);
        }
        Err(controller::Error::ObjectNotFound(object)) => {
            debug!("{} no longer exists", object);
        }
        Err(controller::Error::QueueError(e)) => {
            warn!("{} watch error: {}", K::kind(&()), e);
        }
        Err(e) => warn!("{} controller error: {}", K::kind(&()), e),
    }
}
