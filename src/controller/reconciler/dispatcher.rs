//! # Reconciliation Dispatcher
//!
//! Loads a record, picks the deletion or live path and runs its steps in
//! order until one of them writes the record.

use super::engine::{finalize_resources, finalize_status, initialize_status, reconcile_resources};
use super::finalizer::{add_finalizer, remove_finalizer};
use super::{ExternalKind, PassOutcome, Reconciler, ReconcilerError};
use crate::observability::metrics;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info_span, Instrument};

/// Run one pass over the record `namespace/name`
pub async fn run_pass<K: ExternalKind>(
    reconciler: &Reconciler<K>,
    namespace: &str,
    name: &str,
) -> Result<PassOutcome, ReconcilerError> {
    let Some(mut obj) = reconciler.store.get(namespace, name).await? else {
        debug!("object no longer exists");
        return Ok(PassOutcome::Absent);
    };

    if obj.meta().deletion_timestamp.is_some() {
        if finalize_status(reconciler, &mut obj).await?.is_mutated()
            || finalize_resources(reconciler, &mut obj).await?.is_mutated()
            || remove_finalizer(reconciler, &mut obj).await?.is_mutated()
        {
            return Ok(PassOutcome::Mutated);
        }
        return Ok(PassOutcome::Finalized);
    }

    if add_finalizer(reconciler, &mut obj).await?.is_mutated()
        || initialize_status(reconciler, &mut obj).await?.is_mutated()
        || reconcile_resources(reconciler, &mut obj).await?.is_mutated()
    {
        return Ok(PassOutcome::Mutated);
    }
    Ok(PassOutcome::Converged)
}

/// Controller entry point for records of kind `K`
///
/// A converged live record is requeued after the resync interval. Every
/// other outcome waits for the next watch event.
pub async fn reconcile<K: ExternalKind>(
    obj: Arc<K>,
    ctx: Arc<Reconciler<K>>,
) -> Result<Action, ReconcilerError> {
    let kind = K::kind(&()).to_string();
    let namespace = obj.namespace().unwrap_or_default();
    let name = obj.name_any();
    let span = info_span!(
        "reconcile",
        kind = %kind,
        namespace = %namespace,
        name = %name
    );

    async move {
        let start = Instant::now();
        metrics::increment_reconciliations(&kind);

        let timeout = ctx.settings.pass_timeout;
        let outcome = tokio::time::timeout(timeout, run_pass(&ctx, &namespace, &name))
            .await
            .map_err(|_| ReconcilerError::Timeout(timeout))
            .and_then(|result| result);
        metrics::observe_reconciliation_duration(&kind, start.elapsed().as_secs_f64());

        let outcome = outcome?;
        ctx.reset_backoff(&format!("{namespace}/{name}"));
        debug!("pass finished: {:?}", outcome);

        match outcome {
            PassOutcome::Converged => {
                metrics::increment_requeues_total("resync");
                Ok(Action::requeue(ctx.settings.resync_interval))
            }
            PassOutcome::Absent | PassOutcome::Mutated | PassOutcome::Finalized => {
                Ok(Action::await_change())
            }
        }
    }
    .instrument(span)
    .await
}
