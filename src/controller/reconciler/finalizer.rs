//! # Finalizer Lifecycle
//!
//! The operator's finalizer blocks physical deletion of a record until
//! external cleanup has run. Add and remove persist through the record
//! store and report [`StepOutcome::Mutated`] when they changed anything.

use super::{Reconciler, ReconcilerError, StepOutcome};
use crate::constants::FINALIZER;
use crate::crd::ManagedResource;
use kube::ResourceExt;
use tracing::info;

pub fn has_finalizer<K: ManagedResource>(obj: &K) -> bool {
    obj.finalizers().iter().any(|f| f == FINALIZER)
}

/// Fail fast when a step runs on a record without the finalizer
pub fn require_finalizer<K: ManagedResource>(obj: &K) -> Result<(), ReconcilerError> {
    if has_finalizer(obj) {
        Ok(())
    } else {
        Err(ReconcilerError::MissingFinalizer {
            kind: K::kind(&()).to_string(),
            name: obj.name_any(),
        })
    }
}

pub async fn add_finalizer<K: ManagedResource>(
    reconciler: &Reconciler<K>,
    obj: &mut K,
) -> Result<StepOutcome, ReconcilerError> {
    if has_finalizer(obj) {
        return Ok(StepOutcome::NoChange);
    }

    obj.finalizers_mut().push(FINALIZER.to_string());
    *obj = reconciler.store.update(obj).await?;
    info!("finalizer added");
    Ok(StepOutcome::Mutated)
}

pub async fn remove_finalizer<K: ManagedResource>(
    reconciler: &Reconciler<K>,
    obj: &mut K,
) -> Result<StepOutcome, ReconcilerError> {
    if !has_finalizer(obj) {
        return Ok(StepOutcome::NoChange);
    }

    obj.finalizers_mut().retain(|f| f != FINALIZER);
    *obj = reconciler.store.update(obj).await?;
    info!("finalizer removed");
    Ok(StepOutcome::Mutated)
}
