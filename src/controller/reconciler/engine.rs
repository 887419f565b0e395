//! # Reconciliation Steps
//!
//! The four status and resource steps shared by every managed kind.

use super::conditions::{has_reason, set_condition, ConditionEntry};
use super::connection::resolve_connection;
use super::finalizer::{has_finalizer, require_finalizer};
use super::{
    ConflictDebouncer, ExternalEntity, ExternalKind, ExternalScope, Reconciler, ReconcilerError,
    StepOutcome,
};
use crate::constants::{
    CONDITION_TYPE_OBJECT, REASON_FINALIZER_ADDED, REASON_OBJECT_INITIALIZED,
    REASON_OBJECT_MARKED_FOR_DELETION,
};
use crate::crd::{ManagedResource, Phase};
use crate::observability::metrics;
use kube::ResourceExt;
use tracing::{error, info};

const INITIALIZED: ConditionEntry<'static> = ConditionEntry {
    reason: REASON_FINALIZER_ADDED,
    r#type: CONDITION_TYPE_OBJECT,
    message: "object initialized",
    phase: Some(Phase::Pending),
};

async fn persist_status<K: ManagedResource>(
    reconciler: &Reconciler<K>,
    obj: &mut K,
) -> Result<StepOutcome, ReconcilerError> {
    match reconciler.store.update_status(obj).await {
        Ok(updated) => {
            *obj = updated;
            info!("updated object status");
            Ok(StepOutcome::Mutated)
        }
        Err(e) => {
            error!("failed to update object status: {}", e);
            Err(e.into())
        }
    }
}

/// Flip the phase to terminating, keeping conditions
pub async fn finalize_status<K: ManagedResource>(
    reconciler: &Reconciler<K>,
    obj: &mut K,
) -> Result<StepOutcome, ReconcilerError> {
    if !has_finalizer(obj) {
        return Ok(StepOutcome::NoChange);
    }
    if obj.status().and_then(|s| s.phase) == Some(Phase::Terminating) {
        return Ok(StepOutcome::NoChange);
    }

    let status = obj.status_mut();
    status.phase = Some(Phase::Terminating);
    status.message = Some("object is marked for deletion".to_string());
    status.reason = Some(REASON_OBJECT_MARKED_FOR_DELETION.to_string());
    persist_status(reconciler, obj).await
}

/// Record the pending phase the first time a record is seen with its finalizer
pub async fn initialize_status<K: ManagedResource>(
    reconciler: &Reconciler<K>,
    obj: &mut K,
) -> Result<StepOutcome, ReconcilerError> {
    require_finalizer(obj)?;
    if has_reason(obj.status(), REASON_FINALIZER_ADDED) {
        return Ok(StepOutcome::NoChange);
    }

    let generation = obj.meta().generation;
    let now = reconciler.clock.now();
    let status = obj.status_mut();
    set_condition(status, INITIALIZED, generation, now);
    status.reason = Some(REASON_OBJECT_INITIALIZED.to_string());
    persist_status(reconciler, obj).await
}

fn log_exists<K: ExternalKind>(reconciler: &Reconciler<K>, obj: &K) {
    let key = ConflictDebouncer::key(&obj.uid().unwrap_or_default(), K::DEBOUNCE_TAG);
    let logged = reconciler
        .debouncer
        .debounce(&key, reconciler.settings.debounce_window, || {
            info!("{} exists", K::ENTITY);
        });
    metrics::increment_conflicts(K::ENTITY, logged);
}

/// Make sure the InfluxDB entity exists and record it in status
///
/// An "already exists" answer from InfluxDB counts as success. Status is
/// written when the created condition is new, when this call created the
/// entity, or when the persisted identifier changed.
pub async fn reconcile_resources<K: ExternalKind>(
    reconciler: &Reconciler<K>,
    obj: &mut K,
) -> Result<StepOutcome, ReconcilerError> {
    require_finalizer(obj)?;
    obj.validate().map_err(ReconcilerError::InvalidSpec)?;

    let namespace = obj.namespace().unwrap_or_default();
    let config_name = obj.config_name();
    let connection = resolve_connection(reconciler, &namespace, &config_name)
        .await?
        .ok_or_else(|| ReconcilerError::ConfigNotFound {
            namespace: namespace.clone(),
            name: config_name.clone(),
        })?;
    obj.check_managed(&connection.org_name)
        .map_err(ReconcilerError::InvalidSpec)?;

    let (entity, created) = {
        let session = connection.open(reconciler.connector.as_ref())?;
        let scope = ExternalScope::new(&*session, &connection.org_name);
        let (entity, created) = ensure_external(reconciler, obj, &scope).await?;
        if let Some(entity) = &entity {
            obj.materialize(reconciler, entity).await?;
        }
        (entity, created)
    };

    let generation = obj.meta().generation;
    let now = reconciler.clock.now();
    let status = obj.status_mut();
    let mut changed = false;

    if created || !has_reason(Some(&*status), K::CREATED.reason) {
        set_condition(status, K::CREATED, generation, now);
        changed = true;
    }
    if let Some((key, value)) = entity.as_ref().and_then(K::status_data) {
        if status.data_value(key) != Some(value.as_str()) {
            status.data.get_or_insert_with(Default::default).insert(key.to_string(), value);
            changed = true;
        }
    }

    if !changed {
        return Ok(StepOutcome::NoChange);
    }
    persist_status(reconciler, obj).await
}

/// Find or create the entity; the flag is true when this call created it
async fn ensure_external<K: ExternalKind>(
    reconciler: &Reconciler<K>,
    obj: &K,
    scope: &ExternalScope<'_>,
) -> Result<(Option<ExternalEntity>, bool), ReconcilerError> {
    if let Some(existing) = obj.find_existing(scope).await? {
        log_exists(reconciler, obj);
        return Ok((Some(existing), false));
    }

    match obj.create_external(scope).await {
        Ok(entity) => {
            info!("{} created", K::ENTITY);
            metrics::increment_external_operation(K::ENTITY, "create", "created");
            Ok((Some(entity), true))
        }
        Err(ReconcilerError::Influx(e)) if e.is_conflict() => {
            metrics::increment_external_operation(K::ENTITY, "create", "conflict");
            log_exists(reconciler, obj);
            Ok((obj.recover_after_conflict(scope).await?, false))
        }
        Err(e) => {
            error!("failed to create {}: {}", K::ENTITY, e);
            metrics::increment_external_operation(K::ENTITY, "create", "error");
            Err(e)
        }
    }
}

/// Delete the InfluxDB entity before the finalizer is released
///
/// A missing Config, an already absent entity or a record the operator refuses
/// to manage means there is nothing to clean up. Once the deleted condition is
/// recorded the step is a no-op.
pub async fn finalize_resources<K: ExternalKind>(
    reconciler: &Reconciler<K>,
    obj: &mut K,
) -> Result<StepOutcome, ReconcilerError> {
    if !has_finalizer(obj) || has_reason(obj.status(), K::DELETED.reason) {
        return Ok(StepOutcome::NoChange);
    }

    let namespace = obj.namespace().unwrap_or_default();
    let Some(connection) = resolve_connection(reconciler, &namespace, &obj.config_name()).await?
    else {
        info!("influxdb config not found, skipping deleting resources");
        return Ok(StepOutcome::NoChange);
    };
    if let Err(reason) = obj.check_managed(&connection.org_name) {
        info!("{} is not managed ({}), skipping deleting resources", K::ENTITY, reason);
        return Ok(StepOutcome::NoChange);
    }

    {
        let session = connection.open(reconciler.connector.as_ref())?;
        let scope = ExternalScope::new(&*session, &connection.org_name);

        let Some(entity) = obj.resolve_for_deletion(&scope).await? else {
            info!("{} not found", K::ENTITY);
            return Ok(StepOutcome::NoChange);
        };

        match obj.delete_external(&scope, &entity).await {
            Ok(()) => {
                info!("{} deleted", K::ENTITY);
                metrics::increment_external_operation(K::ENTITY, "delete", "deleted");
            }
            Err(ReconcilerError::Influx(e)) if e.is_not_found() => {
                info!("{} already deleted", K::ENTITY);
                metrics::increment_external_operation(K::ENTITY, "delete", "not_found");
                return Ok(StepOutcome::NoChange);
            }
            Err(e) => {
                error!("failed to delete {}: {}", K::ENTITY, e);
                metrics::increment_external_operation(K::ENTITY, "delete", "error");
                return Err(e);
            }
        }
    }

    let generation = obj.meta().generation;
    let now = reconciler.clock.now();
    set_condition(obj.status_mut(), K::DELETED, generation, now);
    persist_status(reconciler, obj).await
}
