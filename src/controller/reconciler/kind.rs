//! # Per-Kind Strategy
//!
//! [`ExternalKind`] is the small surface the generic engine needs from each
//! managed kind: how to find, create and delete the matching InfluxDB entity,
//! and which condition reasons record the outcome.

use super::conditions::ConditionEntry;
use super::{Reconciler, ReconcilerError};
use crate::crd::ManagedResource;
use crate::influxdb::types::Organization;
use crate::influxdb::{InfluxError, InfluxSession};
use async_trait::async_trait;
use tokio::sync::OnceCell;
use zeroize::Zeroizing;

/// InfluxDB entity matched to a record
#[derive(Clone)]
pub struct ExternalEntity {
    pub id: String,
    pub name: String,
    /// Credential carried by the entity (authorizations only)
    pub secret: Option<Zeroizing<String>>,
}

impl ExternalEntity {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            secret: None,
        }
    }
}

impl std::fmt::Debug for ExternalEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalEntity")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Open session plus the configured organization, looked up at most once
pub struct ExternalScope<'a> {
    pub session: &'a dyn InfluxSession,
    pub org_name: &'a str,
    organization: OnceCell<Organization>,
}

impl<'a> ExternalScope<'a> {
    pub fn new(session: &'a dyn InfluxSession, org_name: &'a str) -> Self {
        Self {
            session,
            org_name,
            organization: OnceCell::new(),
        }
    }

    /// The organization named by the Config
    pub async fn organization(&self) -> Result<&Organization, InfluxError> {
        self.organization
            .get_or_try_init(|| self.session.find_organization_by_name(self.org_name))
            .await
    }

    /// Id of the organization named by the Config
    pub async fn organization_id(&self) -> Result<&str, ReconcilerError> {
        let organization = self.organization().await?;
        organization
            .id
            .as_deref()
            .ok_or_else(|| ReconcilerError::invalid_entity("organization", "missing id"))
    }
}

/// Kind-specific half of the reconciliation engine
#[async_trait]
pub trait ExternalKind: ManagedResource {
    /// Suffix of this kind's debounce key, `<uid>-<tag>`
    const DEBOUNCE_TAG: &'static str;
    /// Noun used in logs and metrics
    const ENTITY: &'static str;
    /// Condition recorded once the entity is confirmed present
    const CREATED: ConditionEntry<'static>;
    /// Condition recorded after the entity was deleted
    const DELETED: ConditionEntry<'static>;

    /// Name of the Config record in the record's namespace
    fn config_name(&self) -> String;

    /// Reject specs InfluxDB or the operator would refuse
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    /// Refuse records naming an entity the operator must never touch, such
    /// as the organization `org_name` the connection authenticates against.
    /// Checked on both the create and the delete path.
    fn check_managed(&self, _org_name: &str) -> Result<(), String> {
        Ok(())
    }

    /// Look for an entity already matching this record before creating one
    async fn find_existing(
        &self,
        _scope: &ExternalScope<'_>,
    ) -> Result<Option<ExternalEntity>, ReconcilerError> {
        Ok(None)
    }

    /// Create the entity. An "already exists" response surfaces as an
    /// [`InfluxError`] for which `is_conflict()` holds.
    async fn create_external(
        &self,
        scope: &ExternalScope<'_>,
    ) -> Result<ExternalEntity, ReconcilerError>;

    /// Identify the entity after a create reported a conflict
    async fn recover_after_conflict(
        &self,
        _scope: &ExternalScope<'_>,
    ) -> Result<Option<ExternalEntity>, ReconcilerError> {
        Ok(None)
    }

    /// Entity to delete on finalization; `None` when there is nothing to clean up
    async fn resolve_for_deletion(
        &self,
        scope: &ExternalScope<'_>,
    ) -> Result<Option<ExternalEntity>, ReconcilerError>;

    async fn delete_external(
        &self,
        scope: &ExternalScope<'_>,
        entity: &ExternalEntity,
    ) -> Result<(), ReconcilerError>;

    /// Project a known entity into the cluster, e.g. a token Secret
    async fn materialize(
        &self,
        _reconciler: &Reconciler<Self>,
        _entity: &ExternalEntity,
    ) -> Result<(), ReconcilerError> {
        Ok(())
    }

    /// Identifier persisted under `status.data`
    fn status_data(_entity: &ExternalEntity) -> Option<(&'static str, String)> {
        None
    }
}
