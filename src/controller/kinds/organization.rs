use crate::constants::{CONDITION_TYPE_INFLUXDB, DEFAULT_ORG_NAME};
use crate::controller::reconciler::conditions::ConditionEntry;
use crate::controller::reconciler::{ExternalEntity, ExternalKind, ExternalScope, ReconcilerError};
use crate::crd::organization::validate_organization_name;
use crate::crd::{Organization, Phase};
use crate::influxdb::types;
use async_trait::async_trait;
use kube::ResourceExt;

fn entity(organization: types::Organization) -> Result<ExternalEntity, ReconcilerError> {
    let id = organization
        .id
        .ok_or_else(|| ReconcilerError::invalid_entity("organization", "missing id"))?;
    Ok(ExternalEntity::new(id, organization.name))
}

#[async_trait]
impl ExternalKind for Organization {
    const DEBOUNCE_TAG: &'static str = "org";
    const ENTITY: &'static str = "organization";
    const CREATED: ConditionEntry<'static> = ConditionEntry {
        reason: "createdOrganization",
        r#type: CONDITION_TYPE_INFLUXDB,
        message: "created influxdb organization",
        phase: Some(Phase::Ready),
    };
    const DELETED: ConditionEntry<'static> = ConditionEntry {
        reason: "deletedOrganization",
        r#type: CONDITION_TYPE_INFLUXDB,
        message: "deleted influxdb organization",
        phase: None,
    };

    fn config_name(&self) -> String {
        self.spec.config_name.clone()
    }

    fn validate(&self) -> Result<(), String> {
        validate_organization_name(&self.name_any(), DEFAULT_ORG_NAME)
    }

    fn check_managed(&self, org_name: &str) -> Result<(), String> {
        validate_organization_name(&self.name_any(), org_name)
    }

    async fn create_external(
        &self,
        scope: &ExternalScope<'_>,
    ) -> Result<ExternalEntity, ReconcilerError> {
        // The configured organization must resolve before the credential is trusted
        scope.organization().await?;
        entity(scope.session.create_organization(&self.name_any()).await?)
    }

    async fn resolve_for_deletion(
        &self,
        scope: &ExternalScope<'_>,
    ) -> Result<Option<ExternalEntity>, ReconcilerError> {
        match scope.session.find_organization_by_name(&self.name_any()).await {
            Ok(organization) => entity(organization).map(Some),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_external(
        &self,
        scope: &ExternalScope<'_>,
        entity: &ExternalEntity,
    ) -> Result<(), ReconcilerError> {
        Ok(scope.session.delete_organization(&entity.id).await?)
    }
}
