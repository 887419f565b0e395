use crate::constants::{CONDITION_TYPE_INFLUXDB, DEFAULT_CONFIG_NAME};
use crate::controller::reconciler::conditions::ConditionEntry;
use crate::controller::reconciler::{ExternalEntity, ExternalKind, ExternalScope, ReconcilerError};
use crate::crd::{Bucket, Phase};
use crate::influxdb::types::{self, NewBucket, RetentionRule};
use async_trait::async_trait;
use kube::ResourceExt;

fn entity(bucket: types::Bucket) -> Result<ExternalEntity, ReconcilerError> {
    let id = bucket
        .id
        .ok_or_else(|| ReconcilerError::invalid_entity("bucket", "missing id"))?;
    Ok(ExternalEntity::new(id, bucket.name))
}

#[async_trait]
impl ExternalKind for Bucket {
    const DEBOUNCE_TAG: &'static str = "bucket";
    const ENTITY: &'static str = "bucket";
    const CREATED: ConditionEntry<'static> = ConditionEntry {
        reason: "createdBucket",
        r#type: CONDITION_TYPE_INFLUXDB,
        message: "created influxdb bucket",
        phase: Some(Phase::Ready),
    };
    const DELETED: ConditionEntry<'static> = ConditionEntry {
        reason: "deletedBucket",
        r#type: CONDITION_TYPE_INFLUXDB,
        message: "deleted influxdb bucket",
        phase: None,
    };

    fn config_name(&self) -> String {
        DEFAULT_CONFIG_NAME.to_string()
    }

    fn validate(&self) -> Result<(), String> {
        self.spec.validate()
    }

    async fn create_external(
        &self,
        scope: &ExternalScope<'_>,
    ) -> Result<ExternalEntity, ReconcilerError> {
        let request = NewBucket {
            org_id: scope.organization_id().await?.to_string(),
            name: self.name_any(),
            description: self.spec.description.clone(),
            retention_rules: vec![RetentionRule::expire(self.spec.seconds_ttl)],
        };
        entity(scope.session.create_bucket(&request).await?)
    }

    /// The organization must still exist: its id is needed to list buckets
    async fn resolve_for_deletion(
        &self,
        scope: &ExternalScope<'_>,
    ) -> Result<Option<ExternalEntity>, ReconcilerError> {
        let org_id = scope.organization_id().await?;
        let name = self.name_any();
        scope
            .session
            .find_buckets_by_org(org_id)
            .await?
            .into_iter()
            .find(|bucket| bucket.name == name)
            .map(entity)
            .transpose()
    }

    async fn delete_external(
        &self,
        scope: &ExternalScope<'_>,
        entity: &ExternalEntity,
    ) -> Result<(), ReconcilerError> {
        Ok(scope.session.delete_bucket(&entity.id).await?)
    }
}
