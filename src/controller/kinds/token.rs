use crate::constants::{CONDITION_TYPE_INFLUXDB, KEY_TOKEN, KEY_TOKEN_ID};
use crate::controller::reconciler::conditions::ConditionEntry;
use crate::controller::reconciler::{
    ConflictDebouncer, ExternalEntity, ExternalKind, ExternalScope, Reconciler, ReconcilerError,
};
use crate::crd::{Permission, Phase, ResourceType, Token};
use crate::influxdb::types::{
    ApiPermission, ApiResource, Authorization, NewAuthorization, Organization,
};
use crate::store::SecretWrite;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Translate record permissions into InfluxDB permissions scoped to `organization`
///
/// `orgs` permissions carry no organization scope.
pub fn api_permissions(permissions: &[Permission], organization: &Organization) -> Vec<ApiPermission> {
    permissions
        .iter()
        .map(|permission| {
            let name = permission
                .resource_name
                .clone()
                .filter(|name| !name.is_empty());
            let resource = if permission.resource_type == ResourceType::Orgs {
                ApiResource {
                    resource_type: permission.resource_type.as_str().to_string(),
                    name,
                    ..Default::default()
                }
            } else {
                ApiResource {
                    resource_type: permission.resource_type.as_str().to_string(),
                    name,
                    org: Some(organization.name.clone()),
                    org_id: organization.id.clone(),
                    ..Default::default()
                }
            };
            ApiPermission {
                action: permission.permission_type.as_str().to_string(),
                resource,
            }
        })
        .collect()
}

fn entity(authorization: Authorization) -> Result<ExternalEntity, ReconcilerError> {
    let (Some(id), Some(token)) = (authorization.id, authorization.token) else {
        return Err(ReconcilerError::invalid_entity(
            "authorization",
            "received no id or token",
        ));
    };
    Ok(ExternalEntity {
        id,
        name: authorization.description.unwrap_or_default(),
        secret: Some(token),
    })
}

impl Token {
    async fn find_by_description(
        &self,
        scope: &ExternalScope<'_>,
    ) -> Result<Option<Authorization>, ReconcilerError> {
        let org_id = scope.organization_id().await?;
        let description = self.authorization_description();
        Ok(scope
            .session
            .find_authorizations_by_org(org_id)
            .await?
            .into_iter()
            .find(|a| a.description.as_deref() == Some(description.as_str())))
    }

    fn secret_for(&self, token: &str) -> Secret {
        let data = BTreeMap::from([(
            KEY_TOKEN.to_string(),
            ByteString(token.as_bytes().to_vec()),
        )]);
        Secret {
            metadata: ObjectMeta {
                name: Some(self.secret_name()),
                namespace: self.namespace(),
                owner_references: self.controller_owner_ref(&()).map(|owner| vec![owner]),
                ..Default::default()
            },
            data: Some(data),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ExternalKind for Token {
    const DEBOUNCE_TAG: &'static str = "token";
    const ENTITY: &'static str = "token";
    const CREATED: ConditionEntry<'static> = ConditionEntry {
        reason: "createdToken",
        r#type: CONDITION_TYPE_INFLUXDB,
        message: "created influxdb token",
        phase: Some(Phase::Ready),
    };
    const DELETED: ConditionEntry<'static> = ConditionEntry {
        reason: "deletedToken",
        r#type: CONDITION_TYPE_INFLUXDB,
        message: "deleted influxdb token",
        phase: None,
    };

    fn config_name(&self) -> String {
        self.spec.config_name.clone()
    }

    async fn find_existing(
        &self,
        scope: &ExternalScope<'_>,
    ) -> Result<Option<ExternalEntity>, ReconcilerError> {
        self.find_by_description(scope)
            .await?
            .map(entity)
            .transpose()
    }

    async fn create_external(
        &self,
        scope: &ExternalScope<'_>,
    ) -> Result<ExternalEntity, ReconcilerError> {
        let organization = scope.organization().await?;
        let org_id = scope.organization_id().await?.to_string();
        let request = NewAuthorization {
            org_id,
            description: self.authorization_description(),
            permissions: api_permissions(&self.spec.permissions, organization),
        };
        entity(scope.session.create_authorization(&request).await?)
    }

    /// A conflict after an empty scan means another writer won the race
    async fn recover_after_conflict(
        &self,
        scope: &ExternalScope<'_>,
    ) -> Result<Option<ExternalEntity>, ReconcilerError> {
        match self.find_existing(scope).await? {
            Some(entity) => Ok(Some(entity)),
            None => Err(ReconcilerError::invalid_entity(
                "authorization",
                format!(
                    "create reported a conflict but no authorization is tagged {}",
                    self.authorization_description()
                ),
            )),
        }
    }

    async fn resolve_for_deletion(
        &self,
        scope: &ExternalScope<'_>,
    ) -> Result<Option<ExternalEntity>, ReconcilerError> {
        let stored_id = self
            .status
            .as_ref()
            .and_then(|s| s.data_value(KEY_TOKEN_ID))
            .map(str::to_string);

        let found = match self.find_by_description(scope).await {
            Ok(found) => found,
            Err(ReconcilerError::Influx(e)) if e.is_not_found() => {
                info!("organization not found");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let id = found.and_then(|a| a.id).or(stored_id);
        Ok(id.map(|id| ExternalEntity::new(id, self.authorization_description())))
    }

    async fn delete_external(
        &self,
        scope: &ExternalScope<'_>,
        entity: &ExternalEntity,
    ) -> Result<(), ReconcilerError> {
        Ok(scope.session.delete_authorization(&entity.id).await?)
    }

    /// Create or refresh the Secret holding the token value
    async fn materialize(
        &self,
        reconciler: &Reconciler<Self>,
        entity: &ExternalEntity,
    ) -> Result<(), ReconcilerError> {
        let token = entity
            .secret
            .as_ref()
            .ok_or_else(|| ReconcilerError::invalid_entity("authorization", "received no token"))?;
        let desired = self.secret_for(token);

        if reconciler.store.create_secret(&desired).await? == SecretWrite::Created {
            info!("created secret");
            return Ok(());
        }

        let key = ConflictDebouncer::key(&self.uid().unwrap_or_default(), "secret");
        reconciler
            .debouncer
            .debounce(&key, reconciler.settings.debounce_window, || {
                info!("secret exists");
            });

        let namespace = self.namespace().unwrap_or_default();
        let Some(mut current) = reconciler
            .store
            .get_secret(&namespace, &self.secret_name())
            .await?
        else {
            debug!("secret vanished after create reported it exists");
            return Ok(());
        };

        let matches = current
            .data
            .as_ref()
            .and_then(|data| data.get(KEY_TOKEN))
            .is_some_and(|value| value.0 == token.as_bytes());
        if !matches {
            current.data = desired.data;
            reconciler.store.replace_secret(&current).await?;
            info!("updated secret");
        }
        Ok(())
    }

    fn status_data(entity: &ExternalEntity) -> Option<(&'static str, String)> {
        Some((KEY_TOKEN_ID, entity.id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::PermissionAction;

    fn org() -> Organization {
        Organization {
            id: Some("org-1".to_string()),
            name: "influxdata".to_string(),
            description: None,
        }
    }

    #[test]
    fn test_bucket_permission_is_org_scoped() {
        let permissions = api_permissions(
            &[Permission {
                permission_type: PermissionAction::Write,
                resource_type: ResourceType::Buckets,
                resource_name: Some("metrics".to_string()),
            }],
            &org(),
        );
        assert_eq!(permissions.len(), 1);
        assert_eq!(permissions[0].action, "write");
        assert_eq!(permissions[0].resource.resource_type, "buckets");
        assert_eq!(permissions[0].resource.name.as_deref(), Some("metrics"));
        assert_eq!(permissions[0].resource.org.as_deref(), Some("influxdata"));
        assert_eq!(permissions[0].resource.org_id.as_deref(), Some("org-1"));
    }

    #[test]
    fn test_orgs_permission_has_no_scope() {
        let permissions = api_permissions(
            &[Permission {
                permission_type: PermissionAction::Read,
                resource_type: ResourceType::Orgs,
                resource_name: Some(String::new()),
            }],
            &org(),
        );
        let resource = &permissions[0].resource;
        assert_eq!(resource.resource_type, "orgs");
        assert!(resource.name.is_none());
        assert!(resource.org.is_none());
        assert!(resource.org_id.is_none());
    }

    #[test]
    fn test_entity_requires_id_and_token() {
        let authorization: Authorization =
            serde_json::from_str(r#"{"id":"a1","description":"t.ns.uid"}"#).unwrap();
        assert!(matches!(
            entity(authorization),
            Err(ReconcilerError::InvalidExternalEntity { .. })
        ));
    }

    #[test]
    fn test_secret_is_owned_by_token() {
        let token = Token {
            metadata: ObjectMeta {
                name: Some("telegraf".to_string()),
                namespace: Some("monitoring".to_string()),
                uid: Some("3f1c2a9e-0000".to_string()),
                ..Default::default()
            },
            spec: crate::crd::TokenSpec {
                config_name: "default".to_string(),
                secret_name: None,
                permissions: vec![],
            },
            status: None,
        };
        let secret = token.secret_for("abc");
        assert_eq!(secret.metadata.name.as_deref(), Some("telegraf-3f1c2"));
        assert_eq!(secret.metadata.namespace.as_deref(), Some("monitoring"));
        let owners = secret.metadata.owner_references.unwrap();
        assert_eq!(owners[0].kind, "Token");
        assert_eq!(owners[0].controller, Some(true));
        assert_eq!(secret.data.unwrap()[KEY_TOKEN].0, b"abc".to_vec());
    }
}
