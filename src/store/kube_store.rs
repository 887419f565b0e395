//! # Kubernetes Record Store
//!
//! [`RecordStore`] backed by the Kubernetes API server.

use super::{RecordStore, SecretWrite, StoreError};
use crate::constants::FIELD_MANAGER;
use crate::crd::{Config, ManagedResource};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Patch, PatchParams, PostParams};
use kube::{Api, Client, ResourceExt};
use std::marker::PhantomData;
use tracing::debug;

pub struct KubeStore<K> {
    client: Client,
    _kind: PhantomData<fn() -> K>,
}

impl<K> KubeStore<K> {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            _kind: PhantomData,
        }
    }
}

impl<K> Clone for KubeStore<K> {
    fn clone(&self) -> Self {
        Self::new(self.client.clone())
    }
}

fn post_params() -> PostParams {
    PostParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    }
}

/// Translate a 409 into [`StoreError::Conflict`] and a 404 into [`StoreError::NotFound`]
fn map_write_error(err: kube::Error, kind: &str, namespace: &str, name: &str) -> StoreError {
    let (kind, namespace, name) = (kind.to_string(), namespace.to_string(), name.to_string());
    match err {
        kube::Error::Api(api_err) if api_err.code == 409 => StoreError::Conflict {
            kind,
            namespace,
            name,
        },
        kube::Error::Api(api_err) if api_err.code == 404 => StoreError::NotFound {
            kind,
            namespace,
            name,
        },
        other => StoreError::Kube(other),
    }
}

#[async_trait]
impl<K: ManagedResource> RecordStore<K> for KubeStore<K> {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, StoreError> {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn update(&self, obj: &K) -> Result<K, StoreError> {
        let namespace = obj.namespace().unwrap_or_default();
        let name = obj.name_any();
        let api: Api<K> = Api::namespaced(self.client.clone(), &namespace);
        api.replace(&name, &post_params(), obj)
            .await
            .map_err(|e| map_write_error(e, &K::kind(&()), &namespace, &name))
    }

    async fn update_status(&self, obj: &K) -> Result<K, StoreError> {
        let namespace = obj.namespace().unwrap_or_default();
        let name = obj.name_any();
        let api: Api<K> = Api::namespaced(self.client.clone(), &namespace);

        // resourceVersion makes the merge patch fail on a stale copy
        let patch = serde_json::json!({
            "metadata": { "resourceVersion": obj.resource_version() },
            "status": serde_json::to_value(obj.status())?,
        });

        debug!("patching status of {} {}/{}", K::kind(&()), namespace, name);
        api.patch_status(&name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(patch))
            .await
            .map_err(|e| map_write_error(e, &K::kind(&()), &namespace, &name))
    }

    async fn get_config(&self, namespace: &str, name: &str) -> Result<Option<Config>, StoreError> {
        let api: Api<Config> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, StoreError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn create_secret(&self, secret: &Secret) -> Result<SecretWrite, StoreError> {
        let namespace = secret.namespace().unwrap_or_default();
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &namespace);
        match api.create(&post_params(), secret).await {
            Ok(_) => Ok(SecretWrite::Created),
            Err(kube::Error::Api(api_err)) if api_err.code == 409 => Ok(SecretWrite::AlreadyExists),
            Err(e) => Err(StoreError::Kube(e)),
        }
    }

    async fn replace_secret(&self, secret: &Secret) -> Result<(), StoreError> {
        let namespace = secret.namespace().unwrap_or_default();
        let name = secret.name_any();
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &namespace);
        api.replace(&name, &post_params(), secret)
            .await
            .map_err(|e| map_write_error(e, "Secret", &namespace, &name))?;
        Ok(())
    }
}
