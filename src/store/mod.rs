//! # Record Store
//!
//! The reconcilers read and write Kubernetes objects only through
//! [`RecordStore`]. [`KubeStore`] is the production implementation; tests
//! drive the reconcilers against an in-memory store.
//!
//! Writes are optimistic: the object's `resourceVersion` travels with every
//! update and a stale version fails with [`StoreError::Conflict`]. The
//! reconcilers never retry such a conflict themselves; the watch redelivers
//! the fresh object.

mod kube_store;

pub use kube_store::KubeStore;

use crate::crd::Config;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use thiserror::Error;

/// Error returned by the record store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
    /// Write carried a stale resourceVersion
    #[error("conflicting write to {kind} {namespace}/{name}: object was modified")]
    Conflict {
        kind: String,
        namespace: String,
        name: String,
    },
    #[error("failed to serialize {0}")]
    Serialization(#[from] serde_json::Error),
    /// Record was deleted between read and write
    #[error("{kind} {namespace}/{name} no longer exists")]
    NotFound {
        kind: String,
        namespace: String,
        name: String,
    },
}

/// Result of a Secret create
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretWrite {
    Created,
    AlreadyExists,
}

/// Strongly-consistent object store holding records of kind `K`
/// plus the Config and Secret records they reference
#[async_trait]
pub trait RecordStore<K>: Send + Sync {
    /// Fetch a record; `None` when it does not exist
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, StoreError>;

    /// Replace metadata and spec, returning the stored object
    async fn update(&self, obj: &K) -> Result<K, StoreError>;

    /// Write the status subresource, returning the stored object
    async fn update_status(&self, obj: &K) -> Result<K, StoreError>;

    async fn get_config(&self, namespace: &str, name: &str) -> Result<Option<Config>, StoreError>;

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, StoreError>;

    async fn create_secret(&self, secret: &Secret) -> Result<SecretWrite, StoreError>;

    async fn replace_secret(&self, secret: &Secret) -> Result<(), StoreError>;
}
