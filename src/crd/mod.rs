//! # Custom Resource Definitions
//!
//! CRD types for the InfluxDB operator.
//!
//! Bucket, Organization and Token are managed records: each one is reconciled
//! against an InfluxDB entity and shares [`ResourceStatus`]. Config is a
//! read-only connection descriptor.

pub mod bucket;
pub mod config;
pub mod organization;
pub mod status;
pub mod token;

pub use bucket::{Bucket, BucketSpec};
pub use config::{Config, ConfigSpec};
pub use organization::{Organization, OrganizationSpec};
pub use status::{Condition, Phase, ResourceStatus};
pub use token::{Permission, PermissionAction, ResourceType, Token, TokenSpec};

use kube::core::NamespaceResourceScope;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// A namespaced record whose status this operator owns
pub trait ManagedResource:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    fn status(&self) -> Option<&ResourceStatus>;

    fn status_mut(&mut self) -> &mut ResourceStatus;
}

macro_rules! impl_managed_resource {
    ($($kind:ty),+ $(,)?) => {
        $(
            impl ManagedResource for $kind {
                fn status(&self) -> Option<&ResourceStatus> {
                    self.status.as_ref()
                }

                fn status_mut(&mut self) -> &mut ResourceStatus {
                    self.status.get_or_insert_with(ResourceStatus::default)
                }
            }
        )+
    };
}

impl_managed_resource!(Bucket, Organization, Token);
