//! # Token
//!
//! An InfluxDB authorization materialized into a Kubernetes Secret.
//!
//! InfluxDB authorizations have no caller-chosen name, so the operator tags
//! each one with a description of the form `name.namespace.uid` and
//! correlates on that tag.

use crate::crd::organization::default_config_name;
use crate::crd::ResourceStatus;
use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};

/// Token Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: influxdb.kubetrail.io/v1beta1
/// kind: Token
/// metadata:
///   name: telegraf
///   namespace: monitoring
/// spec:
///   secretName: telegraf-influxdb
///   permissions:
///     - permissionType: write
///       resourceType: buckets
///       resourceName: metrics
/// ```
#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "Token",
    group = "influxdb.kubetrail.io",
    version = "v1beta1",
    namespaced,
    status = "ResourceStatus",
    shortname = "ifxtoken",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}, {"name":"Secret", "type":"string", "jsonPath":".spec.secretName"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct TokenSpec {
    /// Name of the Config record (same namespace) describing the InfluxDB connection
    #[serde(default = "default_config_name")]
    pub config_name: String,
    /// Secret receiving the token value. Derived from the record name and uid when empty.
    #[serde(default)]
    pub secret_name: Option<String>,
    /// Permissions granted to the authorization
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

/// A single permission granted to a token
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    /// Action allowed on the resource
    pub permission_type: PermissionAction,
    /// Kind of InfluxDB resource the permission applies to
    pub resource_type: ResourceType,
    /// Restrict the permission to a single named resource
    #[serde(default)]
    pub resource_name: Option<String>,
}

/// Permission action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum PermissionAction {
    Read,
    Write,
}

impl PermissionAction {
    pub fn as_str(self) -> &'static str {
        match self {
            PermissionAction::Read => "read",
            PermissionAction::Write => "write",
        }
    }
}

/// InfluxDB resource types a token may be scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum ResourceType {
    Authorizations,
    Buckets,
    Checks,
    Dashboards,
    Dbrp,
    Documents,
    Labels,
    Notebooks,
    NotificationEndpoints,
    NotificationRules,
    Orgs,
    Scrapers,
    Secrets,
    Sources,
    Tasks,
    Telegrafs,
    Users,
    Variables,
    Views,
}

impl ResourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Authorizations => "authorizations",
            ResourceType::Buckets => "buckets",
            ResourceType::Checks => "checks",
            ResourceType::Dashboards => "dashboards",
            ResourceType::Dbrp => "dbrp",
            ResourceType::Documents => "documents",
            ResourceType::Labels => "labels",
            ResourceType::Notebooks => "notebooks",
            ResourceType::NotificationEndpoints => "notificationEndpoints",
            ResourceType::NotificationRules => "notificationRules",
            ResourceType::Orgs => "orgs",
            ResourceType::Scrapers => "scrapers",
            ResourceType::Secrets => "secrets",
            ResourceType::Sources => "sources",
            ResourceType::Tasks => "tasks",
            ResourceType::Telegrafs => "telegrafs",
            ResourceType::Users => "users",
            ResourceType::Variables => "variables",
            ResourceType::Views => "views",
        }
    }
}

impl Token {
    /// Description tag identifying this record's authorization in InfluxDB
    pub fn authorization_description(&self) -> String {
        authorization_description(
            &self.name_any(),
            self.namespace().as_deref().unwrap_or_default(),
            self.metadata.uid.as_deref().unwrap_or_default(),
        )
    }

    /// Name of the Secret receiving the token value
    pub fn secret_name(&self) -> String {
        if let Some(name) = self.spec.secret_name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        match self.metadata.uid.as_deref().and_then(|uid| uid.get(..5)) {
            Some(prefix) => format!("{}-{}", self.name_any(), prefix),
            None => self.name_any(),
        }
    }
}

/// Build the `name.namespace.uid` description tag
pub fn authorization_description(name: &str, namespace: &str, uid: &str) -> String {
    format!("{name}.{namespace}.{uid}")
}
