//! # InfluxDB v2 API Types
//!
//! JSON payloads exchanged with the InfluxDB v2 REST API.
//!
//! API Reference: https://docs.influxdata.com/influxdb/v2/api/

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Organization as returned by `GET /api/v2/orgs`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Organizations {
    #[serde(default)]
    pub orgs: Vec<Organization>,
}

/// Request body for `POST /api/v2/orgs`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewOrganization {
    pub name: String,
}

/// Bucket as returned by `GET /api/v2/buckets`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "orgID", default)]
    pub org_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub retention_rules: Vec<RetentionRule>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Buckets {
    #[serde(default)]
    pub buckets: Vec<Bucket>,
}

/// Retention rule; `every_seconds == 0` keeps data forever
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionRule {
    #[serde(rename = "type", default = "default_retention_type")]
    pub rule_type: String,
    pub every_seconds: i64,
}

impl RetentionRule {
    pub fn expire(every_seconds: i64) -> Self {
        Self {
            rule_type: default_retention_type(),
            every_seconds,
        }
    }
}

fn default_retention_type() -> String {
    "expire".to_string()
}

/// Request body for `POST /api/v2/buckets`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBucket {
    #[serde(rename = "orgID")]
    pub org_id: String,
    pub name: String,
    pub description: String,
    pub retention_rules: Vec<RetentionRule>,
}

/// Authorization as returned by `GET /api/v2/authorizations`
#[derive(Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub token: Option<Zeroizing<String>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "orgID", default)]
    pub org_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub permissions: Vec<ApiPermission>,
}

impl std::fmt::Debug for Authorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorization")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("org_id", &self.org_id)
            .field("status", &self.status)
            .field("permissions", &self.permissions)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Authorizations {
    #[serde(default)]
    pub authorizations: Vec<Authorization>,
}

/// Request body for `POST /api/v2/authorizations`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAuthorization {
    #[serde(rename = "orgID")]
    pub org_id: String,
    pub description: String,
    pub permissions: Vec<ApiPermission>,
}

/// Permission in InfluxDB wire format
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ApiPermission {
    pub action: String,
    pub resource: ApiResource,
}

/// Resource targeted by a permission
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct ApiResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "orgID", default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
}
