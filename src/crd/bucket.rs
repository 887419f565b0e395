//! # Bucket
//!
//! An InfluxDB bucket inside the organization named by the namespace's default Config.

use crate::constants::MIN_BUCKET_RETENTION_SECS;
use crate::crd::ResourceStatus;
use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// Bucket Custom Resource Definition
///
/// The external bucket is named after the record itself.
///
/// # Example
///
/// ```yaml
/// apiVersion: influxdb.kubetrail.io/v1beta1
/// kind: Bucket
/// metadata:
///   name: metrics
///   namespace: default
/// spec:
///   description: application metrics
///   secondsTtl: 0
/// ```
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "Bucket",
    group = "influxdb.kubetrail.io",
    version = "v1beta1",
    namespaced,
    status = "ResourceStatus",
    shortname = "ifxbucket",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}, {"name":"Reason", "type":"string", "jsonPath":".status.reason"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct BucketSpec {
    /// Free-text description stored on the InfluxDB bucket
    #[serde(default)]
    pub description: String,
    /// Retention in seconds. 0 keeps data forever, otherwise at least 3600.
    #[serde(default)]
    pub seconds_ttl: i64,
}

impl BucketSpec {
    /// Reject retention values InfluxDB would refuse
    pub fn validate(&self) -> Result<(), String> {
        if self.seconds_ttl < 0
            || (self.seconds_ttl != 0 && self.seconds_ttl < MIN_BUCKET_RETENTION_SECS)
        {
            return Err(format!(
                "secondsTtl needs be either 0 or >= {MIN_BUCKET_RETENTION_SECS}, got {}",
                self.seconds_ttl
            ));
        }
        Ok(())
    }
}
