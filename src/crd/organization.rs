//! # Organization
//!
//! An InfluxDB organization named after the record.

use crate::constants::{DEFAULT_CONFIG_NAME, DEFAULT_ORG_NAME};
use crate::crd::ResourceStatus;
use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// Organization Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: influxdb.kubetrail.io/v1beta1
/// kind: Organization
/// metadata:
///   name: team-a
/// spec:
///   configName: default
/// ```
#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "Organization",
    group = "influxdb.kubetrail.io",
    version = "v1beta1",
    namespaced,
    status = "ResourceStatus",
    shortname = "ifxorg",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}, {"name":"Reason", "type":"string", "jsonPath":".status.reason"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationSpec {
    /// Name of the Config record (same namespace) describing the InfluxDB connection
    #[serde(default = "default_config_name")]
    pub config_name: String,
}

impl Default for OrganizationSpec {
    fn default() -> Self {
        Self {
            config_name: default_config_name(),
        }
    }
}

pub(crate) fn default_config_name() -> String {
    DEFAULT_CONFIG_NAME.to_string()
}

/// The operator never manages the default organization nor the one named by
/// `configured_org`, which it authenticates against
pub fn validate_organization_name(name: &str, configured_org: &str) -> Result<(), String> {
    for reserved in [DEFAULT_ORG_NAME, configured_org] {
        if name == reserved {
            return Err(format!("cannot operate on {reserved}"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_name_defaults() {
        let spec: OrganizationSpec = serde_json::from_str("{}").unwrap();
        assert_eq!(spec.config_name, "default");
    }

    #[test]
    fn test_default_org_name_is_forbidden() {
        assert!(validate_organization_name("influxdata", "influxdata").is_err());
        assert!(validate_organization_name("team-a", "influxdata").is_ok());
    }

    #[test]
    fn test_configured_org_name_is_forbidden() {
        let err = validate_organization_name("acme", "acme").unwrap_err();
        assert_eq!(err, "cannot operate on acme");
        assert!(validate_organization_name("influxdata", "acme").is_err());
    }
}
