//! # InfluxDB Connection Config
//!
//! The Config record tells reconcilers where InfluxDB lives and which
//! Secret holds the operator's bearer token.

use crate::constants::{DEFAULT_INFLUXDB_ADDR, DEFAULT_ORG_NAME, DEFAULT_TOKEN_SECRET_NAME};
use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// Config Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: influxdb.kubetrail.io/v1beta1
/// kind: Config
/// metadata:
///   name: default
///   namespace: monitoring
/// spec:
///   addr: http://influxdb.influxdb-system.svc.cluster.local
///   orgName: influxdata
///   tokenSecretName: influxdb-token
///   tokenSecretNamespace: influxdb-system
/// ```
#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "Config",
    group = "influxdb.kubetrail.io",
    version = "v1beta1",
    namespaced,
    shortname = "ifxconfig"
)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSpec {
    /// InfluxDB base URL
    #[serde(default = "default_addr")]
    pub addr: String,
    /// Organization every managed bucket and token lives in
    #[serde(default = "default_org_name")]
    pub org_name: String,
    /// Secret holding the operator's bearer token under key `token`
    #[serde(default = "default_token_secret_name")]
    pub token_secret_name: String,
    /// Namespace of the token secret. Defaults to the Config's namespace.
    #[serde(default)]
    pub token_secret_namespace: Option<String>,
}

impl Default for ConfigSpec {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            org_name: default_org_name(),
            token_secret_name: default_token_secret_name(),
            token_secret_namespace: None,
        }
    }
}

impl ConfigSpec {
    /// Namespace of the token secret, falling back to the Config's own
    pub fn secret_namespace<'a>(&'a self, config_namespace: &'a str) -> &'a str {
        self.token_secret_namespace
            .as_deref()
            .filter(|ns| !ns.is_empty())
            .unwrap_or(config_namespace)
    }
}

fn default_addr() -> String {
    DEFAULT_INFLUXDB_ADDR.to_string()
}

fn default_org_name() -> String {
    DEFAULT_ORG_NAME.to_string()
}

fn default_token_secret_name() -> String {
    DEFAULT_TOKEN_SECRET_NAME.to_string()
}
