//! # Controller Configuration
//!
//! Reconciliation timing, backoff bounds and watch scope.

use super::{env_lookup, var_or_default};
use crate::constants::{
    DEFAULT_BACKOFF_MAX_SECS, DEFAULT_BACKOFF_MIN_SECS, DEFAULT_CONFLICT_DEBOUNCE_SECS,
    DEFAULT_CONTROLLER_CONCURRENCY, DEFAULT_INFLUXDB_HTTP_TIMEOUT_SECS,
    DEFAULT_RECONCILE_TIMEOUT_SECS, DEFAULT_RESYNC_INTERVAL_SECS,
};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Delay before a converged record is reconciled again
    pub resync_interval: Duration,
    /// Window during which repeated "already exists" sightings are not logged
    pub conflict_debounce: Duration,
    /// Deadline for a single reconciliation pass
    pub reconcile_timeout: Duration,
    /// Per-request timeout of the InfluxDB client
    pub influxdb_http_timeout: Duration,
    pub backoff_min_secs: u64,
    pub backoff_max_secs: u64,
    /// Maximum concurrent passes per kind
    pub concurrency: u16,
    /// Namespace to watch; all namespaces when `None`
    pub watch_namespace: Option<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let secs = |key: &str, default: u64| Duration::from_secs(var_or_default(&lookup, key, default));
        let backoff_min_secs = var_or_default(&lookup, "BACKOFF_MIN_SECS", DEFAULT_BACKOFF_MIN_SECS);
        let backoff_max_secs = var_or_default(&lookup, "BACKOFF_MAX_SECS", DEFAULT_BACKOFF_MAX_SECS);

        Self {
            resync_interval: secs("RESYNC_INTERVAL_SECS", DEFAULT_RESYNC_INTERVAL_SECS),
            conflict_debounce: secs("CONFLICT_DEBOUNCE_SECS", DEFAULT_CONFLICT_DEBOUNCE_SECS),
            reconcile_timeout: secs("RECONCILE_TIMEOUT_SECS", DEFAULT_RECONCILE_TIMEOUT_SECS),
            influxdb_http_timeout: secs(
                "INFLUXDB_HTTP_TIMEOUT_SECS",
                DEFAULT_INFLUXDB_HTTP_TIMEOUT_SECS,
            ),
            backoff_min_secs,
            backoff_max_secs: backoff_max_secs.max(backoff_min_secs),
            concurrency: var_or_default(&lookup, "CONTROLLER_CONCURRENCY", DEFAULT_CONTROLLER_CONCURRENCY)
                .max(1),
            watch_namespace: lookup("WATCH_NAMESPACE")
                .map(|ns| ns.trim().to_string())
                .filter(|ns| !ns.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(vars: &[(&str, &str)]) -> ControllerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ControllerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::default();
        assert_eq!(config.resync_interval, Duration::from_secs(60));
        assert_eq!(config.conflict_debounce, Duration::from_secs(86_400));
        assert_eq!(config.reconcile_timeout, Duration::from_secs(60));
        assert_eq!(config.influxdb_http_timeout, Duration::from_secs(15));
        assert_eq!(config.backoff_min_secs, 5);
        assert_eq!(config.backoff_max_secs, 300);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.watch_namespace, None);
    }

    #[test]
    fn test_overrides() {
        let config = from_map(&[
            ("RESYNC_INTERVAL_SECS", "30"),
            ("CONFLICT_DEBOUNCE_SECS", "3600"),
            ("WATCH_NAMESPACE", "monitoring"),
            ("CONTROLLER_CONCURRENCY", "8"),
        ]);
        assert_eq!(config.resync_interval, Duration::from_secs(30));
        assert_eq!(config.conflict_debounce, Duration::from_secs(3600));
        assert_eq!(config.watch_namespace.as_deref(), Some("monitoring"));
        assert_eq!(config.concurrency, 8);
    }

    #[test]
    fn test_blank_namespace_means_all() {
        assert_eq!(from_map(&[("WATCH_NAMESPACE", "  ")]).watch_namespace, None);
    }

    #[test]
    fn test_backoff_max_never_below_min() {
        let config = from_map(&[("BACKOFF_MIN_SECS", "60"), ("BACKOFF_MAX_SECS", "10")]);
        assert_eq!(config.backoff_min_secs, 60);
        assert_eq!(config.backoff_max_secs, 60);
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        assert_eq!(from_map(&[("CONTROLLER_CONCURRENCY", "0")]).concurrency, 1);
    }
}
