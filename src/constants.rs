//! # Constants
//!
//! Shared names and defaults for the InfluxDB operator.

/// Field manager used for server-side writes
pub const FIELD_MANAGER: &str = "influxdb-operator";

/// Finalizer that blocks physical deletion until external cleanup has run
pub const FINALIZER: &str = "influxdb.kubetrail.io/finalizer";

/// Annotation bumped by `ifxctl reconcile` to force a fresh pass
pub const RECONCILE_ANNOTATION: &str = "influxdb.kubetrail.io/reconcile";

/// Config record resolved by Bucket records
pub const DEFAULT_CONFIG_NAME: &str = "default";

/// Organization used when a Config does not name one
pub const DEFAULT_ORG_NAME: &str = "influxdata";

/// Credential secret used when a Config does not name one
pub const DEFAULT_TOKEN_SECRET_NAME: &str = "influxdb-token";

/// InfluxDB address used when a Config does not name one
pub const DEFAULT_INFLUXDB_ADDR: &str = "http://influxdb.influxdb-system.svc.cluster.local";

/// Secret data key holding a bearer token
pub const KEY_TOKEN: &str = "token";

/// Status data key holding the external authorization id of a Token
pub const KEY_TOKEN_ID: &str = "tokenId";

/// Minimum non-zero bucket retention accepted by InfluxDB
pub const MIN_BUCKET_RETENTION_SECS: i64 = 3600;

// Condition reasons and types
pub const REASON_OBJECT_INITIALIZED: &str = "objectInitialized";
pub const REASON_OBJECT_MARKED_FOR_DELETION: &str = "objectMarkedForDeletion";
pub const REASON_FINALIZER_ADDED: &str = "finalizerAdded";
pub const CONDITION_TYPE_OBJECT: &str = "object";
pub const CONDITION_TYPE_INFLUXDB: &str = "influxdb";
pub const CONDITION_STATUS_TRUE: &str = "True";

// Controller defaults
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_CONFLICT_DEBOUNCE_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_RECONCILE_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_INFLUXDB_HTTP_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 5;
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;
pub const DEFAULT_CONTROLLER_CONCURRENCY: u16 = 4;

// Server defaults
pub const DEFAULT_METRICS_PORT: u16 = 8080;
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;
