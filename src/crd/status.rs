//! # Managed Resource Status
//!
//! Status shared by Bucket, Organization and Token records.

use schemars::{JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle phase of a managed record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Finalizer installed, external entity not yet confirmed
    Pending,
    /// External entity confirmed present
    Ready,
    /// Deletion requested, external cleanup in progress
    Terminating,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Pending => "pending",
            Phase::Ready => "ready",
            Phase::Terminating => "terminating",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl JsonSchema for Phase {
    fn schema_name() -> Cow<'static, str> {
        Cow::Borrowed("Phase")
    }

    fn json_schema(_gen: &mut SchemaGenerator) -> Schema {
        // Plain string enum keeps the CRD schema structural
        schemars::json_schema!({
            "type": "string",
            "enum": ["pending", "ready", "terminating"],
            "description": "Lifecycle phase: pending, ready or terminating."
        })
    }
}

/// Status of a managed record
///
/// `conditions` holds at most one entry per distinct reason. `message` and
/// `reason` summarize the latest transition.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStatus {
    /// Current lifecycle phase
    #[serde(default)]
    pub phase: Option<Phase>,
    /// Reason-keyed reconciliation history
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Human-readable summary of the latest transition
    #[serde(default)]
    pub message: Option<String>,
    /// Machine-readable summary of the latest transition
    #[serde(default)]
    pub reason: Option<String>,
    /// Externally assigned identifiers persisted across passes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<BTreeMap<String, String>>,
}

impl ResourceStatus {
    /// Look up a persisted external identifier
    pub fn data_value(&self, key: &str) -> Option<&str> {
        self.data.as_ref()?.get(key).map(String::as_str)
    }
}

/// Condition represents one aspect of a record's reconciliation history
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: String,
    /// Generation of the record this condition was recorded against
    #[serde(default)]
    pub observed_generation: Option<i64>,
    /// Last transition time (RFC3339)
    pub last_transition_time: String,
    /// Reason for the condition, unique within a status
    pub reason: String,
    /// Message describing the condition
    #[serde(default)]
    pub message: String,
}
