//! # Condition Ledger
//!
//! Reason-keyed list of timestamped status entries.
//!
//! A status holds at most one condition per reason. Setting a reason that is
//! already present refreshes its `lastTransitionTime` in place; a new reason
//! is appended and becomes the status summary (`reason`, `message` and
//! optionally `phase`).

use crate::constants::CONDITION_STATUS_TRUE;
use crate::crd::{Condition, Phase, ResourceStatus};
use chrono::{DateTime, SecondsFormat, Utc};

/// One ledger entry to set
#[derive(Debug, Clone, Copy)]
pub struct ConditionEntry<'a> {
    pub reason: &'a str,
    pub r#type: &'a str,
    pub message: &'a str,
    /// Phase to adopt when the entry is appended; `None` keeps the current phase
    pub phase: Option<Phase>,
}

/// How [`set_condition`] changed the status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerChange {
    Appended,
    Refreshed,
}

pub fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Append or refresh the condition for `entry.reason`
///
/// Both outcomes change the status, so callers persist after either.
pub fn set_condition(
    status: &mut ResourceStatus,
    entry: ConditionEntry<'_>,
    generation: Option<i64>,
    now: DateTime<Utc>,
) -> LedgerChange {
    let timestamp = format_time(now);

    if let Some(existing) = status
        .conditions
        .iter_mut()
        .find(|c| c.reason == entry.reason)
    {
        existing.last_transition_time = timestamp;
        existing.observed_generation = generation;
        return LedgerChange::Refreshed;
    }

    status.conditions.push(Condition {
        r#type: entry.r#type.to_string(),
        status: CONDITION_STATUS_TRUE.to_string(),
        observed_generation: generation,
        last_transition_time: timestamp,
        reason: entry.reason.to_string(),
        message: entry.message.to_string(),
    });
    if let Some(phase) = entry.phase {
        status.phase = Some(phase);
    }
    status.message = Some(entry.message.to_string());
    status.reason = Some(entry.reason.to_string());
    LedgerChange::Appended
}

pub fn has_reason(status: Option<&ResourceStatus>, reason: &str) -> bool {
    status.is_some_and(|s| s.conditions.iter().any(|c| c.reason == reason))
}
