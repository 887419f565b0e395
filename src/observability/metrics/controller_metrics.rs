//! # Controller Metrics
//!
//! Metrics for reconciliation passes, requeues, InfluxDB operations and
//! "already exists" conflicts.

use crate::observability::metrics::registry::REGISTRY;
use anyhow::Result;
use prometheus::{HistogramVec, IntCounterVec};
use std::sync::LazyLock;

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "influxdb_operator_reconciliations_total",
            "Total number of reconciliation passes",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "influxdb_operator_reconciliation_errors_total",
            "Total number of reconciliation passes that ended in an error",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "influxdb_operator_reconciliation_duration_seconds",
            "Duration of reconciliation passes in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "influxdb_operator_requeues_total",
            "Total number of reconciliation requeues",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

static EXTERNAL_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "influxdb_operator_external_operations_total",
            "Total number of InfluxDB create and delete calls by result",
        ),
        &["kind", "operation", "result"],
    )
    .expect("Failed to create EXTERNAL_OPERATIONS_TOTAL metric - this should never happen")
});

static CONFLICTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "influxdb_operator_conflicts_total",
            "Total number of existing InfluxDB entities seen, by whether the sighting was logged",
        ),
        &["kind", "logged"],
    )
    .expect("Failed to create CONFLICTS_TOTAL metric - this should never happen")
});

/// Register controller metrics with the registry
pub(crate) fn register_controller_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(EXTERNAL_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CONFLICTS_TOTAL.clone()))?;
    Ok(())
}

pub fn increment_reconciliations(kind: &str) {
    RECONCILIATIONS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_reconciliation_errors(kind: &str) {
    RECONCILIATION_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn observe_reconciliation_duration(kind: &str, duration: f64) {
    RECONCILIATION_DURATION
        .with_label_values(&[kind])
        .observe(duration);
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}

pub fn increment_external_operation(kind: &str, operation: &str, result: &str) {
    EXTERNAL_OPERATIONS_TOTAL
        .with_label_values(&[kind, operation, result])
        .inc();
}

pub fn increment_conflicts(kind: &str, logged: bool) {
    let logged = if logged { "true" } else { "false" };
    CONFLICTS_TOTAL.with_label_values(&[kind, logged]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_reconciliations() {
        let before = RECONCILIATIONS_TOTAL.with_label_values(&["Bucket"]).get();
        increment_reconciliations("Bucket");
        let after = RECONCILIATIONS_TOTAL.with_label_values(&["Bucket"]).get();
        assert_eq!(after, before + 1);
    }

    #[test]
    fn test_increment_reconciliation_errors() {
        let before = RECONCILIATION_ERRORS_TOTAL
            .with_label_values(&["Token"])
            .get();
        increment_reconciliation_errors("Token");
        let after = RECONCILIATION_ERRORS_TOTAL
            .with_label_values(&["Token"])
            .get();
        assert_eq!(after, before + 1);
    }

    #[test]
    fn test_conflicts_split_by_logged() {
        let logged_before = CONFLICTS_TOTAL.with_label_values(&["bucket", "true"]).get();
        let muted_before = CONFLICTS_TOTAL.with_label_values(&["bucket", "false"]).get();
        increment_conflicts("bucket", true);
        increment_conflicts("bucket", false);
        increment_conflicts("bucket", false);
        assert_eq!(
            CONFLICTS_TOTAL.with_label_values(&["bucket", "true"]).get(),
            logged_before + 1
        );
        assert_eq!(
            CONFLICTS_TOTAL.with_label_values(&["bucket", "false"]).get(),
            muted_before + 2
        );
    }

    #[test]
    fn test_observe_reconciliation_duration() {
        let before = RECONCILIATION_DURATION
            .with_label_values(&["Organization"])
            .get_sample_count();
        observe_reconciliation_duration("Organization", 0.25);
        let after = RECONCILIATION_DURATION
            .with_label_values(&["Organization"])
            .get_sample_count();
        assert_eq!(after, before + 1);
    }

    #[test]
    fn test_external_operation_labels() {
        let before = EXTERNAL_OPERATIONS_TOTAL
            .with_label_values(&["token", "create", "conflict"])
            .get();
        increment_external_operation("token", "create", "conflict");
        assert_eq!(
            EXTERNAL_OPERATIONS_TOTAL
                .with_label_values(&["token", "create", "conflict"])
                .get(),
            before + 1
        );
    }
}
