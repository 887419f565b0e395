//! # InfluxDB Operator
//!
//! A Kubernetes operator that keeps InfluxDB v2 buckets, organizations and
//! authorization tokens in line with custom resources.
//!
//! ## Overview
//!
//! 1. **Bucket** records create a bucket with a retention rule in the configured organization
//! 2. **Organization** records create an organization named after the record
//! 3. **Token** records create an authorization and store its secret in a Kubernetes Secret
//!
//! Every managed record carries a finalizer so the external entity is removed
//! before the record disappears. Connection details come from a `Config`
//! record and a credential Secret in the same namespace.
//!
//! ## Features
//!
//! - **Idempotent passes**: existing entities are detected and adopted instead of duplicated
//! - **Debounced conflict logging**: "already exists" is logged once per record per window
//! - **Prometheus metrics**: exposed on `/metrics`
//! - **Health probes**: `/healthz` and `/readyz`

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod influxdb;
pub mod observability;
pub mod runtime;
pub mod store;

pub use crd::*;
