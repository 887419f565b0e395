//! # Controller
//!
//! Reconciliation engine, per-kind strategies, error backoff and the
//! metrics/probe server.

pub mod backoff;
pub mod kinds;
pub mod reconciler;
pub mod server;
