//! # InfluxDB v2 Client
//!
//! Organization, bucket and authorization CRUD against the InfluxDB v2 API.

pub mod client;
pub mod error;
pub mod rest;
pub mod types;

pub use client::{InfluxConnector, InfluxSession};
pub use error::InfluxError;
pub use rest::{InfluxRestConnector, InfluxRestSession};
