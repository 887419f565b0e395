//! # InfluxDB Operator
//!
//! Entry point of the operator binary. See the library crate for an overview.

use anyhow::Result;
use influxdb_operator::runtime::initialization::initialize;
use influxdb_operator::runtime::watch_loop::run_watch_loop;

#[tokio::main]
async fn main() -> Result<()> {
    let init_result = initialize().await?;

    run_watch_loop(init_result).await
}
