// [apps/monitor/src/main.rs]
//! Monitor binary entry point: parse configuration, bootstrap logging, hand
//! off to the Divergence Monitor.

use clap::Parser;

use loadgen_monitor::config::MonitorConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = MonitorConfig::parse();
    loadgen_telemetry::init_tracing("loadgen_monitor");
    loadgen_monitor::run(config).await
}
