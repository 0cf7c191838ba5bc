// [apps/worker/src/main.rs]
//! Worker binary entry point: parse configuration, bootstrap logging, hand
//! off to the Worker Core.

use clap::Parser;

use loadgen_worker::config::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = WorkerConfig::parse();
    loadgen_telemetry::init_tracing("loadgen_worker");
    loadgen_worker::run(config).await
}
