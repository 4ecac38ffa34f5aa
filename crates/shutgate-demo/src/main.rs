#![doc = include_str!("../README.md")]

mod demo;

use clap::Parser;
use demo::config::{CliArgs, DemoConfig};
use demo::telemetry::init_telemetry;

// Using mimalloc for better performance when many worker threads allocate
// concurrently, especially in musl environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = DemoConfig::try_from(args)?;

    init_telemetry()?;
    log_startup_info(&config);

    demo::runner::run(config).await
}

fn log_startup_info(config: &DemoConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting shutgate demo with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting shutgate demo with {} workers ({:?})",
            config.workers,
            config.mode
        );
    }
}
