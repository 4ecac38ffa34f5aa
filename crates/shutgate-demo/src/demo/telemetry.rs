//! Console logging for the demo.
//!
//! Events from the binary and from the `shutgate` library are printed through
//! a pretty `fmt` layer. Verbosity defaults to `info` and can be raised with
//! `RUST_LOG`, for example `RUST_LOG=shutgate=trace` to see every worker
//! start and stop.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_file(true)
                .pretty(),
        )
        .try_init()?;

    Ok(())
}
