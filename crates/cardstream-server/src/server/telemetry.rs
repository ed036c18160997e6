//! Console logging.
//!
//! Events go through `tracing` and are printed by `tracing_subscriber::fmt`.
//! Verbosity follows `RUST_LOG` and defaults to `info`. Per-frame events are
//! logged at `trace`, so `RUST_LOG=cardstream_core=trace` shows every record
//! as it is written.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber. Call once, before anything logs.
pub fn init_tracing() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_file(true),
        )
        .try_init()?;
    Ok(())
}
