//! # Logging
//!
//! Everything is logged through `tracing`. The pool itself emits events when
//! built with its `tracing` feature (enabled by this crate): worker start and
//! stop at `trace`, every job at `debug`, caught panics at `error`.
//!
//! The filter defaults to `info` and follows `RUST_LOG` when set:
//!
//! ```bash
//! RUST_LOG=debug file-sorter ~/Pictures sort
//! RUST_LOG=jobpool=trace,info file-sorter ~/Pictures fix-folders
//! ```

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber. Call once, before anything logs.
pub fn init_telemetry() -> anyhow::Result<()> {
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
