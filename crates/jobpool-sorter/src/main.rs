#![doc = include_str!("../README.md")]

mod sorter;

use clap::Parser;
use jobpool::CancellationToken;
use sorter::{
    config::{CliArgs, SorterConfig},
    runner,
    telemetry::init_telemetry,
};
use tokio::signal;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = SorterConfig::try_from(args)?;

    init_telemetry()?;
    log_startup_info(&config);

    let summary = runner::run(&config, CancellationToken::new(), shutdown_signal()).await?;
    tracing::info!("{summary}");

    if summary.failed > 0 {
        anyhow::bail!("{} of {} jobs failed", summary.failed, summary.answered());
    }
    Ok(())
}

fn log_startup_info(config: &SorterConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting file-sorter with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting {:?} on {} with {} workers",
            config.mode,
            config.root.display(),
            config.num_workers
        );
    }
}

/// Resolves on Ctrl+C or SIGTERM. Never resolves if no handler could be
/// installed.
async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }
}
