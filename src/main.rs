use std::process::ExitCode;

use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use mad::{logging, CliArgs, Pipeline};

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    if let Err(err) = logging::init(&args.logging()) {
        eprintln!("could not initialize logging: {err}");
        return ExitCode::FAILURE;
    }
    logging::log_version();

    // ── 1. Validate configuration ────────────────────────────────
    let pipeline = match Pipeline::new(args.options()) {
        Ok(pipeline) => pipeline,
        Err(err) => {
            tracing::error!(error = %err, "invalid configuration, exiting");
            return ExitCode::FAILURE;
        }
    };

    // ── 2. Listen for SIGINT / SIGTERM ───────────────────────────
    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            tokio::select! {
                _ = shutdown_signal() => shutdown.cancel(),
                _ = shutdown.cancelled() => {}
            }
        }
    });

    // ── 3. Run until shutdown or a fatal scrape error ────────────
    match pipeline.run(shutdown).await {
        Ok(()) => {
            tracing::info!("shut down cleanly");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "exiting");
            ExitCode::FAILURE
        }
    }
}

/// Resolves on SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "could not install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "could not install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received SIGINT, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
