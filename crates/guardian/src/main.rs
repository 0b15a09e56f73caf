//! The Guardian daemon: a single long-running process driving the
//! `TickScheduler` (§4.8) until it receives a shutdown signal.
//!
//! Exit code 0 only on clean shutdown (`SIGINT`/`SIGTERM`); nonzero on
//! unrecoverable init failure, per §6's "Process surface".

use std::process::ExitCode;

use guardian::{build_scheduler, env_config, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let config = match env_config() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "failed to load process configuration");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(docstore_url = %config.docstore_url, metrics_url = %config.metrics_url, "starting guardian control loop");
    let scheduler = build_scheduler(&config);

    tokio::select! {
        result = scheduler.run_forever() => {
            match result {
                Ok(()) => ExitCode::SUCCESS,
                Err(err) => {
                    tracing::error!(error = %err, "control loop exited with an unrecoverable error");
                    ExitCode::FAILURE
                }
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, exiting");
            ExitCode::SUCCESS
        }
    }
}

/// Resolves once either `SIGINT` or (on unix) `SIGTERM` arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
