//! Runs a worker job.
//!
//! Two modes:
//! - command: `reshard-worker <Command> [args...]` starts the job, serves the
//!   control surface while it runs and exits non-zero if it failed
//! - interactive: no arguments, serves the control surface until SIGTERM/SIGINT

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use reshard_worker::commands::CommandRegistry;
use reshard_worker::config::WorkerConfig;
use reshard_worker::error::Error;
use reshard_worker::http::{control_routes, serve_until_finished};
use reshard_worker::logging;
use reshard_worker::signals;
use reshard_worker::worker::JobController;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let config = WorkerConfig::from_env()?;
    let log_guard = logging::init_logging(&config.log_dir, &config.log_file)?;

    let controller = Arc::new(JobController::new(&config));
    let registry = Arc::new(CommandRegistry::with_builtins(config.clone()));
    let shutdown = signals::install_signal_handlers(Arc::clone(&controller))
        .context("failed to install signal handlers")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.is_empty() {
        return Ok(run_command(&config, controller, registry, &args).await);
    }

    eprintln!("reshard-worker v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Control: http://0.0.0.0:{}/status", config.http_port);
    eprintln!("   Log file: {}", log_guard.path().display());
    eprintln!("   Commands:\n{}", registry.usage());

    let app = control_routes(Arc::clone(&controller), registry);
    let listener = TcpListener::bind(("0.0.0.0", config.http_port))
        .await
        .with_context(|| format!("failed to bind control port {}", config.http_port))?;
    tracing::info!(port = config.http_port, "Control surface started");

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
        .await
        .context("control surface failed")?;

    // The signal already asked the job to stop; let it wind down.
    if let Some(handle) = controller.wait_for_current() {
        let run_id = handle.run_id();
        if !handle.is_finished() {
            tracing::info!(run_id = %run_id, "Waiting for running worker to stop");
        }
        match handle.wait().await {
            Ok(()) => tracing::info!(run_id = %run_id, "Last worker finished"),
            Err(e) => tracing::warn!(run_id = %run_id, error = %e, "Last worker ended with error"),
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Command mode: start the job and serve the control surface until it
/// finishes.
async fn run_command(
    config: &WorkerConfig,
    controller: Arc<JobController>,
    registry: Arc<CommandRegistry>,
    args: &[String],
) -> ExitCode {
    let handle = match registry.launch(&controller, args) {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!("{e}");
            if matches!(e, Error::Command(_)) {
                eprintln!("Commands:\n{}", registry.usage());
            }
            return ExitCode::FAILURE;
        }
    };

    // A taken port leaves the run without a status page, nothing more.
    let server = match TcpListener::bind(("0.0.0.0", config.http_port)).await {
        Ok(listener) => {
            tracing::info!(port = config.http_port, "Control surface started");
            let app = control_routes(Arc::clone(&controller), registry);
            Some(tokio::spawn(serve_until_finished(listener, app, handle.clone())))
        }
        Err(e) => {
            tracing::warn!(port = config.http_port, error = %e, "Control surface unavailable");
            None
        }
    };

    let outcome = handle.wait().await.map_err(Error::from);

    if let Some(server) = server {
        match server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "Control surface failed"),
            Err(e) => tracing::warn!(error = %e, "Control surface task failed"),
        }
    }

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Worker returned error: {e}");
            ExitCode::FAILURE
        }
    }
}
