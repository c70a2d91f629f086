//! Turns SIGTERM / SIGINT into job cancellation.

use std::io;
use std::sync::Arc;

use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;

use crate::worker::JobController;

/// Listen for SIGTERM and SIGINT for the rest of the process.
///
/// Every delivered signal cancels the running job, if any. The first one also
/// cancels the returned shutdown token so the entry point can wind down. The
/// listener never waits on the job and never escalates to a forced stop.
pub fn install_signal_handlers(controller: Arc<JobController>) -> io::Result<CancellationToken> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let shutdown = CancellationToken::new();
    let shutdown_clone = shutdown.clone();

    tokio::spawn(async move {
        loop {
            let name = tokio::select! {
                received = sigterm.recv() => match received {
                    Some(()) => "SIGTERM",
                    None => break,
                },
                received = sigint.recv() => match received {
                    Some(()) => "SIGINT",
                    None => break,
                },
            };

            let cancelled = controller.cancel();
            tracing::info!(signal = name, cancelled_job = cancelled, "Received termination signal");
            shutdown_clone.cancel();
        }
    });

    Ok(shutdown)
}
