//! Single-flight job controller.
//!
//! Admits at most one job at a time, runs it on its own task, and exposes
//! status, cancellation and reset to the command line, the control surface
//! and the signal bridge alike.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use crate::config::WorkerConfig;
use crate::error::{ControllerError, JobError};
use crate::worker::context::{JobContext, WorkerJob};
use crate::worker::slot::{
    Admission, CompletionHandle, ExecutionSlot, RunOutcome, RunTicket, SlotStatus,
};

/// Admission, status, cancel and reset for the process's single job slot.
pub struct JobController {
    slot: ExecutionSlot,
}

impl JobController {
    /// Create an idle controller configured from `config`.
    pub fn new(config: &WorkerConfig) -> Self {
        Self::with_memory_log_capacity(config.memory_log_capacity)
    }

    pub fn with_memory_log_capacity(capacity: usize) -> Self {
        Self {
            slot: ExecutionSlot::new(capacity),
        }
    }

    /// Admit `job` and start it on a new Tokio task.
    ///
    /// Returns immediately. The handle may be dropped (fire-and-forget) or
    /// awaited for the run's outcome. Must be called within a Tokio runtime.
    pub fn start(&self, job: Arc<dyn WorkerJob>) -> Result<CompletionHandle, ControllerError> {
        let Admission {
            context,
            handle,
            ticket,
        } = self.slot.try_admit(Arc::clone(&job))?;

        tokio::spawn(drive(job, context, ticket));
        Ok(handle)
    }

    pub fn status(&self) -> SlotStatus {
        self.slot.status()
    }

    /// Request cooperative cancellation of the running job, if any.
    pub fn cancel(&self) -> bool {
        let signalled = self.slot.cancel_current();
        if signalled {
            tracing::info!("Cancellation requested for running worker");
        }
        signalled
    }

    pub fn reset(&self) -> Result<(), ControllerError> {
        self.slot.reset()
    }

    /// Memory log of the running or most recent run, one record per line.
    /// Empty when idle.
    pub fn render_log(&self) -> String {
        self.slot
            .memory_log()
            .map(|memory| memory.render())
            .unwrap_or_default()
    }

    /// Completion handle of the running or most recent run.
    pub fn wait_for_current(&self) -> Option<CompletionHandle> {
        self.slot.completion()
    }
}

/// Run the job outside the slot lock, then complete the ticket.
async fn drive(job: Arc<dyn WorkerJob>, ctx: JobContext, ticket: RunTicket) {
    let run_id = ctx.run_id();
    let description = job.describe();
    tracing::info!(run_id = %run_id, job = %description, "Starting worker...");

    let outcome: RunOutcome = match AssertUnwindSafe(job.run(ctx)).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(JobError::Panicked {
            reason: panic_message(panic.as_ref()),
        }),
    };

    match &outcome {
        Ok(()) => tracing::info!(run_id = %run_id, job = %description, "Worker finished"),
        Err(e) if e.is_cancelled() => {
            tracing::warn!(run_id = %run_id, job = %description, "Worker cancelled")
        }
        Err(e) => tracing::error!(run_id = %run_id, job = %description, error = %e, "Worker failed"),
    }

    ticket.finish(outcome);
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
