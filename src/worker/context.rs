//! The job abstraction and the context a job runs with.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::JobError;
use crate::logutil::Logger;

/// A long-running, cluster-mutating unit of work.
///
/// Implementations must honor cancellation: check [`JobContext`] at safe
/// points and return [`JobError::Cancelled`] promptly once it fires. The
/// controller has no other way to stop a job.
#[async_trait]
pub trait WorkerJob: Send + Sync {
    /// Human-readable description, shown in status and admission errors.
    fn describe(&self) -> String;

    async fn run(&self, ctx: JobContext) -> Result<(), JobError>;
}

/// Cancellation token and logger for a single run.
#[derive(Clone)]
pub struct JobContext {
    run_id: Uuid,
    cancel: CancellationToken,
    logger: Arc<dyn Logger>,
}

impl JobContext {
    pub fn new(run_id: Uuid, cancel: CancellationToken, logger: Arc<dyn Logger>) -> Self {
        Self {
            run_id,
            cancel,
            logger,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn logger(&self) -> &dyn Logger {
        self.logger.as_ref()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once cancellation is requested.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// `Err(JobError::Cancelled)` if cancellation was requested.
    pub fn check_cancelled(&self) -> Result<(), JobError> {
        if self.cancel.is_cancelled() {
            Err(JobError::Cancelled)
        } else {
            Ok(())
        }
    }
}
