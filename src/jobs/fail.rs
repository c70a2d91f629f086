//! `Fail`: returns an error immediately.

use async_trait::async_trait;

use crate::error::{CommandError, JobError};
use crate::worker::{JobContext, WorkerJob};

#[derive(Debug, Clone)]
pub struct FailJob {
    message: String,
}

impl FailJob {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Joins all arguments into the failure message.
    pub fn from_args(args: &[String]) -> Result<Self, CommandError> {
        if args.is_empty() {
            return Err(CommandError::InvalidArgs {
                name: "Fail".to_string(),
                reason: "expected a failure message".to_string(),
            });
        }
        Ok(Self::new(args.join(" ")))
    }
}

#[async_trait]
impl WorkerJob for FailJob {
    fn describe(&self) -> String {
        format!("Fail({})", self.message)
    }

    async fn run(&self, ctx: JobContext) -> Result<(), JobError> {
        ctx.logger().error(&self.message);
        Err(JobError::failed(self.message.clone()))
    }
}
