//! `Sleep`: waits for a duration, reporting progress, until cancelled.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{CommandError, JobError};
use crate::worker::{JobContext, WorkerJob};

/// Number of progress lines logged over the sleep.
const PROGRESS_STEPS: u32 = 10;

#[derive(Debug, Clone)]
pub struct SleepJob {
    duration: Duration,
}

impl SleepJob {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    /// Parse `<duration_ms>`.
    pub fn from_args(args: &[String]) -> Result<Self, CommandError> {
        let invalid = |reason: String| CommandError::InvalidArgs {
            name: "Sleep".to_string(),
            reason,
        };
        match args {
            [ms] => ms
                .parse::<u64>()
                .map(|ms| Self::new(Duration::from_millis(ms)))
                .map_err(|e| invalid(format!("duration_ms {ms:?}: {e}"))),
            _ => Err(invalid(format!(
                "expected exactly one argument <duration_ms>, got {}",
                args.len()
            ))),
        }
    }
}

#[async_trait]
impl WorkerJob for SleepJob {
    fn describe(&self) -> String {
        format!("Sleep({}ms)", self.duration.as_millis())
    }

    async fn run(&self, ctx: JobContext) -> Result<(), JobError> {
        let step = self.duration / PROGRESS_STEPS;
        ctx.logger()
            .info(&format!("Sleeping for {}ms", self.duration.as_millis()));

        for i in 1..=PROGRESS_STEPS {
            tokio::select! {
                _ = ctx.cancelled() => {
                    ctx.logger().warning("Sleep interrupted by cancellation");
                    return Err(JobError::Cancelled);
                }
                _ = tokio::time::sleep(step) => {}
            }
            ctx.logger()
                .console(&format!("progress {}%", i * 100 / PROGRESS_STEPS));
        }

        ctx.logger().info("Sleep done");
        Ok(())
    }
}
