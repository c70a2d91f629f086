//! Durable job log sink backed by `tracing`.

use uuid::Uuid;

use super::{LogEvent, LogLevel, Logger};

/// Forwards job log records to the process `tracing` subscriber, which
/// writes them to stdout and the log file.
#[derive(Debug, Clone, Default)]
pub struct ConsoleLogger {
    run_id: Option<Uuid>,
}

impl ConsoleLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag every forwarded record with the run it belongs to.
    pub fn for_run(run_id: Uuid) -> Self {
        Self {
            run_id: Some(run_id),
        }
    }
}

impl Logger for ConsoleLogger {
    fn log(&self, event: LogEvent) {
        let run_id = self.run_id.map(|id| id.to_string()).unwrap_or_default();
        let message = event.message.as_str();
        match event.level {
            LogLevel::Info | LogLevel::Console => {
                tracing::info!(target: "reshard_worker::job", run_id = %run_id, "{message}")
            }
            LogLevel::Warning => {
                tracing::warn!(target: "reshard_worker::job", run_id = %run_id, "{message}")
            }
            LogLevel::Error => {
                tracing::error!(target: "reshard_worker::job", run_id = %run_id, "{message}")
            }
        }
    }
}
