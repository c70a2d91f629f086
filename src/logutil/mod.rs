//! Per-run job logging.
//!
//! Jobs log through a [`Logger`] handed to them in their context. For each
//! admitted run the controller builds a [`TeeLogger`] over:
//! - `MemoryLogger`: bounded in-process buffer, shown by status queries
//! - `ConsoleLogger`: forwards to `tracing`, i.e. stdout and the log file

pub mod console;
pub mod memory;
pub mod tee;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use console::ConsoleLogger;
pub use memory::MemoryLogger;
pub use tee::TeeLogger;

/// Severity of a job log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    /// Raw output meant to be shown as-is (progress tables, summaries).
    Console,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Console => "console",
        };
        write!(f, "{s}")
    }
}

/// A single job log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub level: LogLevel,
    pub time: DateTime<Utc>,
    pub message: String,
}

impl LogEvent {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            time: Utc::now(),
            message: message.into(),
        }
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            LogLevel::Console => write!(f, "{}", self.message),
            level => write!(
                f,
                "{} {} {}",
                self.time.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
                level,
                self.message
            ),
        }
    }
}

/// Sink for job log records.
///
/// Implementations must not block for long: jobs call this from their hot
/// paths and the memory sink is read concurrently by status queries.
/// `log` must not panic; a panicking sink would take the job down with it
/// and starve any sink behind it in a [`TeeLogger`].
pub trait Logger: Send + Sync {
    fn log(&self, event: LogEvent);

    fn info(&self, message: &str) {
        self.log(LogEvent::new(LogLevel::Info, message));
    }

    fn warning(&self, message: &str) {
        self.log(LogEvent::new(LogLevel::Warning, message));
    }

    fn error(&self, message: &str) {
        self.log(LogEvent::new(LogLevel::Error, message));
    }

    fn console(&self, message: &str) {
        self.log(LogEvent::new(LogLevel::Console, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_events_print_raw() {
        let event = LogEvent::new(LogLevel::Console, "rows copied: 42");
        assert_eq!(event.to_string(), "rows copied: 42");
    }

    #[test]
    fn leveled_events_carry_level() {
        let event = LogEvent::new(LogLevel::Warning, "tablet lagging");
        let rendered = event.to_string();
        assert!(rendered.contains(" warning tablet lagging"));
    }

    #[test]
    fn level_serializes_snake_case() {
        let json = serde_json::to_string(&LogLevel::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
    }
}
