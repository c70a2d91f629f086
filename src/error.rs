//! Error types for the reshard worker.

/// Top-level error type for the worker process.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Controller error: {0}")]
    Controller(#[from] ControllerError),

    #[error("Job error: {0}")]
    Job(#[from] JobError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejections returned synchronously by the job controller.
///
/// These are never logged by the controller itself; the caller decides.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControllerError {
    #[error("A worker is already in progress: {job}")]
    AlreadyRunning { job: String },

    #[error("Cannot reset while worker {job} is still running")]
    JobInProgress { job: String },
}

/// Terminal error of a job run, stored verbatim as the slot's last error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    #[error("Job was cancelled")]
    Cancelled,

    #[error("Job failed: {reason}")]
    Failed { reason: String },

    #[error("Job panicked: {reason}")]
    Panicked { reason: String },

    #[error("Job driver exited without reporting a result")]
    Abandoned,
}

impl JobError {
    /// Shorthand for a plain failure.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Whether the job stopped because it observed cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Errors from turning command-line style arguments into a job.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("No command given")]
    Empty,

    #[error("Unknown command: {name}")]
    Unknown { name: String },

    #[error("Invalid arguments for {name}: {reason}")]
    InvalidArgs { name: String, reason: String },
}

/// Result type alias for the worker.
pub type Result<T> = std::result::Result<T, Error>;
