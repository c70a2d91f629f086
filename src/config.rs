//! Configuration types.

use crate::error::ConfigError;

/// Default port of the interactive control surface.
pub const DEFAULT_HTTP_PORT: u16 = 15032;

/// Default number of events kept by a run's memory log.
pub const DEFAULT_MEMORY_LOG_CAPACITY: usize = 10_000;

/// Worker process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Port the interactive control surface listens on.
    pub http_port: u16,
    /// Directory for the durable log file.
    pub log_dir: String,
    /// Durable log file name.
    pub log_file: String,
    /// Maximum events retained in memory per run (0 = unbounded).
    pub memory_log_capacity: usize,
    /// Cell to pick servers from. Passed through to jobs.
    pub cell: Option<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            log_dir: "logs".to_string(),
            log_file: "reshard-worker.log".to_string(),
            memory_log_capacity: DEFAULT_MEMORY_LOG_CAPACITY,
            cell: None,
        }
    }
}

impl WorkerConfig {
    /// Load configuration from `RESHARD_WORKER_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let http_port = parse_or(&lookup, "RESHARD_WORKER_HTTP_PORT", defaults.http_port)?;
        let memory_log_capacity = parse_or(
            &lookup,
            "RESHARD_WORKER_MEMORY_LOG_CAPACITY",
            defaults.memory_log_capacity,
        )?;

        let log_dir = lookup("RESHARD_WORKER_LOG_DIR").unwrap_or(defaults.log_dir);
        let log_file = lookup("RESHARD_WORKER_LOG_FILE").unwrap_or(defaults.log_file);
        let cell = lookup("RESHARD_WORKER_CELL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            http_port,
            log_dir,
            log_file,
            memory_log_capacity,
            cell,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{raw:?}: {e}"),
        }),
    }
}
