//! Process logging: stdout plus a durable log file.
//!
//! Controlled by `RUST_LOG` (defaults to `info`). Job records forwarded by
//! `logutil::ConsoleLogger` end up here under the `reshard_worker::job`
//! target.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::{NonBlocking, NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::ConfigError;

/// Keeps the non-blocking file writer alive. Dropping it flushes the file.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
    path: PathBuf,
}

impl LoggingGuard {
    /// Path of the durable log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Create `log_dir` if needed and make sure `log_file` exists.
///
/// The file is appended to, never truncated: it is the operational record
/// across restarts.
pub fn prepare_log_file(log_dir: &str, log_file: &str) -> Result<PathBuf, io::Error> {
    fs::create_dir_all(log_dir)?;
    let path = Path::new(log_dir).join(log_file);
    OpenOptions::new().create(true).append(true).open(&path)?;
    Ok(path)
}

/// Background writer appending to `log_dir/log_file`.
///
/// Writers block rather than drop lines when the background thread falls
/// behind.
pub fn file_writer(log_dir: &str, log_file: &str) -> (NonBlocking, WorkerGuard) {
    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    NonBlockingBuilder::default()
        .lossy(false)
        .finish(file_appender)
}

/// Install the global subscriber with a stdout layer and a file layer.
pub fn init_logging(log_dir: &str, log_file: &str) -> Result<LoggingGuard, ConfigError> {
    let path = prepare_log_file(log_dir, log_file)?;
    let (non_blocking_file, file_guard) = file_writer(log_dir, log_file);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_target(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .map_err(|e| ConfigError::InvalidValue {
            key: "tracing subscriber".to_string(),
            message: e.to_string(),
        })?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
        path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_directory_and_file() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested/logs");
        let dir = dir.to_str().unwrap();

        let path = prepare_log_file(dir, "worker.log").unwrap();
        assert!(path.exists());
        assert!(path.ends_with("worker.log"));
    }

    #[test]
    fn keeps_existing_contents() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_str().unwrap();
        fs::write(tmp.path().join("worker.log"), "previous run\n").unwrap();

        let path = prepare_log_file(dir, "worker.log").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "previous run\n");
    }

    #[test]
    fn file_writer_keeps_every_line_under_burst() {
        use std::io::Write;
        use std::time::{Duration, Instant};

        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_str().unwrap();
        let path = prepare_log_file(dir, "worker.log").unwrap();

        // Well past the background channel's buffered line limit.
        let lines = 200_000;
        let (mut writer, _guard) = file_writer(dir, "worker.log");
        for i in 0..lines {
            writer.write_all(format!("batch {i}\n").as_bytes()).unwrap();
        }

        let deadline = Instant::now() + Duration::from_secs(10);
        let mut written = 0;
        while Instant::now() < deadline {
            written = fs::read_to_string(&path).unwrap().lines().count();
            if written == lines {
                break;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        assert_eq!(written, lines);
    }
}
