//! Command registry: turns `[name, args...]` into a job.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::WorkerConfig;
use crate::error::CommandError;
use crate::jobs::{FailJob, SleepJob};
use crate::worker::{CompletionHandle, JobController, WorkerJob};

/// Builds a job from its command-line arguments.
pub type JobFactory =
    fn(args: &[String], config: &WorkerConfig) -> Result<Arc<dyn WorkerJob>, CommandError>;

struct Command {
    help: &'static str,
    factory: JobFactory,
}

/// Registry of commands that can be started on the controller.
pub struct CommandRegistry {
    commands: BTreeMap<String, Command>,
    config: WorkerConfig,
}

impl CommandRegistry {
    /// Create an empty registry. Factories receive `config`.
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            commands: BTreeMap::new(),
            config,
        }
    }

    /// Create a registry holding the built-in `Sleep` and `Fail` commands.
    pub fn with_builtins(config: WorkerConfig) -> Self {
        let mut registry = Self::new(config);
        registry.register("Sleep", "<duration_ms>  wait, honoring cancellation", |args, _| {
            Ok(Arc::new(SleepJob::from_args(args)?))
        });
        registry.register("Fail", "<message...>  fail immediately with message", |args, _| {
            Ok(Arc::new(FailJob::from_args(args)?))
        });
        registry
    }

    /// Register a command, replacing any previous one with the same name.
    pub fn register(&mut self, name: &str, help: &'static str, factory: JobFactory) {
        if self
            .commands
            .insert(name.to_string(), Command { help, factory })
            .is_some()
        {
            tracing::warn!(command = %name, "Replaced existing command registration");
        }
    }

    /// Build the job for `name` with `args`.
    pub fn build(&self, name: &str, args: &[String]) -> Result<Arc<dyn WorkerJob>, CommandError> {
        let command = self
            .commands
            .get(name)
            .ok_or_else(|| CommandError::Unknown {
                name: name.to_string(),
            })?;
        (command.factory)(args, &self.config)
    }

    /// Parse a full command line: the first element names the command.
    pub fn parse(&self, args: &[String]) -> Result<Arc<dyn WorkerJob>, CommandError> {
        let (name, rest) = args.split_first().ok_or(CommandError::Empty)?;
        self.build(name, rest)
    }

    /// Parse a full command line and start the job on `controller`.
    ///
    /// Unknown commands and bad arguments come back as
    /// [`Error::Command`](crate::error::Error::Command), an occupied slot as
    /// [`Error::Controller`](crate::error::Error::Controller).
    pub fn launch(
        &self,
        controller: &JobController,
        args: &[String],
    ) -> crate::error::Result<CompletionHandle> {
        let job = self.parse(args)?;
        Ok(controller.start(job)?)
    }

    /// Registered command names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.commands.keys().cloned().collect()
    }

    /// One `name help` line per command.
    pub fn usage(&self) -> String {
        self.commands
            .iter()
            .map(|(name, command)| format!("  {name} {}\n", command.help))
            .collect()
    }
}
