//! The execution slot: at most one job, its cancellation token and its
//! terminal error, all behind one lock.
//!
//! Every field is read and written under `SlotInner`'s mutex, and the lock
//! is only held for plain field updates, never across an `.await`. The
//! cancellation token is present exactly while the state is `Running`.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{ControllerError, JobError};
use crate::logutil::{ConsoleLogger, LogEvent, MemoryLogger, TeeLogger};
use crate::worker::context::{JobContext, WorkerJob};
use crate::worker::state::SlotState;

/// Outcome of one run, as delivered to completion waiters.
pub type RunOutcome = Result<(), JobError>;

#[derive(Default)]
struct SlotInner {
    state: SlotState,
    job: Option<Arc<dyn WorkerJob>>,
    /// Kept after completion for display, cleared on reset.
    description: Option<String>,
    run_id: Option<Uuid>,
    cancel: Option<CancellationToken>,
    last_error: Option<JobError>,
    memory_log: Option<Arc<MemoryLogger>>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    completion: Option<watch::Receiver<Option<RunOutcome>>>,
}

impl SlotInner {
    fn transition(&mut self, target: SlotState) {
        debug_assert!(
            self.state.can_transition_to(target),
            "invalid slot transition {} -> {}",
            self.state,
            target
        );
        self.state = target;
    }

    fn check_invariants(&self) {
        debug_assert_eq!(self.cancel.is_some(), self.state == SlotState::Running);
        debug_assert_eq!(self.job.is_some(), self.state == SlotState::Running);
        debug_assert!(self.last_error.is_none() || self.state == SlotState::Completed);
    }
}

/// Lock-protected holder of the single active job.
pub struct ExecutionSlot {
    inner: Arc<Mutex<SlotInner>>,
    memory_log_capacity: usize,
}

/// Everything the execution driver needs after a successful admission.
pub struct Admission {
    /// Context to pass to `WorkerJob::run`.
    pub context: JobContext,
    /// Completion signal for the caller.
    pub handle: CompletionHandle,
    /// The only way to complete this run.
    pub ticket: RunTicket,
}

/// Point-in-time copy of the slot.
#[derive(Debug, Clone)]
pub struct SlotStatus {
    pub state: SlotState,
    /// Description of the running, or most recently run, job.
    pub job: Option<String>,
    pub run_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Terminal error; only ever set when `state` is `Completed`.
    pub last_error: Option<JobError>,
    /// Whether a cancellation token is installed (exactly while `Running`).
    pub cancellable: bool,
    /// Whether cancellation was requested for the running job.
    pub cancel_requested: bool,
    /// Memory log of the most recent run.
    pub log: Vec<LogEvent>,
    /// Events evicted from the bounded memory log.
    pub log_evicted: u64,
}

impl ExecutionSlot {
    /// Create an idle slot. Each run's memory log keeps at most
    /// `memory_log_capacity` events (0 = unbounded).
    pub fn new(memory_log_capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SlotInner::default())),
            memory_log_capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotInner> {
        lock_inner(&self.inner)
    }

    /// Atomically check that nothing runs and install `job` as the running job.
    pub fn try_admit(&self, job: Arc<dyn WorkerJob>) -> Result<Admission, ControllerError> {
        let mut inner = self.lock();
        if !inner.state.accepts_jobs() {
            return Err(ControllerError::AlreadyRunning {
                job: inner.description.clone().unwrap_or_default(),
            });
        }

        let run_id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let memory_log = Arc::new(MemoryLogger::new(self.memory_log_capacity));
        // Durable sink first: it must see every record.
        let logger = Arc::new(TeeLogger::new(
            Arc::new(ConsoleLogger::for_run(run_id)),
            memory_log.clone(),
        ));
        let (tx, rx) = watch::channel(None);

        inner.transition(SlotState::Running);
        inner.description = Some(job.describe());
        inner.job = Some(job);
        inner.run_id = Some(run_id);
        inner.cancel = Some(cancel.clone());
        inner.last_error = None;
        inner.memory_log = Some(memory_log);
        inner.started_at = Some(Utc::now());
        inner.finished_at = None;
        inner.completion = Some(rx.clone());
        inner.check_invariants();

        Ok(Admission {
            context: JobContext::new(run_id, cancel, logger),
            handle: CompletionHandle { run_id, rx },
            ticket: RunTicket {
                slot: Arc::clone(&self.inner),
                run_id,
                tx: Some(tx),
            },
        })
    }

    /// Snapshot of the slot. Never waits on the job.
    ///
    /// The memory log is copied after the slot lock is released, so a large
    /// log never holds up admission, cancellation or completion.
    pub fn status(&self) -> SlotStatus {
        let inner = self.lock();
        let mut status = SlotStatus {
            state: inner.state,
            job: inner.description.clone(),
            run_id: inner.run_id,
            started_at: inner.started_at,
            finished_at: inner.finished_at,
            last_error: inner.last_error.clone(),
            cancellable: inner.cancel.is_some(),
            cancel_requested: inner.cancel.as_ref().is_some_and(|c| c.is_cancelled()),
            log: Vec::new(),
            log_evicted: 0,
        };
        let memory_log = inner.memory_log.clone();
        drop(inner);

        if let Some(memory) = memory_log {
            status.log = memory.events();
            status.log_evicted = memory.evicted();
        }
        status
    }

    /// Memory log of the running or most recent run.
    pub fn memory_log(&self) -> Option<Arc<MemoryLogger>> {
        self.lock().memory_log.clone()
    }

    /// Request cancellation of the running job. No-op when nothing runs.
    ///
    /// Returns whether a running job was signalled.
    pub fn cancel_current(&self) -> bool {
        let inner = self.lock();
        match &inner.cancel {
            Some(cancel) => {
                cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Return to the idle baseline. Rejected while a job runs.
    pub fn reset(&self) -> Result<(), ControllerError> {
        let mut inner = self.lock();
        if inner.state == SlotState::Running {
            return Err(ControllerError::JobInProgress {
                job: inner.description.clone().unwrap_or_default(),
            });
        }
        inner.transition(SlotState::Idle);
        *inner = SlotInner::default();
        inner.check_invariants();
        Ok(())
    }

    /// Completion handle of the running or most recent run, if any.
    pub fn completion(&self) -> Option<CompletionHandle> {
        let inner = self.lock();
        let run_id = inner.run_id?;
        let rx = inner.completion.clone()?;
        Some(CompletionHandle { run_id, rx })
    }
}

fn lock_inner(inner: &Mutex<SlotInner>) -> MutexGuard<'_, SlotInner> {
    // Field updates are single assignments; a poisoned guard is still consistent.
    inner.lock().unwrap_or_else(|e| e.into_inner())
}

/// Capability to complete exactly one run.
///
/// Consumed by [`RunTicket::finish`]. Dropping an unfinished ticket completes
/// the run with [`JobError::Abandoned`].
pub struct RunTicket {
    slot: Arc<Mutex<SlotInner>>,
    run_id: Uuid,
    tx: Option<watch::Sender<Option<RunOutcome>>>,
}

impl RunTicket {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Move the slot to `Completed` with `outcome` and wake all waiters.
    pub fn finish(mut self, outcome: RunOutcome) {
        self.complete(outcome);
    }

    fn complete(&mut self, outcome: RunOutcome) {
        let Some(tx) = self.tx.take() else {
            return;
        };

        let mut inner = lock_inner(&self.slot);
        debug_assert_eq!(inner.run_id, Some(self.run_id));
        inner.transition(SlotState::Completed);
        inner.job = None;
        inner.cancel = None;
        inner.last_error = outcome.as_ref().err().cloned();
        inner.finished_at = Some(Utc::now());
        inner.check_invariants();
        tx.send_replace(Some(outcome));
    }
}

impl Drop for RunTicket {
    fn drop(&mut self) {
        if self.tx.is_some() {
            tracing::warn!(run_id = %self.run_id, "Run ticket dropped without a result");
            self.complete(Err(JobError::Abandoned));
        }
    }
}

/// One-shot, multi-waiter signal satisfied when a run finishes.
#[derive(Clone)]
pub struct CompletionHandle {
    run_id: Uuid,
    rx: watch::Receiver<Option<RunOutcome>>,
}

impl CompletionHandle {
    /// Run this handle completes for.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Wait for the run to finish and return its outcome.
    pub async fn wait(mut self) -> RunOutcome {
        // The sender only disappears without a value if the ticket leaked.
        let outcome = match self.rx.wait_for(Option::is_some).await {
            Ok(outcome) => (*outcome).clone(),
            Err(_) => None,
        };
        outcome.unwrap_or(Err(JobError::Abandoned))
    }

    pub fn is_finished(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// The outcome, if the run already finished.
    pub fn outcome(&self) -> Option<RunOutcome> {
        (*self.rx.borrow()).clone()
    }
}
