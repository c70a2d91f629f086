//! End-to-end controller behavior: admission, completion, cancellation and
//! reset, driven through the public `JobController` API.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Barrier;
use tokio::time::timeout;

use reshard_worker::error::{ControllerError, JobError};
use reshard_worker::worker::{JobContext, JobController, SlotState, SlotStatus, WorkerJob};

/// Maximum time any wait is allowed before we consider the test hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Sleeps, then returns `Ok`. Ignores cancellation.
struct Sleepy {
    name: &'static str,
    delay: Duration,
}

#[async_trait]
impl WorkerJob for Sleepy {
    fn describe(&self) -> String {
        self.name.to_string()
    }

    async fn run(&self, ctx: JobContext) -> Result<(), JobError> {
        ctx.logger().info("sleeping");
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

/// Blocks until cancelled, then returns `Cancelled`.
struct UntilCancelled {
    runs: Arc<AtomicUsize>,
}

impl UntilCancelled {
    fn new() -> Self {
        Self {
            runs: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl WorkerJob for UntilCancelled {
    fn describe(&self) -> String {
        "UntilCancelled".to_string()
    }

    async fn run(&self, ctx: JobContext) -> Result<(), JobError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        ctx.logger().info("waiting for cancellation");
        ctx.cancelled().await;
        ctx.logger().warning("cancelled, stopping");
        Err(JobError::Cancelled)
    }
}

fn sleepy(name: &'static str, ms: u64) -> Arc<dyn WorkerJob> {
    Arc::new(Sleepy {
        name,
        delay: Duration::from_millis(ms),
    })
}

fn assert_coupled(status: &SlotStatus) {
    assert_eq!(status.cancellable, status.state == SlotState::Running);
    if status.last_error.is_some() {
        assert_eq!(status.state, SlotState::Completed);
    }
}

#[tokio::test]
async fn second_start_rejected_until_first_completes() {
    let controller = JobController::with_memory_log_capacity(0);

    let handle_a = controller.start(sleepy("A", 100)).unwrap();
    let err = controller.start(sleepy("B", 0)).err().unwrap();
    assert_eq!(err, ControllerError::AlreadyRunning { job: "A".into() });

    let outcome = timeout(TEST_TIMEOUT, handle_a.wait()).await.unwrap();
    assert!(outcome.is_ok());

    let status = controller.status();
    assert_eq!(status.state, SlotState::Completed);
    assert!(status.last_error.is_none());
    assert_eq!(status.job.as_deref(), Some("A"));

    let handle_b = controller.start(sleepy("B", 0)).unwrap();
    timeout(TEST_TIMEOUT, handle_b.wait()).await.unwrap().unwrap();
    assert_eq!(controller.status().job.as_deref(), Some("B"));
}

#[tokio::test]
async fn cancel_stops_cooperative_job() {
    let controller = JobController::with_memory_log_capacity(0);
    let handle = controller.start(Arc::new(UntilCancelled::new())).unwrap();

    // Wait until the job is actually parked on its token.
    timeout(TEST_TIMEOUT, async {
        while controller.status().log.is_empty() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    assert!(controller.cancel());
    let outcome = timeout(TEST_TIMEOUT, handle.wait()).await.unwrap();
    assert_eq!(outcome, Err(JobError::Cancelled));

    let status = controller.status();
    assert_eq!(status.state, SlotState::Completed);
    assert!(status.last_error.as_ref().unwrap().is_cancelled());
    assert!(!status.cancellable);
    let messages: Vec<_> = status.log.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["waiting for cancellation", "cancelled, stopping"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_starts_admit_exactly_one() {
    const CALLERS: usize = 16;

    let controller = Arc::new(JobController::with_memory_log_capacity(0));
    let job = UntilCancelled::new();
    let runs = Arc::clone(&job.runs);
    let job: Arc<dyn WorkerJob> = Arc::new(job);
    let barrier = Arc::new(Barrier::new(CALLERS));

    let mut tasks = Vec::new();
    for _ in 0..CALLERS {
        let controller = Arc::clone(&controller);
        let job = Arc::clone(&job);
        let barrier = Arc::clone(&barrier);
        tasks.push(tokio::spawn(async move {
            barrier.wait().await;
            controller.start(job).ok()
        }));
    }

    let mut handles = Vec::new();
    for task in tasks {
        if let Some(handle) = task.await.unwrap() {
            handles.push(handle);
        }
    }
    assert_eq!(handles.len(), 1);
    assert_eq!(controller.status().state, SlotState::Running);

    controller.cancel();
    let outcome = timeout(TEST_TIMEOUT, handles.pop().unwrap().wait())
        .await
        .unwrap();
    assert_eq!(outcome, Err(JobError::Cancelled));
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn state_and_fields_stay_coupled() {
    let controller = JobController::with_memory_log_capacity(0);
    assert_coupled(&controller.status());

    let handle = controller.start(Arc::new(UntilCancelled::new())).unwrap();
    let running = controller.status();
    assert_eq!(running.state, SlotState::Running);
    assert_coupled(&running);

    controller.cancel();
    let requested = controller.status();
    assert_coupled(&requested);

    timeout(TEST_TIMEOUT, handle.wait()).await.unwrap().unwrap_err();
    assert_coupled(&controller.status());

    controller.reset().unwrap();
    assert_coupled(&controller.status());
}

#[tokio::test]
async fn completed_status_is_stable() {
    let controller = JobController::with_memory_log_capacity(0);
    let handle = controller.start(sleepy("A", 0)).unwrap();
    timeout(TEST_TIMEOUT, handle.wait()).await.unwrap().unwrap();

    let first = controller.status();
    for _ in 0..10 {
        let again = controller.status();
        assert_eq!(again.state, SlotState::Completed);
        assert_eq!(again.last_error, first.last_error);
        assert_eq!(again.run_id, first.run_id);
        assert_eq!(again.finished_at, first.finished_at);
    }
}

#[tokio::test]
async fn cancel_is_idempotent_and_never_rewrites_outcome() {
    let controller = JobController::with_memory_log_capacity(0);

    // Nothing running.
    assert!(!controller.cancel());
    assert!(!controller.cancel());

    // A job that finishes on its own keeps its own outcome.
    let handle = controller.start(sleepy("A", 0)).unwrap();
    timeout(TEST_TIMEOUT, handle.wait()).await.unwrap().unwrap();
    for _ in 0..3 {
        assert!(!controller.cancel());
    }
    assert!(controller.status().last_error.is_none());
}

#[tokio::test]
async fn cancel_does_not_force_a_non_cooperating_job() {
    let controller = JobController::with_memory_log_capacity(0);
    let handle = controller.start(sleepy("Stubborn", 150)).unwrap();

    assert!(controller.cancel());
    assert!(controller.cancel());
    let status = controller.status();
    assert_eq!(status.state, SlotState::Running);
    assert!(status.cancel_requested);

    // The job ignored the token and succeeded; that is what gets recorded.
    let outcome = timeout(TEST_TIMEOUT, handle.wait()).await.unwrap();
    assert!(outcome.is_ok());
    assert!(controller.status().last_error.is_none());
}

#[tokio::test]
async fn reset_clears_completed_run() {
    let controller = JobController::with_memory_log_capacity(0);
    let handle = controller.start(Arc::new(UntilCancelled::new())).unwrap();
    controller.cancel();
    timeout(TEST_TIMEOUT, handle.wait()).await.unwrap().unwrap_err();

    controller.reset().unwrap();
    let status = controller.status();
    assert_eq!(status.state, SlotState::Idle);
    assert!(status.last_error.is_none());
    assert!(status.job.is_none());
    assert!(status.log.is_empty());
}

#[tokio::test]
async fn reset_while_running_leaves_job_untouched() {
    let controller = JobController::with_memory_log_capacity(0);
    let handle = controller.start(Arc::new(UntilCancelled::new())).unwrap();

    let err = controller.reset().unwrap_err();
    assert_eq!(
        err,
        ControllerError::JobInProgress {
            job: "UntilCancelled".into()
        }
    );
    let status = controller.status();
    assert_eq!(status.state, SlotState::Running);
    assert!(!status.cancel_requested);

    controller.cancel();
    timeout(TEST_TIMEOUT, handle.wait()).await.unwrap().unwrap_err();
}

#[tokio::test]
async fn controllers_are_independent() {
    let first = JobController::with_memory_log_capacity(0);
    let second = JobController::with_memory_log_capacity(0);

    let handle = first.start(Arc::new(UntilCancelled::new())).unwrap();
    let other = second.start(sleepy("B", 0)).unwrap();
    timeout(TEST_TIMEOUT, other.wait()).await.unwrap().unwrap();

    assert!(!second.cancel());
    assert_eq!(first.status().state, SlotState::Running);

    first.cancel();
    timeout(TEST_TIMEOUT, handle.wait()).await.unwrap().unwrap_err();
}
