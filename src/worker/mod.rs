//! Single-flight job execution.
//!
//! Core components:
//! - `context`: the `WorkerJob` trait and the per-run `JobContext`
//! - `state`: slot state machine (Idle → Running → Completed, reset → Idle)
//! - `slot`: lock-guarded execution slot, run tickets, completion handles
//! - `controller`: `JobController`, the public start/status/cancel/reset API

pub mod context;
pub mod controller;
pub mod slot;
pub mod state;

pub use context::{JobContext, WorkerJob};
pub use controller::JobController;
pub use slot::{CompletionHandle, RunOutcome, SlotStatus};
pub use state::SlotState;
