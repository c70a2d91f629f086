//! Built-in jobs for exercising the controller end to end.
//!
//! Resharding, verification and copy jobs implement `WorkerJob` in the
//! binaries that embed this crate; these are the operator smoke tests.

pub mod fail;
pub mod sleep;

pub use fail::FailJob;
pub use sleep::SleepJob;
