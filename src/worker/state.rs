//! Execution slot state machine.

use serde::{Deserialize, Serialize};

/// State of the execution slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    /// No job ever ran, or the slot was reset.
    #[default]
    Idle,
    /// A job is running.
    Running,
    /// A job ran and returned; its error (if any) is kept for inspection.
    Completed,
}

impl SlotState {
    /// Check if this state allows transitioning to another state.
    pub fn can_transition_to(&self, target: SlotState) -> bool {
        use SlotState::*;

        matches!(
            (self, target),
            // Admission
            (Idle, Running) | (Completed, Running) |
            // Job returned
            (Running, Completed) |
            // Reset
            (Idle, Idle) | (Completed, Idle)
        )
    }

    /// Whether a new job may be admitted.
    pub fn accepts_jobs(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl std::fmt::Display for SlotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}
