//! Action lifecycle states and transition validation.

use serde::{Deserialize, Serialize};

/// Lifecycle state of one action attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Defined but not yet submitted.
    Prep,
    /// Launcher submitted, not yet observed running.
    Submitted,
    /// Launcher observed running on the cluster.
    Running,
    /// Attempt completed successfully.
    Succeeded,
    /// Attempt ended in failure.
    Failed,
    /// Attempt was killed.
    Killed,
}

impl ActionStatus {
    /// Returns `true` when no further transitions are possible.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Killed)
    }

    /// Whether the lifecycle permits moving from `self` to `next`.
    ///
    /// Forward progress only, plus a kill from any non-terminal state.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Prep, Self::Submitted) => true,
            (Self::Submitted, Self::Running) => true,
            (Self::Submitted | Self::Running, Self::Succeeded | Self::Failed) => true,
            (current, Self::Killed) => !current.is_terminal(),
            _ => false,
        }
    }

    /// Parse an externally observed status string.
    #[must_use]
    pub fn from_external(status: &str) -> Option<Self> {
        match status {
            "SUBMITTED" => Some(Self::Submitted),
            "RUNNING" => Some(Self::Running),
            "SUCCEEDED" => Some(Self::Succeeded),
            "FAILED" => Some(Self::Failed),
            "KILLED" => Some(Self::Killed),
            _ => None,
        }
    }

    /// The external status string for this state.
    #[must_use]
    pub fn as_external(self) -> &'static str {
        match self {
            Self::Prep => "PREP",
            Self::Submitted => "SUBMITTED",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Killed => "KILLED",
        }
    }
}

impl std::fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_external())
    }
}
