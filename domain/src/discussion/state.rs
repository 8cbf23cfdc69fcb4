//! Discussion session state machine.
//!
//! ```text
//! Created ──► Running ◄──► PausedForIntervention
//!    │          │                  │
//!    │          ├──► Completed ◄───┤
//!    └──────────┴──► Terminated ◄──┤
//!               └──► Failed ◄──────┘
//! ```

use serde::{Deserialize, Serialize};

/// Lifecycle state of a discussion session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Case and agents set, no round executed yet.
    Created,
    /// Collecting statements for the current round.
    Running,
    /// Waiting on the intervention gate.
    PausedForIntervention,
    /// Round budget exhausted without termination.
    Completed,
    /// Explicit termination by the user.
    Terminated,
    /// Unrecoverable error, e.g. no responsive agent for a whole round.
    Failed,
}

impl SessionState {
    /// Whether this is a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Terminated | SessionState::Failed
        )
    }

    /// Valid transitions from this state.
    pub fn valid_transitions(self) -> &'static [SessionState] {
        use SessionState::*;
        match self {
            Created => &[Running, Terminated, Failed],
            Running => &[PausedForIntervention, Completed, Terminated, Failed],
            PausedForIntervention => &[Running, Completed, Terminated, Failed],
            Completed | Terminated | Failed => &[],
        }
    }

    pub fn can_transition_to(self, to: SessionState) -> bool {
        self.valid_transitions().contains(&to)
    }

    /// Whether a consensus report may be produced in this state.
    pub fn allows_report(self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Terminated)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Created => "created",
            SessionState::Running => "running",
            SessionState::PausedForIntervention => "paused_for_intervention",
            SessionState::Completed => "completed",
            SessionState::Terminated => "terminated",
            SessionState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
