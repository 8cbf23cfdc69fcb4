//! Domain error types

use crate::agent::AgentId;
use crate::discussion::state::SessionState;
use thiserror::Error;

/// Rejected attempts to move or mutate a session outside its state machine.
///
/// A rejected operation never changes the session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionStateError {
    #[error("invalid transition {from} -> {to}")]
    InvalidTransition { from: SessionState, to: SessionState },

    #[error("session is {state} and no longer accepts {operation}")]
    Terminal {
        state: SessionState,
        operation: &'static str,
    },

    #[error("session is {state}; {operation} requires a running session")]
    NotRunning {
        state: SessionState,
        operation: &'static str,
    },

    #[error("round limit of {max} reached")]
    RoundLimitReached { max: u32 },

    #[error("no round has been started")]
    RoundNotStarted,

    #[error("round index mismatch: session is at round {current}, event targets round {requested}")]
    RoundMismatch { current: u32, requested: u32 },

    #[error("statement sequence {found} does not follow {expected} in round {round}")]
    SequenceMismatch {
        round: u32,
        expected: u32,
        found: u32,
    },

    #[error("a consensus report is already attached")]
    ReportAlreadyAttached,

    #[error("a consensus report cannot be attached while the session is {state}")]
    ReportNotAllowed { state: SessionState },
}

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid case record: {0}")]
    InvalidCase(String),

    #[error("No agents configured for the discussion")]
    NoAgents,

    #[error("Agent {0} is listed more than once")]
    DuplicateAgent(AgentId),

    #[error("Agent {0} is not a participant of this session")]
    UnknownAgent(AgentId),

    #[error("Invalid discussion configuration: {0}")]
    InvalidConfig(String),

    #[error("Corrupt event log: {0}")]
    CorruptEventLog(String),

    #[error(transparent)]
    SessionState(#[from] SessionStateError),
}

impl DomainError {
    /// Whether this error was produced by the session state machine.
    pub fn is_session_state(&self) -> bool {
        matches!(self, DomainError::SessionState(_))
    }
}
