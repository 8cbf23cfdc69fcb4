//! Point-in-time status of a session for observers.

use super::session::{DiscussionSession, SessionId};
use super::state::SessionState;
use super::statement::StatementId;
use serde::{Deserialize, Serialize};

/// Cheap, owned summary of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub state: SessionState,
    pub round: u32,
    pub max_rounds: u32,
    pub agents: usize,
    pub statements: usize,
    pub delivered: usize,
    pub interventions: usize,
    pub notes: usize,
    pub last_statement: Option<StatementId>,
    pub has_report: bool,
    /// Description of the most recent event, if the producer set one
    pub last_event: Option<String>,
}

impl SessionSnapshot {
    pub fn of(session: &DiscussionSession) -> Self {
        let transcript = session.transcript();
        Self {
            session_id: session.id().clone(),
            state: session.state(),
            round: session.round(),
            max_rounds: session.config().max_rounds,
            agents: session.agents().len(),
            statements: transcript.statements().count(),
            delivered: transcript.delivered().count(),
            interventions: session.interventions().len(),
            notes: session.notes().len(),
            last_statement: transcript.statements().last().map(|s| s.id()),
            has_report: session.report().is_some(),
            last_event: None,
        }
    }

    pub fn with_last_event(mut self, description: impl Into<String>) -> Self {
        self.last_event = Some(description.into());
        self
    }
}
