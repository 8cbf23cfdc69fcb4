//! Session events: the append-only log a session is rebuilt from.

use super::config::DiscussionConfig;
use super::intervention::InterventionEvent;
use super::session::SessionId;
use super::state::SessionState;
use super::statement::Statement;
use super::turn::InvocationGap;
use crate::agent::AgentId;
use crate::case::CaseRecord;
use crate::consensus::ConsensusReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded mutation of a [`DiscussionSession`](super::session::DiscussionSession).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Created {
        session_id: SessionId,
        case: CaseRecord,
        agents: Vec<AgentId>,
        config: DiscussionConfig,
        at: DateTime<Utc>,
    },
    StateChanged {
        from: SessionState,
        to: SessionState,
        reason: String,
        at: DateTime<Utc>,
    },
    RoundStarted {
        round: u32,
        at: DateTime<Utc>,
    },
    StatementRecorded {
        statement: Statement,
    },
    GapRecorded {
        round: u32,
        gap: InvocationGap,
    },
    InterventionRecorded {
        event: InterventionEvent,
    },
    ReportAttached {
        report: Box<ConsensusReport>,
    },
}

impl SessionEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::Created { .. } => "created",
            SessionEvent::StateChanged { .. } => "state_changed",
            SessionEvent::RoundStarted { .. } => "round_started",
            SessionEvent::StatementRecorded { .. } => "statement_recorded",
            SessionEvent::GapRecorded { .. } => "gap_recorded",
            SessionEvent::InterventionRecorded { .. } => "intervention_recorded",
            SessionEvent::ReportAttached { .. } => "report_attached",
        }
    }

    /// Short human-readable description, used for status lines.
    pub fn describe(&self) -> String {
        match self {
            SessionEvent::Created { agents, .. } => {
                format!("session created with {} agents", agents.len())
            }
            SessionEvent::StateChanged { from, to, reason, .. } => {
                format!("{} -> {} ({})", from, to, reason)
            }
            SessionEvent::RoundStarted { round, .. } => format!("round {} started", round),
            SessionEvent::StatementRecorded { statement } => {
                if statement.is_delivered() {
                    format!("{} spoke ({})", statement.agent(), statement.id())
                } else {
                    format!("{} failed ({})", statement.agent(), statement.id())
                }
            }
            SessionEvent::GapRecorded { gap, .. } => format!("{}: {}", gap.agent, gap.reason),
            SessionEvent::InterventionRecorded { event } => {
                format!("intervention: {}", event.kind)
            }
            SessionEvent::ReportAttached { .. } => "consensus report attached".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_serialization() {
        let event = SessionEvent::RoundStarted {
            round: 2,
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "round_started");
        assert_eq!(json["round"], 2);
        assert_eq!(event.event_type(), "round_started");
    }

    #[test]
    fn test_describe_state_change() {
        let event = SessionEvent::StateChanged {
            from: SessionState::Running,
            to: SessionState::Completed,
            reason: "round budget exhausted".to_string(),
            at: Utc::now(),
        };
        assert_eq!(event.describe(), "running -> completed (round budget exhausted)");
    }
}
