//! Human interventions between (or, with per-statement cadence, within) rounds.

use crate::agent::AgentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The five intervention kinds offered by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionKind {
    /// Follow-up question to a single agent
    QuestionOne,
    /// Same follow-up question to every agent
    QuestionAll,
    /// Additional case information for all later invocations
    SupplyInfo,
    /// Stop collecting statements for the current round
    SkipRound,
    /// End the discussion
    Terminate,
}

impl InterventionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterventionKind::QuestionOne => "question_one",
            InterventionKind::QuestionAll => "question_all",
            InterventionKind::SupplyInfo => "supply_info",
            InterventionKind::SkipRound => "skip_round",
            InterventionKind::Terminate => "terminate",
        }
    }
}

impl std::fmt::Display for InterventionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An action chosen by the human.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum InterventionAction {
    QuestionOne { target: AgentId, prompt: String },
    QuestionAll { prompt: String },
    SupplyInfo { note: String },
    SkipRound,
    Terminate,
}

impl InterventionAction {
    pub fn kind(&self) -> InterventionKind {
        match self {
            InterventionAction::QuestionOne { .. } => InterventionKind::QuestionOne,
            InterventionAction::QuestionAll { .. } => InterventionKind::QuestionAll,
            InterventionAction::SupplyInfo { .. } => InterventionKind::SupplyInfo,
            InterventionAction::SkipRound => InterventionKind::SkipRound,
            InterventionAction::Terminate => InterventionKind::Terminate,
        }
    }

    pub fn target(&self) -> Option<&AgentId> {
        match self {
            InterventionAction::QuestionOne { target, .. } => Some(target),
            _ => None,
        }
    }

    pub fn payload(&self) -> &str {
        match self {
            InterventionAction::QuestionOne { prompt, .. }
            | InterventionAction::QuestionAll { prompt } => prompt,
            InterventionAction::SupplyInfo { note } => note,
            InterventionAction::SkipRound | InterventionAction::Terminate => "",
        }
    }

    /// Whether this action asks agents for additional statements.
    pub fn is_question(&self) -> bool {
        matches!(
            self,
            InterventionAction::QuestionOne { .. } | InterventionAction::QuestionAll { .. }
        )
    }
}

/// What came back from the human-intervention channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InterventionOutcome {
    Act(InterventionAction),
    /// Explicit "continue"
    Pass,
    /// No answer within the wait bound
    TimedOut,
}

/// A recorded intervention. Appended to the transcript, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterventionEvent {
    pub kind: InterventionKind,
    pub target: Option<AgentId>,
    pub payload: String,
    /// Round index at which the intervention occurred
    pub round: u32,
    pub occurred_at: DateTime<Utc>,
}

impl InterventionEvent {
    pub fn from_action(action: &InterventionAction, round: u32) -> Self {
        Self {
            kind: action.kind(),
            target: action.target().cloned(),
            payload: action.payload().to_string(),
            round,
            occurred_at: Utc::now(),
        }
    }
}
