//! Turns: the statements belonging to one round.

use super::statement::{Statement, StatementId};
use crate::agent::AgentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why an agent has no statement in a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapReason {
    /// The agent id is unknown to the registry
    NotFound,
    /// The invocation was abandoned after cancellation
    Cancelled,
}

impl std::fmt::Display for GapReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GapReason::NotFound => f.write_str("agent not found"),
            GapReason::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// A missing contribution, logged so it is never silently lost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationGap {
    pub agent: AgentId,
    pub reason: GapReason,
    pub detail: String,
}

impl InvocationGap {
    pub fn new(agent: AgentId, reason: GapReason, detail: impl Into<String>) -> Self {
        Self {
            agent,
            reason,
            detail: detail.into(),
        }
    }
}

/// One round's statements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    round: u32,
    started_at: DateTime<Utc>,
    statements: Vec<Statement>,
    gaps: Vec<InvocationGap>,
    skipped: bool,
}

impl Turn {
    pub(crate) fn new(round: u32, started_at: DateTime<Utc>) -> Self {
        Self {
            round,
            started_at,
            statements: Vec::new(),
            gaps: Vec::new(),
            skipped: false,
        }
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn gaps(&self) -> &[InvocationGap] {
        &self.gaps
    }

    /// Whether the remaining agents of this round were skipped by the user.
    pub fn is_skipped(&self) -> bool {
        self.skipped
    }

    /// Sequence index the next recorded statement must carry.
    pub fn next_sequence(&self) -> u32 {
        self.statements.last().map(|s| s.sequence() + 1).unwrap_or(1)
    }

    /// Number of statements by `agent` in this round.
    pub fn count_for(&self, agent: &AgentId) -> usize {
        self.statements.iter().filter(|s| s.agent() == agent).count()
    }

    pub fn delivered_count(&self) -> usize {
        self.statements.iter().filter(|s| s.is_delivered()).count()
    }

    pub(crate) fn push(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    pub(crate) fn push_gap(&mut self, gap: InvocationGap) {
        self.gaps.push(gap);
    }

    pub(crate) fn mark_skipped(&mut self) {
        self.skipped = true;
    }

    pub(crate) fn statement_mut(&mut self, id: StatementId) -> Option<&mut Statement> {
        self.statements.iter_mut().find(|s| s.id() == id)
    }
}
