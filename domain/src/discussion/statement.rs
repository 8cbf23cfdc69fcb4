//! Statements: what a specialist said in a given round.

use crate::agent::AgentId;
use crate::claims::{ClaimExtraction, extract_claims};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Position of a statement in the transcript.
///
/// Sequence indices start at 1 and are strictly increasing within a round,
/// so ordering by `(round, sequence)` is transcript order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StatementId {
    pub round: u32,
    pub sequence: u32,
}

impl StatementId {
    pub fn new(round: u32, sequence: u32) -> Self {
        Self { round, sequence }
    }
}

impl std::fmt::Display for StatementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}#{}", self.round, self.sequence)
    }
}

/// Why a statement was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    /// The agent's scheduled turn in the round
    Regular,
    /// Answer to a human follow-up question
    FollowUp,
}

/// Whether the agent actually delivered content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatementStatus {
    Delivered,
    /// Placeholder recorded after invocation retries were exhausted
    Failed { reason: String, attempts: u32 },
}

/// Advisory consistency metadata.
///
/// Flags never block or reorder a statement. Contradiction links are
/// reciprocal, so an earlier statement gains back references when later
/// statements contradict it; the set only ever grows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyFlags {
    /// Earlier (or, via back references, later) statements this one conflicts with
    pub contradicts: BTreeSet<StatementId>,
    /// Reasons the checker could not judge this statement with confidence
    pub low_confidence: Vec<String>,
}

impl ConsistencyFlags {
    pub fn is_clear(&self) -> bool {
        self.contradicts.is_empty() && self.low_confidence.is_empty()
    }
}

/// A candidate statement returned by an agent invocation, not yet recorded.
///
/// Each invocation attempt produces a fresh draft; drafts are never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementDraft {
    pub agent: AgentId,
    pub kind: StatementKind,
    pub status: StatementStatus,
    pub content: String,
    pub extraction: ClaimExtraction,
    pub flags: ConsistencyFlags,
    pub produced_at: DateTime<Utc>,
}

impl StatementDraft {
    /// A statement the agent delivered; claims are extracted immediately.
    pub fn delivered(agent: AgentId, kind: StatementKind, content: impl Into<String>) -> Self {
        let content = content.into();
        let extraction = extract_claims(&content);
        Self {
            agent,
            kind,
            status: StatementStatus::Delivered,
            content,
            extraction,
            flags: ConsistencyFlags::default(),
            produced_at: Utc::now(),
        }
    }

    /// A placeholder for an invocation that failed after all retries.
    pub fn failed(agent: AgentId, kind: StatementKind, reason: impl Into<String>, attempts: u32) -> Self {
        Self {
            agent,
            kind,
            status: StatementStatus::Failed {
                reason: reason.into(),
                attempts,
            },
            content: String::new(),
            extraction: ClaimExtraction::default(),
            flags: ConsistencyFlags::default(),
            produced_at: Utc::now(),
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self.status, StatementStatus::Delivered)
    }

    pub fn with_flags(mut self, flags: ConsistencyFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// A recorded statement. Immutable apart from reciprocal contradiction links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    id: StatementId,
    agent: AgentId,
    kind: StatementKind,
    status: StatementStatus,
    content: String,
    extraction: ClaimExtraction,
    flags: ConsistencyFlags,
    recorded_at: DateTime<Utc>,
}

impl Statement {
    pub(crate) fn from_draft(id: StatementId, draft: StatementDraft) -> Self {
        Self {
            id,
            agent: draft.agent,
            kind: draft.kind,
            status: draft.status,
            content: draft.content,
            extraction: draft.extraction,
            flags: draft.flags,
            recorded_at: draft.produced_at,
        }
    }

    pub fn id(&self) -> StatementId {
        self.id
    }

    pub fn round(&self) -> u32 {
        self.id.round
    }

    pub fn sequence(&self) -> u32 {
        self.id.sequence
    }

    pub fn agent(&self) -> &AgentId {
        &self.agent
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn status(&self) -> &StatementStatus {
        &self.status
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self.status, StatementStatus::Delivered)
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn extraction(&self) -> &ClaimExtraction {
        &self.extraction
    }

    pub fn primary_category(&self) -> Option<&str> {
        self.extraction.primary_category()
    }

    pub fn flags(&self) -> &ConsistencyFlags {
        &self.flags
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    pub(crate) fn link_contradiction(&mut self, other: StatementId) {
        self.flags.contradicts.insert(other);
    }
}
