//! Consensus report types.

use crate::agent::AgentId;
use crate::consensus::TieBreak;
use crate::discussion::statement::{StatementId, StatementKind};
use crate::discussion::transcript::Transcript;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A statement disagreeing with the selected recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DissentingStatement {
    pub statement: StatementId,
    pub agent: AgentId,
    pub category: String,
    pub excerpt: String,
}

/// Discussion quality figures derived from the transcript.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscussionMetrics {
    pub rounds_executed: u32,
    pub skipped_rounds: u32,
    pub delivered_statements: usize,
    pub follow_up_statements: usize,
    pub failed_invocations: usize,
    pub gaps: usize,
    /// Intervention count by kind
    pub interventions: BTreeMap<String, usize>,
    /// Number of distinct contradicting statement pairs
    pub contradiction_links: usize,
    pub low_confidence_statements: usize,
    /// Agents that delivered at least one statement
    pub perspectives: usize,
}

impl DiscussionMetrics {
    pub fn from_transcript(transcript: Transcript<'_>) -> Self {
        let mut metrics = DiscussionMetrics {
            rounds_executed: transcript.turns().len() as u32,
            skipped_rounds: transcript.turns().iter().filter(|t| t.is_skipped()).count() as u32,
            gaps: transcript.turns().iter().map(|t| t.gaps().len()).sum(),
            ..Default::default()
        };

        let mut link_ends = 0;
        let mut agents = BTreeSet::new();
        for statement in transcript.statements() {
            if !statement.is_delivered() {
                metrics.failed_invocations += 1;
                continue;
            }
            metrics.delivered_statements += 1;
            agents.insert(statement.agent());
            if statement.kind() == StatementKind::FollowUp {
                metrics.follow_up_statements += 1;
            }
            if !statement.flags().low_confidence.is_empty() {
                metrics.low_confidence_statements += 1;
            }
            link_ends += statement.flags().contradicts.len();
        }
        // Links are reciprocal, every pair is seen from both ends
        metrics.contradiction_links = link_ends / 2;
        metrics.perspectives = agents.len();

        for event in transcript.interventions() {
            *metrics
                .interventions
                .entry(event.kind.as_str().to_string())
                .or_default() += 1;
        }

        metrics
    }
}

/// Deterministic part of a consensus report.
///
/// Synthesising the same transcript with the same rule yields identical
/// content (and identical serialized bytes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportContent {
    /// Selected recommendation category, if any statement declared one
    pub primary_recommendation: Option<String>,
    /// Synthesised recommendation text
    pub summary: String,
    pub votes_for_primary: usize,
    pub votes_cast: usize,
    /// Statements backing the primary recommendation
    pub supporting: Vec<StatementId>,
    pub dissent: Vec<DissentingStatement>,
    /// Votes per category
    pub tally: BTreeMap<String, usize>,
    /// Flagged statements left out of the vote
    pub excluded_flagged: Vec<StatementId>,
    pub tie_break: TieBreak,
    pub metrics: DiscussionMetrics,
}

/// Final synthesised decision of a session. Produced at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusReport {
    pub content: ReportContent,
    pub generated_at: DateTime<Utc>,
}

impl ConsensusReport {
    pub fn new(content: ReportContent, generated_at: DateTime<Utc>) -> Self {
        Self {
            content,
            generated_at,
        }
    }

    pub fn primary_recommendation(&self) -> Option<&str> {
        self.content.primary_recommendation.as_deref()
    }

    pub fn dissent(&self) -> &[DissentingStatement] {
        &self.content.dissent
    }
}
