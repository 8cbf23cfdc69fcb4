//! Decision synthesis: turns a transcript into a consensus report.
//!
//! Aggregation is a plain majority over the primary recommendation category
//! of each delivered statement:
//!
//! | Step | Rule |
//! |------|------|
//! | Voters | delivered statements with a declared category |
//! | Flagged | excluded while any unflagged voter exists |
//! | Winner | most votes, ties resolved by [`TieBreak`] |
//! | Dissent | every delivered statement with another category |
//!
//! Failed placeholders never vote. The output depends only on the
//! transcript and the tie-break rule.

use super::report::{ConsensusReport, DiscussionMetrics, DissentingStatement, ReportContent};
use super::tie_break::{TieBreak, TieKey};
use crate::discussion::statement::{Statement, StatementId};
use crate::discussion::transcript::Transcript;
use crate::util::excerpt;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

const DISSENT_EXCERPT_CHARS: usize = 160;

/// Why no report could be produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("transcript contains no delivered statements")]
    EmptyTranscript,
}

/// Aggregates a transcript into a [`ReportContent`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionSynthesizer {
    tie_break: TieBreak,
}

impl DecisionSynthesizer {
    pub fn new(tie_break: TieBreak) -> Self {
        Self { tie_break }
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Produce the deterministic content of a report.
    pub fn synthesize(&self, transcript: Transcript<'_>) -> Result<ReportContent, SynthesisError> {
        let delivered: Vec<&Statement> = transcript.delivered().collect();
        if delivered.is_empty() {
            return Err(SynthesisError::EmptyTranscript);
        }

        let categorised: Vec<(&Statement, &str)> = delivered
            .iter()
            .filter_map(|s| s.primary_category().map(|c| (*s, c)))
            .collect();

        let has_clear_voter = categorised.iter().any(|(s, _)| s.flags().is_clear());
        let (voters, excluded_flagged): (Vec<(&Statement, &str)>, Vec<StatementId>) =
            if has_clear_voter {
                let excluded = categorised
                    .iter()
                    .filter(|(s, _)| !s.flags().is_clear())
                    .map(|(s, _)| s.id())
                    .collect();
                let voters = categorised
                    .iter()
                    .copied()
                    .filter(|(s, _)| s.flags().is_clear())
                    .collect();
                (voters, excluded)
            } else {
                (categorised.clone(), Vec::new())
            };

        let mut buckets: BTreeMap<&str, Vec<&Statement>> = BTreeMap::new();
        for (statement, category) in &voters {
            buckets.entry(*category).or_default().push(*statement);
        }
        let tally: BTreeMap<String, usize> = buckets
            .iter()
            .map(|(category, votes)| (category.to_string(), votes.len()))
            .collect();

        let primary = buckets
            .iter()
            .max_by(|(_, a), (_, b)| {
                a.len()
                    .cmp(&b.len())
                    .then_with(|| self.best_key(b).cmp(&self.best_key(a)))
            })
            .map(|(category, votes)| (category.to_string(), votes.len()));

        let primary_category = primary.as_ref().map(|(c, _)| c.as_str());
        let supporting: Vec<StatementId> = categorised
            .iter()
            .filter(|(_, c)| Some(*c) == primary_category)
            .map(|(s, _)| s.id())
            .collect();
        let dissent: Vec<DissentingStatement> = categorised
            .iter()
            .filter(|(_, c)| Some(*c) != primary_category)
            .map(|(s, c)| DissentingStatement {
                statement: s.id(),
                agent: s.agent().clone(),
                category: c.to_string(),
                excerpt: excerpt(s.content(), DISSENT_EXCERPT_CHARS),
            })
            .collect();

        let metrics = DiscussionMetrics::from_transcript(transcript);
        let votes_for_primary = primary.as_ref().map(|(_, n)| *n).unwrap_or(0);

        let mut content = ReportContent {
            primary_recommendation: primary.map(|(c, _)| c),
            summary: String::new(),
            votes_for_primary,
            votes_cast: voters.len(),
            supporting,
            dissent,
            tally,
            excluded_flagged,
            tie_break: self.tie_break,
            metrics,
        };
        content.summary = render_summary(&content, transcript, delivered.len());
        Ok(content)
    }

    /// Produce a timestamped report.
    pub fn synthesize_report(
        &self,
        transcript: Transcript<'_>,
        generated_at: DateTime<Utc>,
    ) -> Result<ConsensusReport, SynthesisError> {
        Ok(ConsensusReport::new(self.synthesize(transcript)?, generated_at))
    }

    fn best_key<'a>(&self, votes: &[&'a Statement]) -> Option<TieKey<'a>> {
        votes.iter().map(|s| self.tie_break.key(*s)).min()
    }
}

fn render_summary(content: &ReportContent, transcript: Transcript<'_>, delivered: usize) -> String {
    let mut lines = Vec::new();

    match &content.primary_recommendation {
        Some(category) => {
            lines.push(format!(
                "Primary recommendation: {} ({}/{} votes, tie-break: {})",
                category, content.votes_for_primary, content.votes_cast, content.tie_break
            ));
            let backers: Vec<String> = content
                .supporting
                .iter()
                .filter_map(|id| transcript.statement(*id))
                .map(|s| format!("{} ({})", s.agent(), s.id()))
                .collect();
            lines.push(format!("Supported by: {}", backers.join(", ")));
        }
        None => lines.push(format!(
            "No recommendation declared: none of the {} delivered statements stated a diagnosis or recommendation.",
            delivered
        )),
    }

    if !content.dissent.is_empty() {
        lines.push("Dissent:".to_string());
        for d in &content.dissent {
            lines.push(format!("  - {} ({}): {}", d.agent, d.statement, d.category));
        }
    }

    if !content.excluded_flagged.is_empty() {
        let ids: Vec<String> = content.excluded_flagged.iter().map(|id| id.to_string()).collect();
        lines.push(format!("Flagged statements excluded from the vote: {}", ids.join(", ")));
    }

    if content.metrics.contradiction_links > 0 {
        lines.push(format!(
            "Contradictions noted: {}",
            content.metrics.contradiction_links
        ));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentId;
    use crate::case::CaseRecord;
    use crate::discussion::config::DiscussionConfig;
    use crate::discussion::session::{DiscussionSession, SessionId};
    use crate::discussion::state::SessionState;
    use crate::discussion::statement::{ConsistencyFlags, StatementDraft, StatementKind};

    fn running_session(agents: &[&str]) -> DiscussionSession {
        let case = CaseRecord::new("Dyspnoea", "", "", "Next step?").unwrap();
        let agents = agents.iter().map(|a| AgentId::from(*a)).collect();
        let (mut session, _) = DiscussionSession::create(
            SessionId::new("s-1"),
            case,
            agents,
            DiscussionConfig::default(),
        )
        .unwrap();
        session.transition(SessionState::Running, "start").unwrap();
        session.begin_round().unwrap();
        session
    }

    fn say(session: &mut DiscussionSession, agent: &str, content: &str) {
        let draft = StatementDraft::delivered(agent.into(), StatementKind::Regular, content);
        session.record_statement(draft).unwrap();
    }

    #[test]
    fn test_empty_transcript_is_an_error() {
        let session = running_session(&["cardio"]);
        let result = DecisionSynthesizer::default().synthesize(session.transcript());
        assert_eq!(result, Err(SynthesisError::EmptyTranscript));
    }

    #[test]
    fn test_failed_placeholders_do_not_count() {
        let mut session = running_session(&["cardio"]);
        let draft = StatementDraft::failed("cardio".into(), StatementKind::Regular, "timeout", 3);
        session.record_statement(draft).unwrap();
        let result = DecisionSynthesizer::default().synthesize(session.transcript());
        assert_eq!(result, Err(SynthesisError::EmptyTranscript));
    }

    #[test]
    fn test_majority_wins_and_minority_is_dissent() {
        let mut session = running_session(&["cardio", "renal", "pharm"]);
        say(&mut session, "cardio", "Recommendation: diuresis");
        say(&mut session, "renal", "Recommendation: dialysis");
        say(&mut session, "pharm", "Recommendation: diuresis");

        let content = DecisionSynthesizer::default()
            .synthesize(session.transcript())
            .unwrap();
        assert_eq!(content.primary_recommendation.as_deref(), Some("diuresis"));
        assert_eq!(content.votes_for_primary, 2);
        assert_eq!(content.votes_cast, 3);
        assert_eq!(content.dissent.len(), 1);
        assert_eq!(content.dissent[0].agent, AgentId::from("renal"));
        assert_eq!(content.supporting, vec![StatementId::new(1, 1), StatementId::new(1, 3)]);
    }

    #[test]
    fn test_tie_break_rules() {
        let mut session = running_session(&["zeta", "alpha"]);
        say(&mut session, "zeta", "Recommendation: surgery");
        say(&mut session, "alpha", "Recommendation: medical therapy");

        let earliest = DecisionSynthesizer::new(TieBreak::EarliestRound)
            .synthesize(session.transcript())
            .unwrap();
        // Same round, so the lower agent id decides
        assert_eq!(earliest.primary_recommendation.as_deref(), Some("medical therapy"));

        let by_agent = DecisionSynthesizer::new(TieBreak::LowestAgent)
            .synthesize(session.transcript())
            .unwrap();
        assert_eq!(by_agent.primary_recommendation.as_deref(), Some("medical therapy"));
    }

    #[test]
    fn test_earliest_round_beats_agent_order() {
        let mut session = running_session(&["alpha", "zeta"]);
        say(&mut session, "zeta", "Recommendation: surgery");
        session.begin_round().unwrap();
        say(&mut session, "alpha", "Recommendation: medical therapy");

        let earliest = DecisionSynthesizer::new(TieBreak::EarliestRound)
            .synthesize(session.transcript())
            .unwrap();
        assert_eq!(earliest.primary_recommendation.as_deref(), Some("surgery"));

        let by_agent = DecisionSynthesizer::new(TieBreak::LowestAgent)
            .synthesize(session.transcript())
            .unwrap();
        assert_eq!(by_agent.primary_recommendation.as_deref(), Some("medical therapy"));
    }

    #[test]
    fn test_flagged_statements_are_excluded_when_clear_ones_exist() {
        let mut session = running_session(&["cardio", "renal", "pharm"]);
        say(&mut session, "cardio", "Recommendation: diuresis");
        let flagged = StatementDraft::delivered(
            "renal".into(),
            StatementKind::Regular,
            "Recommendation: dialysis",
        )
        .with_flags(ConsistencyFlags {
            low_confidence: vec!["ambiguous".to_string()],
            ..Default::default()
        });
        session.record_statement(flagged).unwrap();
        let flagged = StatementDraft::delivered(
            "pharm".into(),
            StatementKind::Regular,
            "Recommendation: dialysis",
        )
        .with_flags(ConsistencyFlags {
            low_confidence: vec!["ambiguous".to_string()],
            ..Default::default()
        });
        session.record_statement(flagged).unwrap();

        let content = DecisionSynthesizer::default()
            .synthesize(session.transcript())
            .unwrap();
        assert_eq!(content.primary_recommendation.as_deref(), Some("diuresis"));
        assert_eq!(content.excluded_flagged.len(), 2);
        assert_eq!(content.dissent.len(), 2);
    }

    #[test]
    fn test_no_declared_category_still_reports() {
        let mut session = running_session(&["cardio"]);
        say(&mut session, "cardio", "I need more data before committing.");
        let content = DecisionSynthesizer::default()
            .synthesize(session.transcript())
            .unwrap();
        assert!(content.primary_recommendation.is_none());
        assert!(content.summary.contains("No recommendation declared"));
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        let mut session = running_session(&["cardio", "renal"]);
        say(&mut session, "cardio", "Recommendation: diuresis");
        say(&mut session, "renal", "Recommendation: dialysis");

        let synth = DecisionSynthesizer::default();
        let a = serde_json::to_vec(&synth.synthesize(session.transcript()).unwrap()).unwrap();
        let b = serde_json::to_vec(&synth.synthesize(session.transcript()).unwrap()).unwrap();
        assert_eq!(a, b);
    }
}
