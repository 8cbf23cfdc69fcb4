//! Agent capability port
//!
//! Defines the interface for invoking a specialist agent's reasoning.
//! The engine never knows what a specialty does; every agent shares the
//! same contract and differs only in its [`AgentProfile`] data.

use async_trait::async_trait;
use mdt_domain::util::excerpt;
use mdt_domain::{
    AgentId, AgentProfile, CaseRecord, DiscussionSession, SessionId, StatementId, StatementKind,
    SuppliedNote,
};
use std::sync::Arc;
use thiserror::Error;

/// Characters of each prior statement passed to agents.
pub const PRIOR_EXCERPT_CHARS: usize = 150;

/// Errors raised by a capability implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout")]
    Timeout,

    #[error("Empty response")]
    EmptyResponse,

    #[error("Other error: {0}")]
    Other(String),
}

/// An earlier statement as seen by the next speaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorStatement {
    pub id: StatementId,
    pub agent: AgentId,
    pub excerpt: String,
}

/// Everything an agent is given to produce one statement.
///
/// Built from a session snapshot at dispatch time; agents in the same
/// dispatch batch see the same context.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub session_id: SessionId,
    pub round: u32,
    pub kind: StatementKind,
    pub case: CaseRecord,
    pub notes: Vec<SuppliedNote>,
    pub prior: Vec<PriorStatement>,
    /// Follow-up question from the human, if this is a follow-up
    pub prompt: Option<String>,
}

impl InvocationContext {
    pub fn from_session(
        session: &DiscussionSession,
        kind: StatementKind,
        prompt: Option<String>,
    ) -> Self {
        let prior = session
            .transcript()
            .delivered()
            .map(|s| PriorStatement {
                id: s.id(),
                agent: s.agent().clone(),
                excerpt: excerpt(s.content(), PRIOR_EXCERPT_CHARS),
            })
            .collect();

        Self {
            session_id: session.id().clone(),
            round: session.round(),
            kind,
            case: session.case().clone(),
            notes: session.notes().to_vec(),
            prior,
            prompt,
        }
    }

    /// Render the user-facing part of an agent prompt.
    pub fn render(&self) -> String {
        let mut out = self.case.render();

        if !self.notes.is_empty() {
            out.push_str("\n\nAdditional information from the team:");
            for note in &self.notes {
                out.push_str(&format!("\n- (round {}) {}", note.round, note.text));
            }
        }

        if self.prior.is_empty() {
            out.push_str("\n\nYou are the first to speak.");
        } else {
            out.push_str("\n\nDiscussion so far:");
            for p in &self.prior {
                out.push_str(&format!("\n- [{}] {}: {}", p.id, p.agent, p.excerpt));
            }
        }

        match &self.prompt {
            Some(prompt) => out.push_str(&format!(
                "\n\nThe attending physician asks you: {}",
                prompt
            )),
            None => out.push_str(&format!(
                "\n\nRound {}: give your assessment.",
                self.round
            )),
        }
        out
    }
}

/// A specialist agent.
///
/// Implementations live in the infrastructure layer. A call must have no
/// side effects on the engine; retrying it is always safe.
#[async_trait]
pub trait AgentCapability: Send + Sync {
    fn profile(&self) -> &AgentProfile;

    /// Produce the text of one statement.
    async fn speak(&self, context: &InvocationContext) -> Result<String, CapabilityError>;
}

/// Registry mapping agent ids to capabilities.
pub trait AgentCatalog: Send + Sync {
    fn resolve(&self, agent: &AgentId) -> Option<Arc<dyn AgentCapability>>;

    /// Ids of every registered agent, in registration order.
    fn agent_ids(&self) -> Vec<AgentId>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdt_domain::{DiscussionConfig, SessionState, StatementDraft};

    fn session() -> DiscussionSession {
        let case = CaseRecord::new("Dyspnoea", "", "EF 30%", "Diuretics?").unwrap();
        let (mut session, _) = DiscussionSession::create(
            SessionId::new("ctx"),
            case,
            vec!["cardio".into(), "renal".into()],
            DiscussionConfig::default(),
        )
        .unwrap();
        session.transition(SessionState::Running, "start").unwrap();
        session.begin_round().unwrap();
        session
    }

    #[test]
    fn test_first_speaker_context() {
        let ctx = InvocationContext::from_session(&session(), StatementKind::Regular, None);
        assert_eq!(ctx.round, 1);
        assert!(ctx.prior.is_empty());
        let text = ctx.render();
        assert!(text.contains("first to speak"));
        assert!(text.contains("Round 1"));
    }

    #[test]
    fn test_prior_statements_are_excerpted() {
        let mut session = session();
        let long = "x".repeat(400);
        session
            .record_statement(StatementDraft::delivered(
                "cardio".into(),
                StatementKind::Regular,
                long,
            ))
            .unwrap();

        let ctx = InvocationContext::from_session(
            &session,
            StatementKind::FollowUp,
            Some("And the kidneys?".to_string()),
        );
        assert_eq!(ctx.prior.len(), 1);
        assert_eq!(ctx.prior[0].excerpt.chars().count(), PRIOR_EXCERPT_CHARS + 3);
        assert!(ctx.render().contains("asks you: And the kidneys?"));
    }
}
