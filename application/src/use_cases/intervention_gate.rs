//! Intervention gate: the bounded wait for a human decision.
//!
//! # Flow
//!
//! ```text
//! round collected ──► offer() ──► channel.request() ─┬─► Act(action) ──► validate()
//!                        │                           ├─► Pass
//!                        │                           └─► (timeout) TimedOut
//!                        └──► cancellation ──► Cancelled
//! ```
//!
//! The gate does not mutate the session. The scheduler records accepted
//! actions and applies their effect.

use crate::ports::intervention_channel::{
    InterventionChannel, InterventionChannelError, InterventionPrompt,
};
use mdt_domain::{DiscussionSession, InterventionAction, InterventionOutcome};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// What the gate returned to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// The channel produced an outcome (possibly `TimedOut`)
    Outcome(InterventionOutcome),
    /// Session-level cancellation arrived while waiting
    Cancelled,
    /// The channel failed; the scheduler treats this as a pass
    ChannelFailed(InterventionChannelError),
}

/// An action the gate refuses to apply.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectedAction {
    #[error("agent {0} is not part of this discussion")]
    UnknownTarget(String),

    #[error("{0} requires non-empty text")]
    EmptyPayload(&'static str),
}

pub struct InterventionGate {
    channel: Arc<dyn InterventionChannel>,
    timeout: Option<Duration>,
}

impl InterventionGate {
    pub fn new(channel: Arc<dyn InterventionChannel>, timeout: Option<Duration>) -> Self {
        Self { channel, timeout }
    }

    /// Wait for one decision, bounded by the timeout and `cancel`.
    pub async fn offer(
        &self,
        prompt: &InterventionPrompt,
        cancel: &CancellationToken,
    ) -> GateDecision {
        debug!(
            "Offering intervention for session {} round {}",
            prompt.session_id, prompt.round
        );

        let request = async {
            match self.timeout {
                Some(limit) => match tokio::time::timeout(limit, self.channel.request(prompt)).await
                {
                    Ok(result) => result,
                    Err(_) => {
                        info!("No intervention within {:?}, continuing", limit);
                        Ok(InterventionOutcome::TimedOut)
                    }
                },
                None => self.channel.request(prompt).await,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => GateDecision::Cancelled,
            result = request => match result {
                Ok(outcome) => GateDecision::Outcome(outcome),
                Err(e) => GateDecision::ChannelFailed(e),
            },
        }
    }

    /// Check an action against the session and normalise its text.
    pub fn validate(
        action: InterventionAction,
        session: &DiscussionSession,
    ) -> Result<InterventionAction, RejectedAction> {
        match action {
            InterventionAction::QuestionOne { target, prompt } => {
                if !session.has_agent(&target) {
                    return Err(RejectedAction::UnknownTarget(target.to_string()));
                }
                Ok(InterventionAction::QuestionOne {
                    target,
                    prompt: non_empty(prompt, "question-one")?,
                })
            }
            InterventionAction::QuestionAll { prompt } => Ok(InterventionAction::QuestionAll {
                prompt: non_empty(prompt, "question-all")?,
            }),
            InterventionAction::SupplyInfo { note } => Ok(InterventionAction::SupplyInfo {
                note: non_empty(note, "supply-info")?,
            }),
            other @ (InterventionAction::SkipRound | InterventionAction::Terminate) => Ok(other),
        }
    }
}

fn non_empty(text: String, kind: &'static str) -> Result<String, RejectedAction> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(RejectedAction::EmptyPayload(kind))
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::intervention_channel::{ChannelIntervention, ScriptedIntervention};
    use mdt_domain::{CaseRecord, DiscussionConfig, SessionId};

    fn prompt() -> InterventionPrompt {
        InterventionPrompt {
            session_id: SessionId::new("g"),
            round: 1,
            max_rounds: 2,
            agents: vec!["cardio".into(), "renal".into()],
            last_speaker: None,
            flagged: Vec::new(),
            follow_ups_left: 3,
        }
    }

    fn session() -> DiscussionSession {
        let case = CaseRecord::new("AKI", "", "", "Dialysis?").unwrap();
        DiscussionSession::create(
            SessionId::new("g"),
            case,
            vec!["cardio".into(), "renal".into()],
            DiscussionConfig::default(),
        )
        .unwrap()
        .0
    }

    #[tokio::test]
    async fn test_outcome_is_forwarded() {
        let channel = Arc::new(ScriptedIntervention::new([InterventionOutcome::Act(
            InterventionAction::SkipRound,
        )]));
        let gate = InterventionGate::new(channel, Some(Duration::from_secs(1)));
        let decision = gate.offer(&prompt(), &CancellationToken::new()).await;
        assert_eq!(
            decision,
            GateDecision::Outcome(InterventionOutcome::Act(InterventionAction::SkipRound))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_yields_timed_out() {
        let (channel, _tx) = ChannelIntervention::pair(1);
        let gate = InterventionGate::new(Arc::new(channel), Some(Duration::from_secs(30)));
        let decision = gate.offer(&prompt(), &CancellationToken::new()).await;
        assert_eq!(decision, GateDecision::Outcome(InterventionOutcome::TimedOut));
    }

    #[tokio::test]
    async fn test_cancellation_wins_over_waiting() {
        let (channel, _tx) = ChannelIntervention::pair(1);
        let gate = InterventionGate::new(Arc::new(channel), None);
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(gate.offer(&prompt(), &cancel).await, GateDecision::Cancelled);
    }

    #[tokio::test]
    async fn test_closed_channel_is_reported() {
        let (channel, tx) = ChannelIntervention::pair(1);
        drop(tx);
        let gate = InterventionGate::new(Arc::new(channel), None);
        assert_eq!(
            gate.offer(&prompt(), &CancellationToken::new()).await,
            GateDecision::ChannelFailed(InterventionChannelError::Closed)
        );
    }

    #[test]
    fn test_validate_rejects_unknown_target_and_empty_text() {
        let session = session();
        let unknown = InterventionAction::QuestionOne {
            target: "ghost".into(),
            prompt: "Why?".to_string(),
        };
        assert_eq!(
            InterventionGate::validate(unknown, &session),
            Err(RejectedAction::UnknownTarget("ghost".to_string()))
        );

        let empty = InterventionAction::SupplyInfo {
            note: "   ".to_string(),
        };
        assert!(InterventionGate::validate(empty, &session).is_err());

        let ok = InterventionAction::QuestionAll {
            prompt: "  Any objections? ".to_string(),
        };
        assert_eq!(
            InterventionGate::validate(ok, &session),
            Ok(InterventionAction::QuestionAll {
                prompt: "Any objections?".to_string()
            })
        );
    }
}
