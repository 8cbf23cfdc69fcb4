//! Human intervention channel port.
//!
//! The channel is the single suspension point where the engine waits for a
//! human. It presents the five action kinds plus "continue" and returns an
//! [`InterventionOutcome`]. The bounded wait and timeout fallback are applied
//! by the [`InterventionGate`](crate::use_cases::intervention_gate::InterventionGate),
//! so implementations may simply await input.
//!
//! # Built-in Implementations
//!
//! - [`NoIntervention`] - Always passes
//! - [`ScriptedIntervention`] - Replays a fixed list of outcomes
//! - [`ChannelIntervention`] - Awaits outcomes sent over a tokio mpsc channel
//!
//! For interactive use, see `ConsoleIntervention` in the presentation layer.

use async_trait::async_trait;
use mdt_domain::{AgentId, InterventionOutcome, SessionId};
use std::collections::VecDeque;
use std::sync::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;

/// Failures of the channel itself, not decisions made by the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InterventionChannelError {
    #[error("intervention channel closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(String),
}

/// What the human is shown when the gate opens.
#[derive(Debug, Clone)]
pub struct InterventionPrompt {
    pub session_id: SessionId,
    pub round: u32,
    pub max_rounds: u32,
    pub agents: Vec<AgentId>,
    /// Agent whose turn just ended, for per-statement cadence
    pub last_speaker: Option<AgentId>,
    /// Statement ids carrying contradiction or low-confidence flags this round
    pub flagged: Vec<String>,
    /// Remaining question actions before the gate stops re-offering
    pub follow_ups_left: usize,
}

#[async_trait]
pub trait InterventionChannel: Send + Sync {
    async fn request(
        &self,
        prompt: &InterventionPrompt,
    ) -> Result<InterventionOutcome, InterventionChannelError>;
}

/// Never intervenes.
pub struct NoIntervention;

#[async_trait]
impl InterventionChannel for NoIntervention {
    async fn request(
        &self,
        _prompt: &InterventionPrompt,
    ) -> Result<InterventionOutcome, InterventionChannelError> {
        Ok(InterventionOutcome::Pass)
    }
}

/// Returns queued outcomes in order, then passes.
#[derive(Default)]
pub struct ScriptedIntervention {
    outcomes: Mutex<VecDeque<InterventionOutcome>>,
    offered: Mutex<Vec<InterventionPrompt>>,
}

impl ScriptedIntervention {
    pub fn new(outcomes: impl IntoIterator<Item = InterventionOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            offered: Mutex::new(Vec::new()),
        }
    }

    /// Prompts seen so far.
    pub fn offered(&self) -> Vec<InterventionPrompt> {
        self.offered
            .lock()
            .map(|o| o.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }
}

#[async_trait]
impl InterventionChannel for ScriptedIntervention {
    async fn request(
        &self,
        prompt: &InterventionPrompt,
    ) -> Result<InterventionOutcome, InterventionChannelError> {
        if let Ok(mut offered) = self.offered.lock() {
            offered.push(prompt.clone());
        }
        let next = match self.outcomes.lock() {
            Ok(mut queue) => queue.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        };
        Ok(next.unwrap_or(InterventionOutcome::Pass))
    }
}

/// Awaits outcomes produced elsewhere (a UI task, a web handler).
pub struct ChannelIntervention {
    receiver: tokio::sync::Mutex<mpsc::Receiver<InterventionOutcome>>,
}

impl ChannelIntervention {
    /// Create the channel and the sender half used to answer it.
    pub fn pair(buffer: usize) -> (Self, mpsc::Sender<InterventionOutcome>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (
            Self {
                receiver: tokio::sync::Mutex::new(rx),
            },
            tx,
        )
    }
}

#[async_trait]
impl InterventionChannel for ChannelIntervention {
    async fn request(
        &self,
        _prompt: &InterventionPrompt,
    ) -> Result<InterventionOutcome, InterventionChannelError> {
        let mut receiver = self.receiver.lock().await;
        receiver.recv().await.ok_or(InterventionChannelError::Closed)
    }
}
