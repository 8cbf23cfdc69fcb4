//! Agent invocation with per-call timeout and bounded retry.
//!
//! The invoker knows nothing about rounds beyond the index it reports in
//! errors. It never touches the session: it resolves the agent, calls it,
//! and hands back a fresh [`StatementDraft`] per successful attempt.

use crate::config::EngineParams;
use crate::ports::agent_capability::{AgentCatalog, CapabilityError, InvocationContext};
use mdt_domain::{AgentId, StatementDraft};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Why an agent produced no statement.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvocationError {
    /// Transient failures exhausted the retry bound.
    #[error("agent {agent} failed in round {round} after {attempts} attempt(s): {source}")]
    AgentInvocation {
        agent: AgentId,
        round: u32,
        attempts: u32,
        source: CapabilityError,
    },

    /// The id is not in the catalog. Fatal for this agent only.
    #[error("agent {agent} not found (round {round})")]
    AgentNotFound { agent: AgentId, round: u32 },
}

impl InvocationError {
    pub fn agent(&self) -> &AgentId {
        match self {
            InvocationError::AgentInvocation { agent, .. }
            | InvocationError::AgentNotFound { agent, .. } => agent,
        }
    }

    pub fn round(&self) -> u32 {
        match self {
            InvocationError::AgentInvocation { round, .. }
            | InvocationError::AgentNotFound { round, .. } => *round,
        }
    }
}

/// Invokes agents from a catalog.
#[derive(Clone)]
pub struct AgentInvoker {
    catalog: Arc<dyn AgentCatalog>,
    per_call_timeout: Duration,
    max_attempts: u32,
    retry_backoff: Duration,
}

impl AgentInvoker {
    pub fn new(catalog: Arc<dyn AgentCatalog>, per_call_timeout: Duration) -> Self {
        let params = EngineParams::default();
        Self {
            catalog,
            per_call_timeout,
            max_attempts: params.max_attempts(),
            retry_backoff: params.retry_backoff,
        }
    }

    pub fn with_params(mut self, params: &EngineParams) -> Self {
        self.max_attempts = params.max_attempts();
        self.retry_backoff = params.retry_backoff;
        self
    }

    /// Invoke `agent` once per attempt until it delivers or attempts run out.
    pub async fn invoke(
        &self,
        agent: &AgentId,
        context: &InvocationContext,
    ) -> Result<StatementDraft, InvocationError> {
        let capability =
            self.catalog
                .resolve(agent)
                .ok_or_else(|| InvocationError::AgentNotFound {
                    agent: agent.clone(),
                    round: context.round,
                })?;

        let mut last_error = CapabilityError::Other("no attempt made".to_string());
        for attempt in 1..=self.max_attempts {
            debug!("Invoking {} (round {}, attempt {})", agent, context.round, attempt);

            let result = tokio::time::timeout(self.per_call_timeout, capability.speak(context)).await;
            match result {
                Ok(Ok(text)) if !text.trim().is_empty() => {
                    return Ok(StatementDraft::delivered(agent.clone(), context.kind, text));
                }
                Ok(Ok(_)) => last_error = CapabilityError::EmptyResponse,
                Ok(Err(e)) => last_error = e,
                Err(_) => last_error = CapabilityError::Timeout,
            }

            warn!(
                "Agent {} attempt {}/{} failed in round {}: {}",
                agent, attempt, self.max_attempts, context.round, last_error
            );
            if attempt < self.max_attempts && !self.retry_backoff.is_zero() {
                tokio::time::sleep(self.retry_backoff * attempt).await;
            }
        }

        Err(InvocationError::AgentInvocation {
            agent: agent.clone(),
            round: context.round,
            attempts: self.max_attempts,
            source: last_error,
        })
    }
}
