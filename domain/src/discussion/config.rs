//! Per-session discussion configuration.

use crate::consensus::TieBreak;
use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound for `max_rounds`.
pub const MAX_ROUNDS_LIMIT: u32 = 10;

/// When the intervention gate is offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionCadence {
    /// Once after every round
    #[default]
    AfterRound,
    /// After every agent turn; forces sequential dispatch
    AfterEachStatement,
}

impl std::str::FromStr for InterventionCadence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "after_round" | "round" => Ok(InterventionCadence::AfterRound),
            "after_each_statement" | "statement" | "each_statement" => {
                Ok(InterventionCadence::AfterEachStatement)
            }
            _ => Err(format!(
                "Unknown intervention cadence: {}. Valid: after_round, after_each_statement",
                s
            )),
        }
    }
}

/// Order in which concurrently collected statements are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundOrdering {
    /// Record as invocations complete
    #[default]
    Completion,
    /// Buffer and record in the configured agent order
    Dispatch,
}

impl std::str::FromStr for RoundOrdering {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "completion" => Ok(RoundOrdering::Completion),
            "dispatch" => Ok(RoundOrdering::Dispatch),
            _ => Err(format!(
                "Unknown round ordering: {}. Valid: completion, dispatch",
                s
            )),
        }
    }
}

/// Configuration carried by a discussion session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscussionConfig {
    /// Number of rounds to run (1-10)
    pub max_rounds: u32,
    /// Whether the human-intervention gate is offered
    pub intervention_enabled: bool,
    pub intervention_cadence: InterventionCadence,
    /// Bound on a single agent invocation
    pub per_call_timeout: Duration,
    /// Maximum in-flight agent invocations within a round
    pub concurrency_limit: usize,
    pub ordering: RoundOrdering,
    /// Aggregation tie-break rule used by synthesis
    pub tie_break: TieBreak,
    /// Run synthesis on the partial transcript after a user termination
    pub synthesize_on_terminate: bool,
}

impl Default for DiscussionConfig {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            intervention_enabled: false,
            intervention_cadence: InterventionCadence::AfterRound,
            per_call_timeout: Duration::from_secs(60),
            concurrency_limit: 4,
            ordering: RoundOrdering::Completion,
            tie_break: TieBreak::EarliestRound,
            synthesize_on_terminate: true,
        }
    }
}

impl DiscussionConfig {
    // ==================== Builder Methods ====================

    pub fn with_max_rounds(mut self, rounds: u32) -> Self {
        self.max_rounds = rounds;
        self
    }

    pub fn with_intervention(mut self, enabled: bool) -> Self {
        self.intervention_enabled = enabled;
        self
    }

    pub fn with_cadence(mut self, cadence: InterventionCadence) -> Self {
        self.intervention_cadence = cadence;
        self
    }

    pub fn with_per_call_timeout(mut self, timeout: Duration) -> Self {
        self.per_call_timeout = timeout;
        self
    }

    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit;
        self
    }

    pub fn with_ordering(mut self, ordering: RoundOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn with_synthesize_on_terminate(mut self, enabled: bool) -> Self {
        self.synthesize_on_terminate = enabled;
        self
    }

    // ==================== Derived Settings ====================

    /// Whether the gate is offered after every agent turn.
    pub fn intervenes_per_statement(&self) -> bool {
        self.intervention_enabled
            && self.intervention_cadence == InterventionCadence::AfterEachStatement
    }

    /// In-flight invocation bound actually used for regular turns.
    pub fn effective_concurrency(&self) -> usize {
        if self.intervenes_per_statement() {
            1
        } else {
            self.concurrency_limit.max(1)
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.max_rounds == 0 || self.max_rounds > MAX_ROUNDS_LIMIT {
            return Err(DomainError::InvalidConfig(format!(
                "max_rounds must be between 1 and {}, got {}",
                MAX_ROUNDS_LIMIT, self.max_rounds
            )));
        }
        if self.concurrency_limit == 0 {
            return Err(DomainError::InvalidConfig(
                "concurrency_limit must be at least 1".to_string(),
            ));
        }
        if self.per_call_timeout.is_zero() {
            return Err(DomainError::InvalidConfig(
                "per_call_timeout cannot be 0".to_string(),
            ));
        }
        Ok(())
    }
}
