//! Engine parameters: invocation and intervention loop control.
//!
//! [`EngineParams`] groups the static parameters that control how the
//! [`RoundScheduler`](crate::use_cases::round_scheduler::RoundScheduler)
//! drives a session. Per-session policy (rounds, cadence, tie-break) lives in
//! [`DiscussionConfig`](mdt_domain::DiscussionConfig) instead.
//!
//! | Parameter | Default | Used by |
//! |-----------|---------|---------|
//! | `max_retries` | 2 | AgentInvoker |
//! | `retry_backoff` | 500ms | AgentInvoker |
//! | `intervention_timeout` | 120s | InterventionGate |
//! | `drain_grace` | 2s | RoundScheduler (cancellation) |
//! | `max_follow_ups_per_pause` | 3 | RoundScheduler |

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineParams {
    /// Retries after the first failed attempt (so `2` means up to 3 calls).
    pub max_retries: u32,
    /// Base delay between attempts; attempt `n` waits `n * retry_backoff`.
    pub retry_backoff: Duration,
    /// Bound on the wait for human input. `None` waits indefinitely.
    pub intervention_timeout: Option<Duration>,
    /// How long in-flight invocations may finish after cancellation.
    pub drain_grace: Duration,
    /// Question actions honoured per pause before the gate stops re-offering.
    pub max_follow_ups_per_pause: usize,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_backoff: Duration::from_millis(500),
            intervention_timeout: Some(Duration::from_secs(120)),
            drain_grace: Duration::from_secs(2),
            max_follow_ups_per_pause: 3,
        }
    }
}

impl EngineParams {
    // ==================== Builder Methods ====================

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_intervention_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.intervention_timeout = timeout;
        self
    }

    pub fn with_drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace = grace;
        self
    }

    pub fn with_max_follow_ups_per_pause(mut self, max: usize) -> Self {
        self.max_follow_ups_per_pause = max;
        self
    }

    /// Total invocation attempts per agent turn.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}
