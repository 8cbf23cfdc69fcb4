//! Progress notification port
//!
//! Defines the interface for reporting progress while a discussion runs.

use mdt_domain::{AgentId, InterventionEvent, InvocationGap, SessionState, Statement};

/// Callback for progress updates during a discussion
///
/// Implementations live in the presentation layer and can display
/// progress in various ways (console, web UI, etc.)
pub trait DiscussionProgress: Send + Sync {
    /// Called when a round starts
    fn on_round_start(&self, round: u32, max_rounds: u32, agents: usize);

    /// Called when a statement (delivered or failed) is recorded
    fn on_statement(&self, statement: &Statement);

    /// Called when a round's regular turns and follow-ups are done
    fn on_round_complete(&self, round: u32);

    // ==================== Optional Callbacks ====================

    /// Called when follow-up questions are dispatched
    fn on_follow_up_start(&self, _round: u32, _agents: usize) {}

    /// Called when an agent produced no statement
    fn on_gap(&self, _round: u32, _gap: &InvocationGap) {}

    /// Called when an intervention has been applied
    fn on_intervention(&self, _event: &InterventionEvent) {}

    /// Called when the gate rejects an action (e.g. unknown target)
    fn on_intervention_rejected(&self, _reason: &str) {}

    /// Called when the intervention channel failed and the pause was passed
    fn on_channel_failed(&self, _reason: &str) {}

    /// Called on every state machine transition
    fn on_state_change(&self, _from: SessionState, _to: SessionState) {}

    /// Called when synthesis could not produce a report
    fn on_synthesis_failed(&self, _reason: &str) {}

    /// Called when an agent invocation is dispatched
    fn on_invocation_start(&self, _agent: &AgentId) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl DiscussionProgress for NoProgress {
    fn on_round_start(&self, _round: u32, _max_rounds: u32, _agents: usize) {}
    fn on_statement(&self, _statement: &Statement) {}
    fn on_round_complete(&self, _round: u32) {}
}
