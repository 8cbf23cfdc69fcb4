//! Round scheduler
//!
//! Drives one [`DiscussionSession`] through its state machine:
//!
//! ```text
//! Created ─► Running ─► round k: dispatch agents ─► consistency check ─► record
//!               ▲                                                          │
//!               │          (intervention enabled)                          ▼
//!               └──── Running ◄── PausedForIntervention ◄──────── offer gate
//!
//! budget exhausted ─► Completed ─► synthesis
//! terminate/cancel ─► Terminated ─► synthesis (unless disabled)
//! whole round failed ─► Failed (no report)
//! ```
//!
//! The scheduler exclusively owns its session for the duration of
//! [`run`](RoundScheduler::run); observers read [`SessionSnapshot`]s from
//! [`subscribe`](RoundScheduler::subscribe). Every session mutation is
//! appended to the [`SessionStore`] as it happens.
//!
//! # Policies
//!
//! | Concern | Policy |
//! |---------|--------|
//! | Ordering | completion order, or configured agent order with `RoundOrdering::Dispatch` |
//! | Cancellation | stop dispatching; in-flight calls get `drain_grace`, then are abandoned as gaps |
//! | Escalation | a regular round where every dispatched call failed moves to `Failed` |
//! | Follow-ups | after a question the gate is re-offered, up to `max_follow_ups_per_pause` |

use crate::config::EngineParams;
use crate::ports::agent_capability::{AgentCatalog, InvocationContext};
use crate::ports::intervention_channel::{
    InterventionChannel, InterventionPrompt, NoIntervention,
};
use crate::ports::progress::{DiscussionProgress, NoProgress};
use crate::ports::session_store::{NoSessionStore, SessionStore, StoreError};
use crate::use_cases::agent_invoker::{AgentInvoker, InvocationError};
use crate::use_cases::intervention_gate::{GateDecision, InterventionGate};
use crate::use_cases::session_lock::SessionLocks;
use chrono::Utc;
use mdt_domain::{
    AgentId, CaseRecord, ConsensusReport, ConsistencyChecker, DecisionSynthesizer,
    DiscussionConfig, DiscussionSession, DomainError, GapReason, InterventionAction,
    InterventionOutcome, InvocationGap, RoundOrdering, SessionEvent, SessionId, SessionSnapshot,
    SessionState, StatementDraft, StatementKind, SynthesisError,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

/// Errors that stop the scheduler itself.
///
/// Per-agent failures never show up here; they are recorded in the
/// transcript as failed placeholders or gaps.
#[derive(Error, Debug)]
pub enum DiscussionError {
    #[error("Session {0} is already being advanced by another scheduler")]
    SessionBusy(SessionId),

    #[error("Session {id} is already {state}")]
    AlreadyFinished { id: SessionId, state: SessionState },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Session store error: {0}")]
    Store(#[from] StoreError),
}

/// A finished run.
#[derive(Debug)]
pub struct DiscussionOutcome {
    pub session: DiscussionSession,
    /// Set when the session ended in a reportable state but synthesis failed
    pub synthesis_error: Option<SynthesisError>,
}

impl DiscussionOutcome {
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn report(&self) -> Option<&ConsensusReport> {
        self.session.report()
    }
}

/// How a round (or a pause) ended.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Flow {
    Continue,
    Skip,
    Terminate(String),
    Fail(String),
}

/// Counts from one dispatch batch.
#[derive(Debug, Default, Clone, Copy)]
struct DispatchSummary {
    dispatched: usize,
    delivered: usize,
    cancelled: bool,
}

impl DispatchSummary {
    fn absorb(&mut self, other: DispatchSummary) {
        self.dispatched += other.dispatched;
        self.delivered += other.delivered;
        self.cancelled |= other.cancelled;
    }
}

// ==================== Session Lifecycle ====================

/// Create a new session with a generated id and persist its first event.
pub fn open_session(
    case: CaseRecord,
    agents: Vec<AgentId>,
    config: DiscussionConfig,
    store: &dyn SessionStore,
) -> Result<DiscussionSession, DiscussionError> {
    let id = SessionId::new(uuid::Uuid::new_v4().to_string());
    let (session, created) = DiscussionSession::create(id, case, agents, config)?;
    store.append_event(session.id(), &created)?;
    info!("Opened session {}", session.id());
    Ok(session)
}

/// Rebuild a stored session for resumption.
pub fn load_session(
    store: &dyn SessionStore,
    id: &SessionId,
) -> Result<DiscussionSession, DiscussionError> {
    let events = store.load_events(id)?;
    let session = DiscussionSession::replay(events)?;
    info!(
        "Loaded session {} at round {} ({})",
        session.id(),
        session.round(),
        session.state()
    );
    Ok(session)
}

// ==================== Scheduler ====================

pub struct RoundScheduler {
    session: DiscussionSession,
    catalog: Arc<dyn AgentCatalog>,
    checker: ConsistencyChecker,
    channel: Arc<dyn InterventionChannel>,
    store: Arc<dyn SessionStore>,
    progress: Arc<dyn DiscussionProgress>,
    locks: SessionLocks,
    params: EngineParams,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl RoundScheduler {
    pub fn new(session: DiscussionSession, catalog: Arc<dyn AgentCatalog>) -> Self {
        let (snapshot_tx, _) = watch::channel(session.snapshot());
        Self {
            session,
            catalog,
            checker: ConsistencyChecker::default(),
            channel: Arc::new(NoIntervention),
            store: Arc::new(NoSessionStore),
            progress: Arc::new(NoProgress),
            locks: SessionLocks::global(),
            params: EngineParams::default(),
            snapshot_tx,
        }
    }

    // ==================== Builder Methods ====================

    pub fn with_checker(mut self, checker: ConsistencyChecker) -> Self {
        self.checker = checker;
        self
    }

    pub fn with_intervention(mut self, channel: Arc<dyn InterventionChannel>) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn DiscussionProgress>) -> Self {
        self.progress = progress;
        self
    }

    /// Use a separate lock registry instead of the process-wide one.
    pub fn with_locks(mut self, locks: SessionLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn with_params(mut self, params: EngineParams) -> Self {
        self.params = params;
        self
    }

    // ==================== Accessors ====================

    pub fn session(&self) -> &DiscussionSession {
        &self.session
    }

    /// Read-only status feed, updated after every recorded event.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    // ==================== Execution ====================

    /// Run the session to a terminal state.
    ///
    /// A session loaded mid-way continues with its next round; a pending
    /// pause is treated as "no intervention".
    pub async fn run(mut self, cancel: CancellationToken) -> Result<DiscussionOutcome, DiscussionError> {
        let span = info_span!("discussion", session_id = %self.session.id());
        async move {
            let id = self.session.id().clone();
            let _guard = self
                .locks
                .try_acquire(&id)
                .ok_or_else(|| DiscussionError::SessionBusy(id.clone()))?;
            match self.store.claim(&id) {
                Ok(()) => {}
                Err(StoreError::Claimed(_, holder)) => {
                    warn!("Session {} is claimed in the store: {}", id, holder);
                    return Err(DiscussionError::SessionBusy(id));
                }
                Err(e) => return Err(e.into()),
            }

            let driven = self.drive(&cancel).await;
            self.store.release(&id);
            let synthesis_error = driven?;
            Ok(DiscussionOutcome {
                session: self.session,
                synthesis_error,
            })
        }
        .instrument(span)
        .await
    }

    async fn drive(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Option<SynthesisError>, DiscussionError> {
        match self.session.state() {
            SessionState::Created => self.transition(SessionState::Running, "discussion started")?,
            SessionState::PausedForIntervention => self.transition(
                SessionState::Running,
                "resumed; pending intervention treated as pass",
            )?,
            SessionState::Running => info!("Resuming after round {}", self.session.round()),
            state => {
                return Err(DiscussionError::AlreadyFinished {
                    id: self.session.id().clone(),
                    state,
                });
            }
        }

        let end = loop {
            if cancel.is_cancelled() {
                break Flow::Terminate("cancelled before next round".to_string());
            }
            if !self.session.has_rounds_left() {
                break Flow::Continue;
            }
            match self.run_round(cancel).await? {
                Flow::Continue | Flow::Skip => continue,
                other => break other,
            }
        };

        match end {
            Flow::Continue | Flow::Skip => {
                self.transition(SessionState::Completed, "round budget exhausted")?;
                self.synthesize()
            }
            Flow::Terminate(reason) => {
                self.transition(SessionState::Terminated, reason)?;
                if self.session.config().synthesize_on_terminate {
                    self.synthesize()
                } else {
                    info!("Synthesis on termination disabled");
                    Ok(None)
                }
            }
            Flow::Fail(reason) => {
                warn!("Session failed: {}", reason);
                self.transition(SessionState::Failed, reason)?;
                Ok(None)
            }
        }
    }

    async fn run_round(&mut self, cancel: &CancellationToken) -> Result<Flow, DiscussionError> {
        let event = self.session.begin_round()?;
        self.persist(&event)?;

        let round = self.session.round();
        let agents = self.session.agents().to_vec();
        info!(
            round,
            "Round {} of {} with {} agents",
            round,
            self.session.config().max_rounds,
            agents.len()
        );
        self.progress
            .on_round_start(round, self.session.config().max_rounds, agents.len());

        let flow = if self.session.config().intervenes_per_statement() {
            self.sequential_round(agents, cancel).await?
        } else {
            let summary = self
                .dispatch(agents, StatementKind::Regular, None, cancel)
                .await?;
            if summary.cancelled {
                Flow::Terminate(format!("cancelled during round {}", round))
            } else if let Some(failed) = Self::escalation(round, &summary) {
                failed
            } else if self.session.config().intervention_enabled {
                self.intervene(None, cancel).await?
            } else {
                Flow::Continue
            }
        };

        self.progress.on_round_complete(round);
        Ok(flow)
    }

    /// One agent at a time, with the gate offered after every turn.
    async fn sequential_round(
        &mut self,
        agents: Vec<AgentId>,
        cancel: &CancellationToken,
    ) -> Result<Flow, DiscussionError> {
        let round = self.session.round();
        let mut total = DispatchSummary::default();

        for agent in agents {
            if cancel.is_cancelled() {
                total.cancelled = true;
                break;
            }
            let summary = self
                .dispatch(vec![agent.clone()], StatementKind::Regular, None, cancel)
                .await?;
            total.absorb(summary);
            if summary.cancelled {
                break;
            }

            match self.intervene(Some(agent), cancel).await? {
                Flow::Continue => {}
                Flow::Skip => {
                    info!("Remaining agents of round {} skipped", round);
                    return Ok(Flow::Skip);
                }
                other => return Ok(other),
            }
        }

        if total.cancelled {
            return Ok(Flow::Terminate(format!("cancelled during round {}", round)));
        }
        Ok(Self::escalation(round, &total).unwrap_or(Flow::Continue))
    }

    fn escalation(round: u32, summary: &DispatchSummary) -> Option<Flow> {
        (summary.dispatched > 0 && summary.delivered == 0).then(|| {
            Flow::Fail(format!(
                "no agent delivered a statement in round {} ({} dispatched)",
                round, summary.dispatched
            ))
        })
    }

    /// Invoke `agents` with bounded concurrency and record every outcome.
    async fn dispatch(
        &mut self,
        agents: Vec<AgentId>,
        kind: StatementKind,
        prompt: Option<String>,
        cancel: &CancellationToken,
    ) -> Result<DispatchSummary, DiscussionError> {
        let mut summary = DispatchSummary::default();
        let limit = self.session.config().effective_concurrency();
        let ordering = self.session.config().ordering;
        let context = Arc::new(InvocationContext::from_session(&self.session, kind, prompt));
        let invoker = AgentInvoker::new(self.catalog.clone(), self.session.config().per_call_timeout)
            .with_params(&self.params);

        let mut queue = agents.into_iter().enumerate();
        let mut in_flight: BTreeMap<usize, AgentId> = BTreeMap::new();
        let mut buffered: BTreeMap<usize, Result<StatementDraft, InvocationError>> = BTreeMap::new();
        let mut join_set = JoinSet::new();
        let mut dispatch_open = true;
        let mut drain_deadline: Option<Instant> = None;
        let mut abandoned = false;

        loop {
            while dispatch_open && join_set.len() < limit {
                if cancel.is_cancelled() {
                    summary.cancelled = true;
                    dispatch_open = false;
                    break;
                }
                let Some((index, agent)) = queue.next() else {
                    dispatch_open = false;
                    break;
                };

                debug!("Dispatching {} ({:?})", agent, kind);
                self.progress.on_invocation_start(&agent);
                in_flight.insert(index, agent.clone());
                summary.dispatched += 1;

                let invoker = invoker.clone();
                let context = Arc::clone(&context);
                join_set.spawn(async move {
                    let result = invoker.invoke(&agent, &context).await;
                    (index, result)
                });
            }

            if join_set.is_empty() {
                break;
            }

            let joined = if abandoned {
                join_set.join_next().await
            } else if let Some(deadline) = drain_deadline {
                tokio::select! {
                    biased;
                    joined = join_set.join_next() => joined,
                    _ = tokio::time::sleep_until(deadline) => {
                        warn!("Drain grace elapsed, abandoning {} invocation(s)", join_set.len());
                        join_set.abort_all();
                        abandoned = true;
                        continue;
                    }
                }
            } else {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        info!(
                            "Cancellation requested, draining {} in-flight invocation(s)",
                            join_set.len()
                        );
                        summary.cancelled = true;
                        dispatch_open = false;
                        drain_deadline = Some(Instant::now() + self.params.drain_grace);
                        continue;
                    }
                    joined = join_set.join_next() => joined,
                }
            };

            match joined {
                Some(Ok((index, result))) => {
                    in_flight.remove(&index);
                    match ordering {
                        RoundOrdering::Completion => {
                            self.record_result(kind, result, &mut summary)?
                        }
                        RoundOrdering::Dispatch => {
                            buffered.insert(index, result);
                        }
                    }
                }
                Some(Err(e)) if e.is_cancelled() => debug!("Invocation abandoned"),
                Some(Err(e)) => warn!("Invocation task failed: {}", e),
                None => break,
            }
        }

        for (_, result) in buffered {
            self.record_result(kind, result, &mut summary)?;
        }

        for (_, agent) in in_flight {
            if summary.cancelled {
                let gap = InvocationGap::new(
                    agent,
                    GapReason::Cancelled,
                    "abandoned after cancellation drain grace",
                );
                self.record_gap(gap)?;
            } else {
                let draft = StatementDraft::failed(agent, kind, "invocation task aborted", 1);
                self.record_statement(draft)?;
            }
        }

        Ok(summary)
    }

    fn record_result(
        &mut self,
        kind: StatementKind,
        result: Result<StatementDraft, InvocationError>,
        summary: &mut DispatchSummary,
    ) -> Result<(), DiscussionError> {
        match result {
            Ok(draft) => {
                summary.delivered += 1;
                let draft = self.checker.annotate(draft, self.session.transcript());
                if !draft.flags.is_clear() {
                    info!(
                        "Statement by {} flagged: {} contradiction(s), {} low-confidence note(s)",
                        draft.agent,
                        draft.flags.contradicts.len(),
                        draft.flags.low_confidence.len()
                    );
                }
                self.record_statement(draft)
            }
            Err(InvocationError::AgentInvocation {
                agent,
                attempts,
                source,
                round,
            }) => {
                warn!(
                    "Agent {} gave no statement in round {} after {} attempt(s): {}",
                    agent, round, attempts, source
                );
                let draft = StatementDraft::failed(agent, kind, source.to_string(), attempts);
                self.record_statement(draft)
            }
            Err(InvocationError::AgentNotFound { agent, round }) => {
                warn!("Agent {} not found in round {}, skipping", agent, round);
                self.record_gap(InvocationGap::new(
                    agent,
                    GapReason::NotFound,
                    "not registered in the agent catalog",
                ))
            }
        }
    }

    // ==================== Intervention ====================

    /// Offer the gate until the human passes, acts, or the follow-up budget
    /// is used up.
    async fn intervene(
        &mut self,
        last_speaker: Option<AgentId>,
        cancel: &CancellationToken,
    ) -> Result<Flow, DiscussionError> {
        let gate = InterventionGate::new(self.channel.clone(), self.params.intervention_timeout);
        let mut offers_left = self.params.max_follow_ups_per_pause;

        loop {
            if self.session.state() != SessionState::PausedForIntervention {
                self.transition(SessionState::PausedForIntervention, "awaiting intervention")?;
            }

            let prompt = self.prompt(last_speaker.clone(), offers_left);
            let action = match gate.offer(&prompt, cancel).await {
                GateDecision::Cancelled => {
                    return Ok(Flow::Terminate(
                        "cancelled while awaiting intervention".to_string(),
                    ));
                }
                GateDecision::ChannelFailed(e) => {
                    warn!("Intervention channel unavailable, continuing: {}", e);
                    self.progress.on_channel_failed(&e.to_string());
                    self.transition(SessionState::Running, "intervention channel unavailable")?;
                    return Ok(Flow::Continue);
                }
                GateDecision::Outcome(InterventionOutcome::Pass) => {
                    self.transition(SessionState::Running, "no intervention")?;
                    return Ok(Flow::Continue);
                }
                GateDecision::Outcome(InterventionOutcome::TimedOut) => {
                    self.transition(SessionState::Running, "intervention timed out")?;
                    return Ok(Flow::Continue);
                }
                GateDecision::Outcome(InterventionOutcome::Act(action)) => action,
            };

            let action = match InterventionGate::validate(action, &self.session) {
                Ok(action) => action,
                Err(rejected) => {
                    warn!("Intervention rejected: {}", rejected);
                    self.progress.on_intervention_rejected(&rejected.to_string());
                    offers_left = offers_left.saturating_sub(1);
                    if offers_left == 0 {
                        self.transition(SessionState::Running, "intervention offers exhausted")?;
                        return Ok(Flow::Continue);
                    }
                    continue;
                }
            };

            let event = self.session.record_intervention(&action)?;
            if let SessionEvent::InterventionRecorded { event: recorded } = &event {
                info!("Intervention applied: {}", recorded.kind);
                self.progress.on_intervention(recorded);
            }
            self.persist(&event)?;

            let (targets, prompt) = match action {
                InterventionAction::Terminate => {
                    return Ok(Flow::Terminate("terminated by user".to_string()));
                }
                InterventionAction::SkipRound => {
                    self.transition(SessionState::Running, "round skipped")?;
                    return Ok(Flow::Skip);
                }
                InterventionAction::SupplyInfo { .. } => {
                    self.transition(SessionState::Running, "information supplied")?;
                    return Ok(Flow::Continue);
                }
                InterventionAction::QuestionOne { target, prompt } => (vec![target], prompt),
                InterventionAction::QuestionAll { prompt } => (self.session.agents().to_vec(), prompt),
            };

            self.transition(SessionState::Running, "follow-up question")?;
            self.progress
                .on_follow_up_start(self.session.round(), targets.len());
            let summary = self
                .dispatch(targets, StatementKind::FollowUp, Some(prompt), cancel)
                .await?;
            if summary.cancelled {
                return Ok(Flow::Terminate(
                    "cancelled during follow-up questions".to_string(),
                ));
            }

            offers_left = offers_left.saturating_sub(1);
            if offers_left == 0 {
                debug!("Follow-up budget for this pause used up");
                return Ok(Flow::Continue);
            }
        }
    }

    fn prompt(&self, last_speaker: Option<AgentId>, follow_ups_left: usize) -> InterventionPrompt {
        let flagged = self
            .session
            .current_turn()
            .map(|turn| {
                turn.statements()
                    .iter()
                    .filter(|s| !s.flags().is_clear())
                    .map(|s| s.id().to_string())
                    .collect()
            })
            .unwrap_or_default();

        InterventionPrompt {
            session_id: self.session.id().clone(),
            round: self.session.round(),
            max_rounds: self.session.config().max_rounds,
            agents: self.session.agents().to_vec(),
            last_speaker,
            flagged,
            follow_ups_left,
        }
    }

    // ==================== Recording ====================

    fn transition(
        &mut self,
        to: SessionState,
        reason: impl Into<String>,
    ) -> Result<(), DiscussionError> {
        let from = self.session.state();
        let event = self.session.transition(to, reason)?;
        debug!("Session {} -> {}", from, to);
        self.progress.on_state_change(from, to);
        self.persist(&event)
    }

    fn record_statement(&mut self, draft: StatementDraft) -> Result<(), DiscussionError> {
        let event = self.session.record_statement(draft)?;
        if let SessionEvent::StatementRecorded { statement } = &event {
            debug!("Recorded {} from {}", statement.id(), statement.agent());
            self.progress.on_statement(statement);
        }
        self.persist(&event)
    }

    fn record_gap(&mut self, gap: InvocationGap) -> Result<(), DiscussionError> {
        let round = self.session.round();
        self.progress.on_gap(round, &gap);
        let event = self.session.record_gap(gap)?;
        self.persist(&event)
    }

    fn persist(&mut self, event: &SessionEvent) -> Result<(), DiscussionError> {
        self.store.append_event(self.session.id(), event)?;
        self.snapshot_tx
            .send_replace(self.session.snapshot().with_last_event(event.describe()));
        Ok(())
    }

    fn synthesize(&mut self) -> Result<Option<SynthesisError>, DiscussionError> {
        let synthesizer = DecisionSynthesizer::new(self.session.config().tie_break);
        match synthesizer.synthesize_report(self.session.transcript(), Utc::now()) {
            Ok(report) => {
                info!(
                    "Consensus: {} ({} dissenting)",
                    report.primary_recommendation().unwrap_or("none declared"),
                    report.dissent().len()
                );
                self.store.save_report(self.session.id(), &report)?;
                let event = self.session.attach_report(report)?;
                self.persist(&event)?;
                Ok(None)
            }
            Err(e) => {
                warn!("Synthesis failed: {}", e);
                self.progress.on_synthesis_failed(&e.to_string());
                Ok(Some(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::agent_capability::{AgentCapability, CapabilityError};
    use crate::ports::intervention_channel::ScriptedIntervention;
    use crate::ports::session_store::InMemorySessionStore;
    use async_trait::async_trait;
    use mdt_domain::{
        AgentProfile, ClaimKind, ExclusivityRule, InterventionCadence, StatementId,
        StatementStatus,
    };
    use crate::ports::intervention_channel::ChannelIntervention;
    use mdt_domain::Statement;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::time::Duration;

    // ==================== Test Doubles ====================

    #[derive(Clone)]
    enum Behavior {
        Say(&'static str),
        SayAfter(Duration, &'static str),
        Fail,
        Hang,
    }

    struct Speaker {
        profile: AgentProfile,
        behavior: Behavior,
        calls: AtomicU32,
    }

    #[async_trait]
    impl AgentCapability for Speaker {
        fn profile(&self) -> &AgentProfile {
            &self.profile
        }

        async fn speak(&self, context: &InvocationContext) -> Result<String, CapabilityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let text = match &self.behavior {
                Behavior::Say(text) => *text,
                Behavior::SayAfter(delay, text) => {
                    tokio::time::sleep(*delay).await;
                    *text
                }
                Behavior::Fail => {
                    return Err(CapabilityError::ConnectionError("refused".to_string()));
                }
                Behavior::Hang => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
            };
            match &context.prompt {
                Some(question) => Ok(format!("{} (answering: {})", text, question)),
                None => Ok(format!("{} [round {}]", text, context.round)),
            }
        }
    }

    #[derive(Default)]
    struct Panel {
        speakers: HashMap<AgentId, Arc<Speaker>>,
        order: Vec<AgentId>,
    }

    impl Panel {
        fn with(mut self, id: &str, behavior: Behavior) -> Self {
            let agent = AgentId::from(id);
            self.speakers.insert(
                agent.clone(),
                Arc::new(Speaker {
                    profile: AgentProfile::new(id, id),
                    behavior,
                    calls: AtomicU32::new(0),
                }),
            );
            self.order.push(agent);
            self
        }

        fn calls(&self, id: &str) -> u32 {
            self.speakers[&AgentId::from(id)].calls.load(Ordering::SeqCst)
        }
    }

    impl AgentCatalog for Panel {
        fn resolve(&self, agent: &AgentId) -> Option<Arc<dyn AgentCapability>> {
            self.speakers
                .get(agent)
                .map(|s| s.clone() as Arc<dyn AgentCapability>)
        }

        fn agent_ids(&self) -> Vec<AgentId> {
            self.order.clone()
        }
    }

    /// One capability behind every agent id, tracking concurrent calls.
    struct Gauge {
        profile: AgentProfile,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AgentCapability for Gauge {
        fn profile(&self) -> &AgentProfile {
            &self.profile
        }

        async fn speak(&self, _context: &InvocationContext) -> Result<String, CapabilityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(1)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok("Recommendation: diuresis".to_string())
        }
    }

    struct GaugePanel(Arc<Gauge>);

    impl AgentCatalog for GaugePanel {
        fn resolve(&self, _agent: &AgentId) -> Option<Arc<dyn AgentCapability>> {
            Some(self.0.clone() as Arc<dyn AgentCapability>)
        }

        fn agent_ids(&self) -> Vec<AgentId> {
            Vec::new()
        }
    }

    #[derive(Default)]
    struct Recorder {
        channel_failures: Mutex<Vec<String>>,
    }

    impl DiscussionProgress for Recorder {
        fn on_round_start(&self, _round: u32, _max_rounds: u32, _agents: usize) {}
        fn on_statement(&self, _statement: &Statement) {}
        fn on_round_complete(&self, _round: u32) {}

        fn on_channel_failed(&self, reason: &str) {
            self.channel_failures.lock().unwrap().push(reason.to_string());
        }
    }

    fn case() -> CaseRecord {
        CaseRecord::new(
            "Progressive dyspnoea",
            "Ischaemic cardiomyopathy, CKD 3b",
            "EF 30%, creatinine 2.4",
            "Optimal volume management?",
        )
        .unwrap()
    }

    fn config(rounds: u32) -> DiscussionConfig {
        DiscussionConfig::default()
            .with_max_rounds(rounds)
            .with_ordering(RoundOrdering::Dispatch)
    }

    fn fast_params() -> EngineParams {
        EngineParams::default()
            .with_retry_backoff(Duration::ZERO)
            .with_drain_grace(Duration::from_secs(2))
    }

    fn scheduler(
        panel: Arc<dyn AgentCatalog>,
        agents: &[&str],
        config: DiscussionConfig,
        store: Arc<InMemorySessionStore>,
    ) -> RoundScheduler {
        let agents = agents.iter().map(|a| AgentId::from(*a)).collect();
        let session = open_session(case(), agents, config, store.as_ref()).unwrap();
        RoundScheduler::new(session, panel)
            .with_store(store)
            .with_params(fast_params())
    }

    fn transcript_pairs(session: &DiscussionSession) -> Vec<(String, u32)> {
        session
            .transcript()
            .statements()
            .map(|s| (s.agent().to_string(), s.round()))
            .collect()
    }

    fn act(action: InterventionAction) -> InterventionOutcome {
        InterventionOutcome::Act(action)
    }

    // ==================== Scenarios ====================

    #[tokio::test]
    async fn scenario_a_two_agents_two_rounds_complete() {
        let panel = Arc::new(
            Panel::default()
                .with("cardio", Behavior::Say("Recommendation: diuresis"))
                .with("renal", Behavior::Say("Recommendation: diuresis")),
        );
        let store = Arc::new(InMemorySessionStore::new());
        let outcome = scheduler(panel, &["cardio", "renal"], config(2), store.clone())
            .run(CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.state(), SessionState::Completed);
        assert_eq!(
            transcript_pairs(&outcome.session),
            vec![
                ("cardio".to_string(), 1),
                ("renal".to_string(), 1),
                ("cardio".to_string(), 2),
                ("renal".to_string(), 2),
            ]
        );
        let report = outcome.report().unwrap();
        assert_eq!(report.primary_recommendation(), Some("diuresis"));
        assert!(report.dissent().is_empty());
        assert!(store.report(outcome.session.id()).is_some());
    }

    #[tokio::test]
    async fn scenario_b_terminate_after_round_one() {
        let panel = Arc::new(
            Panel::default()
                .with("cardio", Behavior::Say("Recommendation: diuresis"))
                .with("renal", Behavior::Say("Recommendation: dialysis")),
        );
        let channel = Arc::new(ScriptedIntervention::new([act(InterventionAction::Terminate)]));
        let outcome = scheduler(
            panel.clone(),
            &["cardio", "renal"],
            config(2).with_intervention(true),
            Arc::new(InMemorySessionStore::new()),
        )
        .with_intervention(channel)
        .run(CancellationToken::new())
        .await
        .unwrap();

        assert_eq!(outcome.state(), SessionState::Terminated);
        assert_eq!(outcome.session.transcript().statements().count(), 2);
        assert!(outcome.session.transcript().statements().all(|s| s.round() == 1));
        assert_eq!(panel.calls("cardio"), 1);

        let report = outcome.report().unwrap();
        assert_eq!(report.content.metrics.delivered_statements, 2);
        assert_eq!(report.content.votes_cast, 2);
        assert_eq!(report.content.metrics.interventions.get("terminate"), Some(&1));
    }

    #[tokio::test]
    async fn scenario_b_without_synthesis_on_terminate() {
        let panel = Arc::new(Panel::default().with("cardio", Behavior::Say("Recommendation: x")));
        let channel = Arc::new(ScriptedIntervention::new([act(InterventionAction::Terminate)]));
        let outcome = scheduler(
            panel,
            &["cardio"],
            config(2)
                .with_intervention(true)
                .with_synthesize_on_terminate(false),
            Arc::new(InMemorySessionStore::new()),
        )
        .with_intervention(channel)
        .run(CancellationToken::new())
        .await
        .unwrap();

        assert_eq!(outcome.state(), SessionState::Terminated);
        assert!(outcome.report().is_none());
        assert!(outcome.synthesis_error.is_none());
    }

    #[tokio::test]
    async fn scenario_c_exclusive_diagnoses_link_both_ways() {
        let panel = Arc::new(
            Panel::default()
                .with("cardio", Behavior::Say("Diagnosis: cardiorenal syndrome"))
                .with("renal", Behavior::Say("Diagnosis: primary renal disease")),
        );
        let checker = ConsistencyChecker::new(vec![ExclusivityRule::new(
            "dyspnoea-origin",
            ClaimKind::Diagnosis,
            ["cardiorenal syndrome", "primary renal disease"],
        )])
        .unwrap();
        let outcome = scheduler(
            panel,
            &["cardio", "renal"],
            config(1),
            Arc::new(InMemorySessionStore::new()),
        )
        .with_checker(checker)
        .run(CancellationToken::new())
        .await
        .unwrap();

        let statements: Vec<_> = outcome.session.transcript().statements().collect();
        assert_eq!(statements.len(), 2);
        assert!(statements[0].flags().contradicts.contains(&statements[1].id()));
        assert!(statements[1].flags().contradicts.contains(&statements[0].id()));
        assert_eq!(outcome.report().unwrap().content.metrics.contradiction_links, 1);
    }

    #[tokio::test]
    async fn scenario_d_question_one_after_round() {
        let panel = Arc::new(
            Panel::default()
                .with("cardio", Behavior::Say("Recommendation: diuresis"))
                .with("renal", Behavior::Say("Recommendation: diuresis")),
        );
        let channel = Arc::new(ScriptedIntervention::new([act(
            InterventionAction::QuestionOne {
                target: "cardio".into(),
                prompt: "Would you accept a creatinine rise?".to_string(),
            },
        )]));
        let outcome = scheduler(
            panel.clone(),
            &["cardio", "renal"],
            config(1).with_intervention(true),
            Arc::new(InMemorySessionStore::new()),
        )
        .with_intervention(channel.clone())
        .run(CancellationToken::new())
        .await
        .unwrap();

        let turn = &outcome.session.turns()[0];
        assert_eq!(turn.count_for(&"cardio".into()), 2);
        assert_eq!(turn.count_for(&"renal".into()), 1);
        let follow_up = &turn.statements()[2];
        assert_eq!(follow_up.agent().as_str(), "cardio");
        assert_eq!(follow_up.kind(), StatementKind::FollowUp);
        assert_eq!(follow_up.id(), StatementId::new(1, 3));
        assert!(follow_up.content().contains("creatinine rise"));
        // Gate re-offered once after the question, then passed
        assert_eq!(channel.offered().len(), 2);
        assert_eq!(outcome.state(), SessionState::Completed);
    }

    #[tokio::test]
    async fn scenario_d_question_one_mid_round() {
        let panel = Arc::new(
            Panel::default()
                .with("cardio", Behavior::Say("Recommendation: diuresis"))
                .with("renal", Behavior::Say("Recommendation: diuresis")),
        );
        let channel = Arc::new(ScriptedIntervention::new([act(
            InterventionAction::QuestionOne {
                target: "cardio".into(),
                prompt: "Target weight?".to_string(),
            },
        )]));
        let outcome = scheduler(
            panel,
            &["cardio", "renal"],
            config(1)
                .with_intervention(true)
                .with_cadence(InterventionCadence::AfterEachStatement),
            Arc::new(InMemorySessionStore::new()),
        )
        .with_intervention(channel)
        .run(CancellationToken::new())
        .await
        .unwrap();

        let kinds: Vec<_> = outcome
            .session
            .transcript()
            .statements()
            .map(|s| (s.agent().to_string(), s.kind()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("cardio".to_string(), StatementKind::Regular),
                ("cardio".to_string(), StatementKind::FollowUp),
                ("renal".to_string(), StatementKind::Regular),
            ]
        );
    }

    #[tokio::test]
    async fn scenario_e_all_agents_fail() {
        let panel = Arc::new(
            Panel::default()
                .with("cardio", Behavior::Fail)
                .with("renal", Behavior::Fail),
        );
        let store = Arc::new(InMemorySessionStore::new());
        let outcome = scheduler(panel.clone(), &["cardio", "renal"], config(2), store.clone())
            .run(CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.state(), SessionState::Failed);
        assert!(outcome.report().is_none());
        assert!(store.report(outcome.session.id()).is_none());
        assert_eq!(outcome.session.round(), 1);

        let statements: Vec<_> = outcome.session.transcript().statements().collect();
        assert_eq!(statements.len(), 2);
        assert!(statements.iter().all(|s| matches!(
            s.status(),
            StatementStatus::Failed { attempts: 3, .. }
        )));
        assert_eq!(panel.calls("cardio"), 3);
    }

    // ==================== Policies ====================

    #[tokio::test]
    async fn test_single_failure_is_isolated() {
        let panel = Arc::new(
            Panel::default()
                .with("cardio", Behavior::Say("Recommendation: diuresis"))
                .with("renal", Behavior::Fail),
        );
        let outcome = scheduler(
            panel,
            &["cardio", "renal", "ghost"],
            config(1),
            Arc::new(InMemorySessionStore::new()),
        )
        .run(CancellationToken::new())
        .await
        .unwrap();

        assert_eq!(outcome.state(), SessionState::Completed);
        let turn = &outcome.session.turns()[0];
        assert_eq!(turn.statements().len(), 2);
        assert_eq!(turn.delivered_count(), 1);
        assert_eq!(turn.gaps().len(), 1);
        assert_eq!(turn.gaps()[0].reason, GapReason::NotFound);
        assert_eq!(outcome.report().unwrap().content.metrics.failed_invocations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_order_with_dense_sequences() {
        let panel = Arc::new(
            Panel::default()
                .with(
                    "cardio",
                    Behavior::SayAfter(Duration::from_secs(5), "Recommendation: diuresis"),
                )
                .with(
                    "renal",
                    Behavior::SayAfter(Duration::from_secs(1), "Recommendation: diuresis"),
                ),
        );
        let outcome = scheduler(
            panel,
            &["cardio", "renal"],
            config(1).with_ordering(RoundOrdering::Completion),
            Arc::new(InMemorySessionStore::new()),
        )
        .run(CancellationToken::new())
        .await
        .unwrap();

        let ids: Vec<_> = outcome
            .session
            .transcript()
            .statements()
            .map(|s| (s.agent().to_string(), s.sequence()))
            .collect();
        assert_eq!(
            ids,
            vec![("renal".to_string(), 1), ("cardio".to_string(), 2)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_drains_then_abandons() {
        let panel = Arc::new(
            Panel::default()
                .with(
                    "cardio",
                    Behavior::SayAfter(Duration::from_secs(2), "Recommendation: diuresis"),
                )
                .with("renal", Behavior::Hang),
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let outcome = scheduler(
            panel,
            &["cardio", "renal"],
            config(3).with_per_call_timeout(Duration::from_secs(600)),
            Arc::new(InMemorySessionStore::new()),
        )
        .run(cancel)
        .await
        .unwrap();

        assert_eq!(outcome.state(), SessionState::Terminated);
        let turn = &outcome.session.turns()[0];
        // cardio finished inside the grace period, renal was abandoned
        assert_eq!(turn.statements().len(), 1);
        assert_eq!(turn.statements()[0].agent().as_str(), "cardio");
        assert_eq!(turn.gaps().len(), 1);
        assert_eq!(turn.gaps()[0].reason, GapReason::Cancelled);
        assert_eq!(outcome.session.round(), 1);
        assert!(outcome.report().is_some());
    }

    #[tokio::test]
    async fn test_skip_round_stops_remaining_agents() {
        let panel = Arc::new(
            Panel::default()
                .with("cardio", Behavior::Say("Recommendation: diuresis"))
                .with("renal", Behavior::Say("Recommendation: diuresis")),
        );
        let channel = Arc::new(ScriptedIntervention::new([act(InterventionAction::SkipRound)]));
        let outcome = scheduler(
            panel,
            &["cardio", "renal"],
            config(2)
                .with_intervention(true)
                .with_cadence(InterventionCadence::AfterEachStatement),
            Arc::new(InMemorySessionStore::new()),
        )
        .with_intervention(channel)
        .run(CancellationToken::new())
        .await
        .unwrap();

        assert_eq!(
            transcript_pairs(&outcome.session),
            vec![
                ("cardio".to_string(), 1),
                ("cardio".to_string(), 2),
                ("renal".to_string(), 2),
            ]
        );
        assert!(outcome.session.turns()[0].is_skipped());
        assert_eq!(outcome.state(), SessionState::Completed);
    }

    #[tokio::test]
    async fn test_supply_info_reaches_later_rounds() {
        let panel = Arc::new(Panel::default().with("cardio", Behavior::Say("Recommendation: x")));
        let channel = Arc::new(ScriptedIntervention::new([act(InterventionAction::SupplyInfo {
            note: "Potassium 6.1".to_string(),
        })]));
        let outcome = scheduler(
            panel,
            &["cardio"],
            config(2).with_intervention(true),
            Arc::new(InMemorySessionStore::new()),
        )
        .with_intervention(channel)
        .run(CancellationToken::new())
        .await
        .unwrap();

        assert_eq!(outcome.session.notes().len(), 1);
        assert_eq!(outcome.session.transcript().statements().count(), 2);
        assert_eq!(outcome.state(), SessionState::Completed);
    }

    #[tokio::test]
    async fn test_rejected_action_is_reoffered() {
        let panel = Arc::new(Panel::default().with("cardio", Behavior::Say("Recommendation: x")));
        let channel = Arc::new(ScriptedIntervention::new([
            act(InterventionAction::QuestionOne {
                target: "ghost".into(),
                prompt: "?".to_string(),
            }),
            act(InterventionAction::Terminate),
        ]));
        let outcome = scheduler(
            panel,
            &["cardio"],
            config(3).with_intervention(true),
            Arc::new(InMemorySessionStore::new()),
        )
        .with_intervention(channel)
        .run(CancellationToken::new())
        .await
        .unwrap();

        assert_eq!(outcome.state(), SessionState::Terminated);
        assert_eq!(outcome.session.interventions().len(), 1);
        assert_eq!(outcome.session.round(), 1);
    }

    #[tokio::test]
    async fn test_busy_session_is_refused() {
        let panel = Arc::new(Panel::default().with("cardio", Behavior::Say("x")));
        let locks = SessionLocks::new();
        let scheduler = scheduler(
            panel,
            &["cardio"],
            config(1),
            Arc::new(InMemorySessionStore::new()),
        )
        .with_locks(locks.clone());

        let _held = locks.try_acquire(scheduler.session().id()).unwrap();
        let err = scheduler.run(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, DiscussionError::SessionBusy(_)));
    }

    #[tokio::test]
    async fn test_resume_continues_with_next_round() {
        let panel = Arc::new(
            Panel::default()
                .with("cardio", Behavior::Say("Recommendation: diuresis"))
                .with("renal", Behavior::Say("Recommendation: diuresis")),
        );
        let store = Arc::new(InMemorySessionStore::new());
        let mut session = open_session(
            case(),
            vec!["cardio".into(), "renal".into()],
            config(2),
            store.as_ref(),
        )
        .unwrap();
        let id = session.id().clone();
        for event in [
            session.transition(SessionState::Running, "start").unwrap(),
            session.begin_round().unwrap(),
            session
                .record_statement(StatementDraft::delivered(
                    "cardio".into(),
                    StatementKind::Regular,
                    "Recommendation: diuresis",
                ))
                .unwrap(),
        ] {
            store.append_event(&id, &event).unwrap();
        }

        let loaded = load_session(store.as_ref(), &id).unwrap();
        assert_eq!(loaded.round(), 1);
        let outcome = RoundScheduler::new(loaded, panel)
            .with_store(store.clone())
            .with_params(fast_params())
            .run(CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.state(), SessionState::Completed);
        assert_eq!(
            transcript_pairs(&outcome.session),
            vec![
                ("cardio".to_string(), 1),
                ("cardio".to_string(), 2),
                ("renal".to_string(), 2),
            ]
        );
        let replayed = load_session(store.as_ref(), &id).unwrap();
        assert_eq!(replayed.state(), SessionState::Completed);
        assert!(replayed.report().is_some());
    }

    #[tokio::test]
    async fn test_finished_session_cannot_run_again() {
        let panel = Arc::new(Panel::default().with("cardio", Behavior::Say("x")));
        let outcome = scheduler(
            panel.clone(),
            &["cardio"],
            config(1),
            Arc::new(InMemorySessionStore::new()),
        )
        .run(CancellationToken::new())
        .await
        .unwrap();

        let err = RoundScheduler::new(outcome.session, panel)
            .run(CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DiscussionError::AlreadyFinished {
                state: SessionState::Completed,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_snapshots_follow_the_session() {
        let panel = Arc::new(Panel::default().with("cardio", Behavior::Say("Recommendation: x")));
        let scheduler = scheduler(
            panel,
            &["cardio"],
            config(1),
            Arc::new(InMemorySessionStore::new()),
        );
        let snapshots = scheduler.subscribe();
        assert_eq!(snapshots.borrow().state, SessionState::Created);

        scheduler.run(CancellationToken::new()).await.unwrap();
        let last = snapshots.borrow().clone();
        assert_eq!(last.state, SessionState::Completed);
        assert_eq!(last.delivered, 1);
        assert!(last.has_report);
        assert_eq!(last.last_event.as_deref(), Some("consensus report attached"));
    }

    #[tokio::test]
    async fn test_synthesis_error_when_nothing_delivered_before_terminate() {
        let panel = Arc::new(Panel::default().with("cardio", Behavior::Say("x")));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = scheduler(
            panel.clone(),
            &["cardio"],
            config(2),
            Arc::new(InMemorySessionStore::new()),
        )
        .run(cancel)
        .await
        .unwrap();

        assert_eq!(outcome.state(), SessionState::Terminated);
        assert_eq!(outcome.synthesis_error, Some(SynthesisError::EmptyTranscript));
        assert!(outcome.report().is_none());
        assert_eq!(panel.calls("cardio"), 0);
    }

    #[tokio::test]
    async fn test_question_all_adds_one_follow_up_per_agent() {
        let panel = Arc::new(
            Panel::default()
                .with("cardio", Behavior::Say("Recommendation: diuresis"))
                .with("renal", Behavior::Say("Recommendation: diuresis"))
                .with("internal", Behavior::Say("Recommendation: diuresis")),
        );
        let channel = Arc::new(ScriptedIntervention::new([act(
            InterventionAction::QuestionAll {
                prompt: "Any objection to diuresis?".to_string(),
            },
        )]));
        let outcome = scheduler(
            panel.clone(),
            &["cardio", "renal", "internal"],
            config(1).with_intervention(true),
            Arc::new(InMemorySessionStore::new()),
        )
        .with_intervention(channel)
        .run(CancellationToken::new())
        .await
        .unwrap();

        assert_eq!(outcome.state(), SessionState::Completed);
        let turn = &outcome.session.turns()[0];
        assert_eq!(turn.statements().len(), 6);
        for agent in ["cardio", "renal", "internal"] {
            let follow_ups = turn
                .statements()
                .iter()
                .filter(|s| s.agent().as_str() == agent && s.kind() == StatementKind::FollowUp)
                .count();
            assert_eq!(follow_ups, 1, "{} follow-ups", agent);
            assert_eq!(panel.calls(agent), 2);
        }
        assert!(turn.statements()[3..]
            .iter()
            .all(|s| s.content().contains("Any objection to diuresis?")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_calls_never_exceed_concurrency_limit() {
        let gauge = Arc::new(Gauge {
            profile: AgentProfile::new("gauge", "Any"),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        });
        let outcome = scheduler(
            Arc::new(GaugePanel(gauge.clone())),
            &["cardio", "renal", "internal", "onco", "pulm"],
            config(1).with_concurrency_limit(2),
            Arc::new(InMemorySessionStore::new()),
        )
        .run(CancellationToken::new())
        .await
        .unwrap();

        assert_eq!(outcome.state(), SessionState::Completed);
        assert_eq!(gauge.calls.load(Ordering::SeqCst), 5);
        assert_eq!(gauge.peak.load(Ordering::SeqCst), 2);
        assert_eq!(outcome.session.turns()[0].delivered_count(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_undispatched_agents() {
        let panel = Arc::new(
            Panel::default()
                .with(
                    "cardio",
                    Behavior::SayAfter(Duration::from_secs(2), "Recommendation: diuresis"),
                )
                .with("renal", Behavior::Say("Recommendation: dialysis"))
                .with("internal", Behavior::Say("Recommendation: dialysis")),
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let outcome = scheduler(
            panel.clone(),
            &["cardio", "renal", "internal"],
            config(2).with_concurrency_limit(1),
            Arc::new(InMemorySessionStore::new()),
        )
        .run(cancel)
        .await
        .unwrap();

        assert_eq!(outcome.state(), SessionState::Terminated);
        assert_eq!(panel.calls("cardio"), 1);
        assert_eq!(panel.calls("renal"), 0);
        assert_eq!(panel.calls("internal"), 0);
        let turn = &outcome.session.turns()[0];
        assert_eq!(turn.statements().len(), 1);
        assert!(turn.gaps().is_empty());
    }

    #[tokio::test]
    async fn test_second_scheduler_on_same_session_is_refused() {
        let panel = Arc::new(
            Panel::default()
                .with("cardio", Behavior::Say("Recommendation: diuresis"))
                .with("renal", Behavior::Say("Recommendation: diuresis")),
        );
        let store = Arc::new(InMemorySessionStore::new());
        let session = open_session(
            case(),
            vec!["cardio".into(), "renal".into()],
            config(2),
            store.as_ref(),
        )
        .unwrap();
        let id = session.id().clone();

        let first = RoundScheduler::new(session.clone(), panel.clone()).with_store(store.clone());
        let second = RoundScheduler::new(session, panel).with_store(store.clone());
        let (a, b) = tokio::join!(
            first.run(CancellationToken::new()),
            second.run(CancellationToken::new())
        );

        let busy = [&a, &b]
            .iter()
            .filter(|r| matches!(r, Err(DiscussionError::SessionBusy(_))))
            .count();
        assert_eq!(busy, 1);
        assert!(a.is_ok() || b.is_ok());

        let replayed = load_session(store.as_ref(), &id).unwrap();
        assert_eq!(replayed.state(), SessionState::Completed);
        assert!(store.claim(&id).is_ok());
    }

    #[tokio::test]
    async fn test_store_claim_refuses_scheduler_with_own_registry() {
        let panel = Arc::new(Panel::default().with("cardio", Behavior::Say("Recommendation: x")));
        let store = Arc::new(InMemorySessionStore::new());
        let session =
            open_session(case(), vec!["cardio".into()], config(1), store.as_ref()).unwrap();
        let id = session.id().clone();

        // A separate registry stands in for another process sharing the store
        store.claim(&id).unwrap();
        let err = RoundScheduler::new(session.clone(), panel.clone())
            .with_store(store.clone())
            .with_locks(SessionLocks::new())
            .run(CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DiscussionError::SessionBusy(_)));
        assert_eq!(store.event_count(&id), 1);

        store.release(&id);
        let outcome = RoundScheduler::new(session, panel)
            .with_store(store.clone())
            .with_locks(SessionLocks::new())
            .run(CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.state(), SessionState::Completed);
    }

    #[tokio::test]
    async fn test_channel_failure_is_reported_and_passed() {
        let panel = Arc::new(Panel::default().with("cardio", Behavior::Say("Recommendation: x")));
        let (channel, tx) = ChannelIntervention::pair(1);
        drop(tx);
        let recorder = Arc::new(Recorder::default());
        let outcome = scheduler(
            panel,
            &["cardio"],
            config(2).with_intervention(true),
            Arc::new(InMemorySessionStore::new()),
        )
        .with_intervention(Arc::new(channel))
        .with_progress(recorder.clone())
        .run(CancellationToken::new())
        .await
        .unwrap();

        assert_eq!(outcome.state(), SessionState::Completed);
        let failures = recorder.channel_failures.lock().unwrap().clone();
        assert_eq!(failures.len(), 2);
        assert!(outcome.session.interventions().is_empty());
    }
}
