//! The discussion session aggregate.
//!
//! Every mutation goes through [`DiscussionSession::apply`]. Command methods
//! (`transition`, `begin_round`, `record_statement`, ...) build a
//! [`SessionEvent`], apply it, and hand the event back so the caller can
//! persist it. [`DiscussionSession::replay`] runs the same `apply` path over
//! a stored log, so a reloaded session satisfies the same invariants as a
//! live one.

use super::config::DiscussionConfig;
use super::event::SessionEvent;
use super::intervention::{InterventionAction, InterventionEvent, InterventionKind};
use super::snapshot::SessionSnapshot;
use super::state::SessionState;
use super::statement::{Statement, StatementDraft, StatementId};
use super::transcript::Transcript;
use super::turn::{InvocationGap, Turn};
use crate::agent::AgentId;
use crate::case::{CaseRecord, SuppliedNote};
use crate::consensus::ConsensusReport;
use crate::core::error::{DomainError, SessionStateError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Opaque session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One consultation: a case, its participants and the growing transcript.
///
/// Invariants held after every successful `apply`:
/// - `round <= config.max_rounds`
/// - statements are ordered by `(round, sequence)` with no gaps in sequence
/// - every statement, gap and targeted intervention names a participant
/// - a report exists only in `Completed` or `Terminated`, at most once
/// - a terminal session accepts nothing but its report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscussionSession {
    id: SessionId,
    case: CaseRecord,
    agents: Vec<AgentId>,
    config: DiscussionConfig,
    created_at: DateTime<Utc>,
    state: SessionState,
    round: u32,
    turns: Vec<Turn>,
    interventions: Vec<InterventionEvent>,
    notes: Vec<SuppliedNote>,
    report: Option<ConsensusReport>,
}

impl DiscussionSession {
    // ==================== Construction ====================

    /// Validate inputs and open a new session in `Created`.
    pub fn create(
        id: SessionId,
        case: CaseRecord,
        agents: Vec<AgentId>,
        config: DiscussionConfig,
    ) -> Result<(Self, SessionEvent), DomainError> {
        let event = SessionEvent::Created {
            session_id: id,
            case,
            agents,
            config,
            at: Utc::now(),
        };
        let session = Self::from_created(&event)?;
        Ok((session, event))
    }

    /// Rebuild a session from its event log.
    ///
    /// The first event must be `Created`; every later event is re-validated.
    pub fn replay<I>(events: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = SessionEvent>,
    {
        let mut events = events.into_iter();
        let first = events
            .next()
            .ok_or_else(|| DomainError::CorruptEventLog("event log is empty".to_string()))?;
        let mut session = Self::from_created(&first)?;
        for (index, event) in events.enumerate() {
            session.apply(&event).map_err(|e| {
                DomainError::CorruptEventLog(format!(
                    "event {} ({}) rejected: {}",
                    index + 2,
                    event.event_type(),
                    e
                ))
            })?;
        }
        Ok(session)
    }

    fn from_created(event: &SessionEvent) -> Result<Self, DomainError> {
        let SessionEvent::Created {
            session_id,
            case,
            agents,
            config,
            at,
        } = event
        else {
            return Err(DomainError::CorruptEventLog(format!(
                "expected created event, found {}",
                event.event_type()
            )));
        };

        case.validate()?;
        config.validate()?;
        if agents.is_empty() {
            return Err(DomainError::NoAgents);
        }
        let mut seen = BTreeSet::new();
        for agent in agents {
            if !seen.insert(agent) {
                return Err(DomainError::DuplicateAgent(agent.clone()));
            }
        }

        Ok(Self {
            id: session_id.clone(),
            case: case.clone(),
            agents: agents.clone(),
            config: config.clone(),
            created_at: *at,
            state: SessionState::Created,
            round: 0,
            turns: Vec::new(),
            interventions: Vec::new(),
            notes: Vec::new(),
            report: None,
        })
    }

    // ==================== Commands ====================

    /// Move the state machine. Illegal transitions leave the session untouched.
    pub fn transition(
        &mut self,
        to: SessionState,
        reason: impl Into<String>,
    ) -> Result<SessionEvent, DomainError> {
        self.commit(SessionEvent::StateChanged {
            from: self.state,
            to,
            reason: reason.into(),
            at: Utc::now(),
        })
    }

    /// Open the next round.
    pub fn begin_round(&mut self) -> Result<SessionEvent, DomainError> {
        self.commit(SessionEvent::RoundStarted {
            round: self.round + 1,
            at: Utc::now(),
        })
    }

    /// Assign the next `(round, sequence)` to `draft` and append it.
    pub fn record_statement(&mut self, draft: StatementDraft) -> Result<SessionEvent, DomainError> {
        let sequence = self
            .current_turn()
            .map(|t| t.next_sequence())
            .ok_or(SessionStateError::RoundNotStarted)?;
        let statement = Statement::from_draft(StatementId::new(self.round, sequence), draft);
        self.commit(SessionEvent::StatementRecorded { statement })
    }

    /// Log a missing contribution for the current round.
    pub fn record_gap(&mut self, gap: InvocationGap) -> Result<SessionEvent, DomainError> {
        self.commit(SessionEvent::GapRecorded {
            round: self.round,
            gap,
        })
    }

    /// Append an intervention at the current round.
    pub fn record_intervention(
        &mut self,
        action: &InterventionAction,
    ) -> Result<SessionEvent, DomainError> {
        self.commit(SessionEvent::InterventionRecorded {
            event: InterventionEvent::from_action(action, self.round),
        })
    }

    /// Attach the final report. Allowed once, in `Completed` or `Terminated`.
    pub fn attach_report(&mut self, report: ConsensusReport) -> Result<SessionEvent, DomainError> {
        self.commit(SessionEvent::ReportAttached {
            report: Box::new(report),
        })
    }

    fn commit(&mut self, event: SessionEvent) -> Result<SessionEvent, DomainError> {
        self.apply(&event)?;
        Ok(event)
    }

    // ==================== Event Application ====================

    /// Apply one event. On error the session is unchanged.
    pub fn apply(&mut self, event: &SessionEvent) -> Result<(), DomainError> {
        match event {
            SessionEvent::Created { .. } => Err(DomainError::CorruptEventLog(
                "created event after session start".to_string(),
            )),
            SessionEvent::StateChanged { from, to, .. } => {
                if *from != self.state || !self.state.can_transition_to(*to) {
                    return Err(SessionStateError::InvalidTransition {
                        from: self.state,
                        to: *to,
                    }
                    .into());
                }
                self.state = *to;
                Ok(())
            }
            SessionEvent::RoundStarted { round, at } => {
                self.ensure_running("a new round")?;
                if self.round >= self.config.max_rounds {
                    return Err(SessionStateError::RoundLimitReached {
                        max: self.config.max_rounds,
                    }
                    .into());
                }
                if *round != self.round + 1 {
                    return Err(SessionStateError::RoundMismatch {
                        current: self.round,
                        requested: *round,
                    }
                    .into());
                }
                self.round = *round;
                self.turns.push(Turn::new(*round, *at));
                Ok(())
            }
            SessionEvent::StatementRecorded { statement } => self.apply_statement(statement),
            SessionEvent::GapRecorded { round, gap } => {
                self.ensure_running("invocation gaps")?;
                self.ensure_participant(&gap.agent)?;
                self.ensure_current_round(*round)?;
                self.current_turn_mut()?.push_gap(gap.clone());
                Ok(())
            }
            SessionEvent::InterventionRecorded { event } => self.apply_intervention(event),
            SessionEvent::ReportAttached { report } => {
                if self.report.is_some() {
                    return Err(SessionStateError::ReportAlreadyAttached.into());
                }
                if !self.state.allows_report() {
                    return Err(SessionStateError::ReportNotAllowed { state: self.state }.into());
                }
                self.report = Some((**report).clone());
                Ok(())
            }
        }
    }

    fn apply_statement(&mut self, statement: &Statement) -> Result<(), DomainError> {
        self.ensure_running("statements")?;
        self.ensure_participant(statement.agent())?;
        self.ensure_current_round(statement.round())?;

        let expected = self.current_turn_mut()?.next_sequence();
        if statement.sequence() != expected {
            return Err(SessionStateError::SequenceMismatch {
                round: statement.round(),
                expected,
                found: statement.sequence(),
            }
            .into());
        }

        let id = statement.id();
        let targets: Vec<StatementId> = statement.flags().contradicts.iter().copied().collect();
        for target in &targets {
            if *target >= id || self.find_statement(*target).is_none() {
                return Err(DomainError::CorruptEventLog(format!(
                    "statement {} links unknown earlier statement {}",
                    id, target
                )));
            }
        }

        for target in targets {
            if let Some(earlier) = self.find_statement_mut(target) {
                earlier.link_contradiction(id);
            }
        }
        self.current_turn_mut()?.push(statement.clone());
        Ok(())
    }

    fn apply_intervention(&mut self, event: &InterventionEvent) -> Result<(), DomainError> {
        if self.state.is_terminal() {
            return Err(SessionStateError::Terminal {
                state: self.state,
                operation: "interventions",
            }
            .into());
        }
        self.ensure_current_round(event.round)?;
        if let Some(target) = &event.target {
            self.ensure_participant(target)?;
        }

        match event.kind {
            InterventionKind::SupplyInfo => {
                self.notes.push(SuppliedNote {
                    text: event.payload.clone(),
                    round: event.round,
                    supplied_at: event.occurred_at,
                });
            }
            InterventionKind::SkipRound => {
                if let Some(turn) = self.turns.last_mut() {
                    turn.mark_skipped();
                }
            }
            _ => {}
        }
        self.interventions.push(event.clone());
        Ok(())
    }

    // ==================== Guards ====================

    fn ensure_running(&self, operation: &'static str) -> Result<(), DomainError> {
        match self.state {
            SessionState::Running => Ok(()),
            state if state.is_terminal() => {
                Err(SessionStateError::Terminal { state, operation }.into())
            }
            state => Err(SessionStateError::NotRunning { state, operation }.into()),
        }
    }

    fn ensure_participant(&self, agent: &AgentId) -> Result<(), DomainError> {
        if self.has_agent(agent) {
            Ok(())
        } else {
            Err(DomainError::UnknownAgent(agent.clone()))
        }
    }

    fn ensure_current_round(&self, round: u32) -> Result<(), DomainError> {
        if round != self.round {
            return Err(SessionStateError::RoundMismatch {
                current: self.round,
                requested: round,
            }
            .into());
        }
        Ok(())
    }

    fn current_turn_mut(&mut self) -> Result<&mut Turn, DomainError> {
        self.turns
            .last_mut()
            .ok_or_else(|| SessionStateError::RoundNotStarted.into())
    }

    fn find_statement(&self, id: StatementId) -> Option<&Statement> {
        self.transcript().statement(id)
    }

    fn find_statement_mut(&mut self, id: StatementId) -> Option<&mut Statement> {
        self.turns
            .iter_mut()
            .find(|t| t.round() == id.round)
            .and_then(|t| t.statement_mut(id))
    }

    // ==================== Accessors ====================

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn case(&self) -> &CaseRecord {
        &self.case
    }

    pub fn agents(&self) -> &[AgentId] {
        &self.agents
    }

    pub fn has_agent(&self, agent: &AgentId) -> bool {
        self.agents.contains(agent)
    }

    pub fn config(&self) -> &DiscussionConfig {
        &self.config
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Current round index; 0 before the first round.
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Whether another round may still be started.
    pub fn has_rounds_left(&self) -> bool {
        self.round < self.config.max_rounds
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn current_turn(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn interventions(&self) -> &[InterventionEvent] {
        &self.interventions
    }

    pub fn notes(&self) -> &[SuppliedNote] {
        &self.notes
    }

    pub fn report(&self) -> Option<&ConsensusReport> {
        self.report.as_ref()
    }

    pub fn transcript(&self) -> Transcript<'_> {
        Transcript::new(&self.turns, &self.interventions, &self.notes)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::of(self)
    }
}
