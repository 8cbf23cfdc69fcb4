//! Domain layer for mdt-consult
//!
//! This crate contains the core business logic, entities, and value objects
//! of a multidisciplinary team (MDT) consultation. It has no dependencies on
//! infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Discussion Session
//!
//! A [`DiscussionSession`] runs a clinical [`CaseRecord`] past a panel of
//! specialist agents over a bounded number of rounds:
//!
//! - **Statements**: what each specialist said, ordered by `(round, sequence)`
//! - **Interventions**: questions, notes, skips and terminations by a human
//! - **Session events**: the append-only log every mutation goes through
//!
//! ## Consistency and Consensus
//!
//! - **ConsistencyChecker**: advisory contradiction and confidence flags
//! - **DecisionSynthesizer**: majority aggregation into a [`ConsensusReport`]

pub mod agent;
pub mod case;
pub mod claims;
pub mod config;
pub mod consensus;
pub mod consistency;
pub mod core;
pub mod discussion;
pub mod util;

// Re-export commonly used types
pub use agent::{AgentId, AgentProfile};
pub use case::{CaseRecord, SuppliedNote};
pub use claims::{Claim, ClaimExtraction, ClaimKind, extract_claims};
pub use config::OutputFormat;
pub use consensus::{
    ConsensusReport, DecisionSynthesizer, DiscussionMetrics, DissentingStatement, ReportContent,
    SynthesisError, TieBreak,
};
pub use consistency::{ConsistencyChecker, ExclusivityRule};
pub use core::error::{DomainError, SessionStateError};
pub use discussion::{
    config::{DiscussionConfig, InterventionCadence, MAX_ROUNDS_LIMIT, RoundOrdering},
    event::SessionEvent,
    intervention::{InterventionAction, InterventionEvent, InterventionKind, InterventionOutcome},
    session::{DiscussionSession, SessionId},
    snapshot::SessionSnapshot,
    state::SessionState,
    statement::{
        ConsistencyFlags, Statement, StatementDraft, StatementId, StatementKind, StatementStatus,
    },
    transcript::Transcript,
    turn::{GapReason, InvocationGap, Turn},
};
