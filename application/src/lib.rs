//! Application layer for mdt-consult
//!
//! This crate contains the discussion engine use cases, port definitions,
//! and engine parameters. It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::EngineParams;
pub use ports::{
    agent_capability::{
        AgentCapability, AgentCatalog, CapabilityError, InvocationContext, PriorStatement,
    },
    intervention_channel::{
        ChannelIntervention, InterventionChannel, InterventionChannelError, InterventionPrompt,
        NoIntervention, ScriptedIntervention,
    },
    progress::{DiscussionProgress, NoProgress},
    session_store::{InMemorySessionStore, NoSessionStore, SessionStore, StoreError},
};
pub use use_cases::agent_invoker::{AgentInvoker, InvocationError};
pub use use_cases::intervention_gate::{GateDecision, InterventionGate, RejectedAction};
pub use use_cases::round_scheduler::{
    DiscussionError, DiscussionOutcome, RoundScheduler, load_session, open_session,
};
pub use use_cases::session_lock::{SessionGuard, SessionLocks};
