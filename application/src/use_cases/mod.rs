//! Use cases
//!
//! Application-level operations that drive the discussion engine.
//!
//! - [`round_scheduler`] - the session state machine
//! - [`agent_invoker`] - timeout and retry around one agent call
//! - [`intervention_gate`] - bounded wait for a human decision
//! - [`session_lock`] - one scheduler per session

pub mod agent_invoker;
pub mod intervention_gate;
pub mod round_scheduler;
pub mod session_lock;
