//! Port definitions (interfaces) for external dependencies.
//!
//! Ports define the contracts that infrastructure and presentation adapters
//! must implement. The application layer depends only on these traits.

pub mod agent_capability;
pub mod intervention_channel;
pub mod progress;
pub mod session_store;
