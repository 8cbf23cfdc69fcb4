//! Infrastructure layer for mdt-consult
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, plus configuration file loading.

pub mod agents;
pub mod config;
pub mod storage;

// Re-export commonly used types
#[cfg(feature = "chat-completions")]
pub use agents::ChatCompletionsAgent;
pub use agents::{RegistryError, ScriptedAgent, StaticAgentRegistry};
pub use config::{
    ConfigLoader, ConfigValidationError, FileAgentConfig, FileConfig, FileOutputConfig,
};
pub use storage::JsonlSessionStore;
