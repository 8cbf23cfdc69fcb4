//! Agent capability adapters.
//!
//! - [`ScriptedAgent`] - canned replies, no network
//! - `ChatCompletionsAgent` - OpenAI-compatible endpoint (feature `chat-completions`)
//! - [`StaticAgentRegistry`] - the [`AgentCatalog`](mdt_application::AgentCatalog)
//!   built from `[[agents]]`

#[cfg(feature = "chat-completions")]
pub mod chat_completions;
mod registry;
mod scripted;

#[cfg(feature = "chat-completions")]
pub use chat_completions::ChatCompletionsAgent;
pub use registry::{RegistryError, StaticAgentRegistry};
pub use scripted::ScriptedAgent;
