//! Static agent catalog built from configuration.

use super::scripted::ScriptedAgent;
use crate::config::FileConfig;
use mdt_application::{AgentCapability, AgentCatalog};
use mdt_domain::AgentId;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("agent '{0}' is registered more than once")]
    Duplicate(AgentId),

    #[error("agent '{0}' has no scripted replies and chat-completions support is not enabled")]
    NoBackend(AgentId),

    #[error("could not set up the provider client: {0}")]
    Provider(String),
}

/// Fixed set of agents, in registration order.
#[derive(Default)]
pub struct StaticAgentRegistry {
    agents: Vec<(AgentId, Arc<dyn AgentCapability>)>,
}

impl StaticAgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, agent: Arc<dyn AgentCapability>) -> Result<(), RegistryError> {
        let id = agent.profile().id.clone();
        if self.agents.iter().any(|(existing, _)| *existing == id) {
            return Err(RegistryError::Duplicate(id));
        }
        self.agents.push((id, agent));
        Ok(())
    }

    pub fn with_agent(mut self, agent: Arc<dyn AgentCapability>) -> Result<Self, RegistryError> {
        self.register(agent)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Build every `[[agents]]` entry.
    ///
    /// Agents with `replies` are scripted; the rest call the `[provider]`
    /// endpoint when the `chat-completions` feature is compiled in.
    pub fn from_config(config: &FileConfig) -> Result<Self, RegistryError> {
        let mut registry = Self::new();

        #[cfg(feature = "chat-completions")]
        let mut client: Option<reqwest::Client> = None;

        for agent in &config.agents {
            let profile = agent.to_profile();
            if agent.is_scripted() {
                registry.register(Arc::new(ScriptedAgent::new(profile, agent.replies.clone())))?;
                continue;
            }

            #[cfg(feature = "chat-completions")]
            {
                use super::chat_completions::{ChatCompletionsAgent, build_client};

                let http = match &client {
                    Some(c) => c.clone(),
                    None => {
                        let c = build_client(&config.provider)
                            .map_err(|e| RegistryError::Provider(e.to_string()))?;
                        client = Some(c.clone());
                        c
                    }
                };
                registry.register(Arc::new(ChatCompletionsAgent::new(
                    profile,
                    http,
                    &config.provider,
                )))?;
            }

            #[cfg(not(feature = "chat-completions"))]
            return Err(RegistryError::NoBackend(profile.id));
        }

        info!("Registered {} agents", registry.len());
        Ok(registry)
    }
}

impl AgentCatalog for StaticAgentRegistry {
    fn resolve(&self, agent: &AgentId) -> Option<Arc<dyn AgentCapability>> {
        self.agents
            .iter()
            .find(|(id, _)| id == agent)
            .map(|(_, capability)| capability.clone())
    }

    fn agent_ids(&self) -> Vec<AgentId> {
        self.agents.iter().map(|(id, _)| id.clone()).collect()
    }
}
