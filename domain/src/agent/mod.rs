//! Specialist agent identity.
//!
//! The catalog of specialist definitions lives outside the engine; the
//! domain only knows agents by [`AgentId`] and carries an [`AgentProfile`]
//! describing how a specialty is presented to its reasoning capability.

use serde::{Deserialize, Serialize};

/// Identifier of a specialist agent (e.g. `"cardio"`, `"renal"`).
///
/// Ordering is lexicographic and is used for deterministic tie-breaking.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        AgentId::new(s)
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        AgentId(s)
    }
}

impl AsRef<str> for AgentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Data-driven description of one specialist.
///
/// All specialties share the same invocation contract; what differs is the
/// label and the prompt handed to the reasoning capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: AgentId,
    /// Human readable specialty (e.g. "Cardiology")
    pub specialty: String,
    /// Specialty-specific instructions prepended to every invocation
    #[serde(default)]
    pub prompt: String,
}

impl AgentProfile {
    pub fn new(id: impl Into<AgentId>, specialty: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            specialty: specialty.into(),
            prompt: String::new(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Prompt to use for this agent, falling back to a generic specialist one.
    pub fn effective_prompt(&self) -> String {
        if self.prompt.trim().is_empty() {
            format!(
                "You are the {} specialist in a multidisciplinary team meeting. \
                 Analyse the case from your specialty's perspective, respond to \
                 colleagues' points, and end with a 'Diagnosis:' line and a \
                 'Recommendation:' line.",
                self.specialty
            )
        } else {
            self.prompt.clone()
        }
    }
}
