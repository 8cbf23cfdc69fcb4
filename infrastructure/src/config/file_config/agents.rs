//! Specialist definitions from TOML (`[[agents]]` array)
//!
//! ```toml
//! [[agents]]
//! id = "cardio"
//! specialty = "Cardiology"
//! prompt = "You are a consultant cardiologist..."
//!
//! [[agents]]
//! id = "renal"
//! specialty = "Nephrology"
//! replies = ["Recommendation: diuresis"]   # scripted, no provider call
//! ```

use mdt_domain::AgentProfile;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAgentConfig {
    pub id: String,
    pub specialty: String,
    #[serde(default)]
    pub prompt: String,
    /// Canned replies; when present the agent never calls the provider
    #[serde(default)]
    pub replies: Vec<String>,
}

impl FileAgentConfig {
    pub fn new(id: &str, specialty: &str) -> Self {
        Self {
            id: id.to_string(),
            specialty: specialty.to_string(),
            prompt: String::new(),
            replies: Vec::new(),
        }
    }

    pub fn is_scripted(&self) -> bool {
        !self.replies.is_empty()
    }

    pub fn to_profile(&self) -> AgentProfile {
        AgentProfile::new(self.id.trim(), self.specialty.trim()).with_prompt(self.prompt.clone())
    }
}

/// Panel used when the configuration defines no agents.
pub fn default_agents() -> Vec<FileAgentConfig> {
    vec![
        FileAgentConfig::new("cardio", "Cardiology"),
        FileAgentConfig::new("renal", "Nephrology"),
        FileAgentConfig::new("internal", "Internal Medicine"),
    ]
}
