//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod agents;
mod consistency;
mod discussion;
mod engine;
mod output;
mod provider;
mod storage;

pub use agents::{FileAgentConfig, default_agents};
pub use consistency::{FileConsistencyConfig, FileExclusivityRule};
pub use discussion::FileDiscussionConfig;
pub use engine::FileEngineConfig;
pub use output::FileOutputConfig;
pub use provider::FileProviderConfig;
pub use storage::FileStorageConfig;

use mdt_domain::{ConsistencyChecker, MAX_ROUNDS_LIMIT};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Configuration validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    #[error("discussion.max_rounds must be between 1 and {MAX_ROUNDS_LIMIT}, got {0}")]
    MaxRoundsOutOfRange(u32),

    #[error("discussion.concurrency_limit cannot be 0")]
    ZeroConcurrency,

    #[error("discussion.per_call_timeout_secs cannot be 0")]
    ZeroTimeout,

    #[error("agent id cannot be empty")]
    EmptyAgentId,

    #[error("agent '{0}' is defined more than once")]
    DuplicateAgent(String),

    #[error("invalid consistency rule: {0}")]
    InvalidRule(String),
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Round budget, cadence, ordering and tie-break
    pub discussion: FileDiscussionConfig,
    /// Retry and intervention wait tuning
    pub engine: FileEngineConfig,
    /// Mutual exclusivity rules for the consistency checker
    pub consistency: FileConsistencyConfig,
    /// Chat-completions endpoint backing the agents
    pub provider: FileProviderConfig,
    /// Specialist panel
    pub agents: Vec<FileAgentConfig>,
    /// Event log and report persistence
    pub storage: FileStorageConfig,
    /// Output settings
    pub output: FileOutputConfig,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            discussion: FileDiscussionConfig::default(),
            engine: FileEngineConfig::default(),
            consistency: FileConsistencyConfig::default(),
            provider: FileProviderConfig::default(),
            agents: default_agents(),
            storage: FileStorageConfig::default(),
            output: FileOutputConfig::default(),
        }
    }
}

impl FileConfig {
    /// Validate the configuration, stopping at the first problem.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let rounds = self.discussion.max_rounds;
        if rounds == 0 || rounds > MAX_ROUNDS_LIMIT {
            return Err(ConfigValidationError::MaxRoundsOutOfRange(rounds));
        }
        if self.discussion.concurrency_limit == 0 {
            return Err(ConfigValidationError::ZeroConcurrency);
        }
        if self.discussion.per_call_timeout_secs == 0 {
            return Err(ConfigValidationError::ZeroTimeout);
        }

        let mut seen = HashSet::new();
        for agent in &self.agents {
            let id = agent.id.trim();
            if id.is_empty() {
                return Err(ConfigValidationError::EmptyAgentId);
            }
            if !seen.insert(id) {
                return Err(ConfigValidationError::DuplicateAgent(id.to_string()));
            }
        }

        self.consistency_checker().map(|_| ())
    }

    /// Build the checker from `[consistency]`.
    pub fn consistency_checker(&self) -> Result<ConsistencyChecker, ConfigValidationError> {
        ConsistencyChecker::new(self.consistency.to_rules())
            .map_err(|e| ConfigValidationError::InvalidRule(e.to_string()))
    }

    /// Find an agent definition by id.
    pub fn agent(&self, id: &str) -> Option<&FileAgentConfig> {
        self.agents.iter().find(|a| a.id.trim() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdt_domain::OutputFormat;

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[discussion]
max_rounds = 2
intervention_enabled = true

[engine]
max_retries = 1
drain_grace_ms = 500

[provider]
api_base = "http://localhost:11434/v1"
model = "llama3"

[[agents]]
id = "cardio"
specialty = "Cardiology"

[[agents]]
id = "renal"
specialty = "Nephrology"
replies = ["Recommendation: diuresis"]

[storage]
enabled = false

[output]
format = "full"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.discussion.max_rounds, 2);
        assert!(config.discussion.intervention_enabled);
        assert_eq!(config.engine.max_retries, 1);
        assert_eq!(config.provider.model, "llama3");
        assert_eq!(config.agents.len(), 2);
        assert!(config.agent("renal").unwrap().is_scripted());
        assert!(!config.storage.enabled);
        assert_eq!(config.output.format, Some(OutputFormat::Full));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = FileConfig::default();
        assert_eq!(config.agents.len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_max_rounds() {
        let mut config = FileConfig::default();
        config.discussion.max_rounds = 11;
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::MaxRoundsOutOfRange(11))
        );
    }

    #[test]
    fn test_validate_zero_values() {
        let mut config = FileConfig::default();
        config.discussion.concurrency_limit = 0;
        assert_eq!(config.validate(), Err(ConfigValidationError::ZeroConcurrency));

        let mut config = FileConfig::default();
        config.discussion.per_call_timeout_secs = 0;
        assert_eq!(config.validate(), Err(ConfigValidationError::ZeroTimeout));
    }

    #[test]
    fn test_validate_duplicate_agents() {
        let toml_str = r#"
[[agents]]
id = "cardio"
specialty = "Cardiology"

[[agents]]
id = " cardio "
specialty = "Cardiology again"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::DuplicateAgent("cardio".to_string()))
        );
    }

    #[test]
    fn test_validate_rule_needs_two_categories() {
        let toml_str = r#"
[[consistency.rules]]
name = "lonely"
kind = "recommendation"
categories = ["diuresis"]
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::InvalidRule(_))
        ));
    }
}
