//! Discussion configuration from TOML (`[discussion]` section)
//!
//! ```toml
//! [discussion]
//! max_rounds = 3
//! intervention_enabled = true
//! intervention_cadence = "after_each_statement"
//! per_call_timeout_secs = 60
//! concurrency_limit = 4
//! ordering = "dispatch"
//! tie_break = "lowest_agent"
//! synthesize_on_terminate = true
//! ```

use mdt_domain::{DiscussionConfig, InterventionCadence, RoundOrdering, TieBreak};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDiscussionConfig {
    pub max_rounds: u32,
    pub intervention_enabled: bool,
    pub intervention_cadence: InterventionCadence,
    pub per_call_timeout_secs: u64,
    pub concurrency_limit: usize,
    pub ordering: RoundOrdering,
    pub tie_break: TieBreak,
    pub synthesize_on_terminate: bool,
}

impl Default for FileDiscussionConfig {
    fn default() -> Self {
        let defaults = DiscussionConfig::default();
        Self {
            max_rounds: defaults.max_rounds,
            intervention_enabled: defaults.intervention_enabled,
            intervention_cadence: defaults.intervention_cadence,
            per_call_timeout_secs: defaults.per_call_timeout.as_secs(),
            concurrency_limit: defaults.concurrency_limit,
            ordering: defaults.ordering,
            tie_break: defaults.tie_break,
            synthesize_on_terminate: defaults.synthesize_on_terminate,
        }
    }
}

impl FileDiscussionConfig {
    /// Convert to the domain configuration (unvalidated).
    pub fn to_discussion_config(&self) -> DiscussionConfig {
        DiscussionConfig::default()
            .with_max_rounds(self.max_rounds)
            .with_intervention(self.intervention_enabled)
            .with_cadence(self.intervention_cadence)
            .with_per_call_timeout(Duration::from_secs(self.per_call_timeout_secs))
            .with_concurrency_limit(self.concurrency_limit)
            .with_ordering(self.ordering)
            .with_tie_break(self.tie_break)
            .with_synthesize_on_terminate(self.synthesize_on_terminate)
    }
}
