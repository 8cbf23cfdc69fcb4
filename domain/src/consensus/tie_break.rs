//! Tie-break rules for consensus aggregation.

use crate::agent::AgentId;
use crate::discussion::statement::Statement;
use serde::{Deserialize, Serialize};

/// How equal vote counts between recommendation categories are resolved.
///
/// The winning category is the one whose best-ranked supporting statement
/// ranks first under the rule.
///
/// # Example
///
/// ```
/// use mdt_domain::consensus::TieBreak;
///
/// assert_eq!("earliest_round".parse::<TieBreak>().ok(), Some(TieBreak::EarliestRound));
/// assert_eq!("lowest-agent".parse::<TieBreak>().ok(), Some(TieBreak::LowestAgent));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Earliest round first, then lowest agent id
    #[default]
    EarliestRound,
    /// Lowest agent id first, then earliest round
    LowestAgent,
}

/// Sort key of a single statement under a [`TieBreak`] rule (smaller wins).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TieKey<'a> {
    ByRound(u32, &'a AgentId, u32),
    ByAgent(&'a AgentId, u32, u32),
}

impl TieBreak {
    pub fn key<'a>(&self, statement: &'a Statement) -> TieKey<'a> {
        match self {
            TieBreak::EarliestRound => {
                TieKey::ByRound(statement.round(), statement.agent(), statement.sequence())
            }
            TieBreak::LowestAgent => {
                TieKey::ByAgent(statement.agent(), statement.round(), statement.sequence())
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TieBreak::EarliestRound => "earliest_round",
            TieBreak::LowestAgent => "lowest_agent",
        }
    }
}

impl std::fmt::Display for TieBreak {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TieBreak {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "earliest_round" | "earliest" | "round" => Ok(TieBreak::EarliestRound),
            "lowest_agent" | "agent" => Ok(TieBreak::LowestAgent),
            _ => Err(format!(
                "Unknown tie-break rule: {}. Valid: earliest_round, lowest_agent",
                s
            )),
        }
    }
}
