//! Consensus synthesis.

pub mod report;
pub mod synthesizer;
pub mod tie_break;

pub use report::{ConsensusReport, DiscussionMetrics, DissentingStatement, ReportContent};
pub use synthesizer::{DecisionSynthesizer, SynthesisError};
pub use tie_break::{TieBreak, TieKey};
