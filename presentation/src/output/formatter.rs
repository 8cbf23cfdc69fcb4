//! Output formatter trait

use mdt_application::DiscussionOutcome;

/// Trait for formatting finished discussions
pub trait OutputFormatter {
    /// Transcript, interventions and report
    fn format(&self, outcome: &DiscussionOutcome) -> String;

    /// Format as JSON
    fn format_json(&self, outcome: &DiscussionOutcome) -> String;

    /// Report only (concise output)
    fn format_report_only(&self, outcome: &DiscussionOutcome) -> String;
}
