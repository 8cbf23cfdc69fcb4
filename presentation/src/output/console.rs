//! Console output formatter for discussion outcomes

use crate::output::formatter::OutputFormatter;
use colored::Colorize;
use mdt_application::DiscussionOutcome;
use mdt_domain::{
    CaseRecord, ConsensusReport, InterventionEvent, SessionSnapshot, Statement, StatementStatus,
    SuppliedNote, Turn,
};
use serde::Serialize;

/// JSON view of a finished session.
#[derive(Serialize)]
struct JsonOutput<'a> {
    session: SessionSnapshot,
    case: &'a CaseRecord,
    turns: &'a [Turn],
    interventions: &'a [InterventionEvent],
    notes: &'a [SuppliedNote],
    report: Option<&'a ConsensusReport>,
    synthesis_error: Option<String>,
}

/// Formats discussion outcomes for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format the complete discussion
    pub fn format(outcome: &DiscussionOutcome) -> String {
        let session = &outcome.session;
        let mut output = String::new();

        output.push_str(&Self::header("MDT Consultation"));
        output.push('\n');

        output.push_str(&format!(
            "{} {}  {} {}\n\n",
            "Session:".cyan().bold(),
            session.id(),
            "State:".cyan().bold(),
            session.state()
        ));
        output.push_str(&format!("{}\n", "Case:".cyan().bold()));
        output.push_str(&Self::indent(session.case().render().trim_end(), "  "));
        output.push_str("\n\n");
        output.push_str(&format!(
            "{} {}\n",
            "Agents:".cyan().bold(),
            session
                .agents()
                .iter()
                .map(|a| a.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ));

        for turn in session.turns() {
            let title = if turn.is_skipped() {
                format!("Round {} (skipped)", turn.round())
            } else {
                format!("Round {}", turn.round())
            };
            output.push_str(&Self::section_header(&title));

            for statement in turn.statements() {
                output.push_str(&Self::statement(statement));
            }
            for gap in turn.gaps() {
                output.push_str(&format!(
                    "\n{} {}: {}\n",
                    format!("── {} ──", gap.agent).red().bold(),
                    gap.reason,
                    gap.detail.dimmed()
                ));
            }
            for event in session
                .interventions()
                .iter()
                .filter(|e| e.round == turn.round())
            {
                output.push_str(&format!("\n{}\n", Self::intervention(event)));
            }
        }

        output.push_str(&Self::section_header("Consensus"));
        output.push_str(&Self::report_body(outcome));
        output.push_str(&Self::footer());
        output
    }

    /// Format only the consensus report
    pub fn format_report_only(outcome: &DiscussionOutcome) -> String {
        let mut output = String::new();
        output.push_str(&Self::header("MDT Consensus"));
        output.push('\n');
        output.push_str(&format!(
            "{} {}\n",
            "Question:".cyan().bold(),
            outcome.session.case().question()
        ));
        output.push_str(&Self::report_body(outcome));
        output.push_str(&Self::footer());
        output
    }

    /// Format as JSON
    pub fn format_json(outcome: &DiscussionOutcome) -> String {
        let session = &outcome.session;
        let view = JsonOutput {
            session: session.snapshot(),
            case: session.case(),
            turns: session.turns(),
            interventions: session.interventions(),
            notes: session.notes(),
            report: session.report(),
            synthesis_error: outcome.synthesis_error.as_ref().map(|e| e.to_string()),
        };
        serde_json::to_string_pretty(&view).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
    }

    fn statement(statement: &Statement) -> String {
        let label = format!("── {} [{}] ──", statement.agent(), statement.id());
        let mut out = match statement.status() {
            StatementStatus::Delivered => {
                format!("\n{}\n{}\n", label.yellow().bold(), statement.content().trim())
            }
            StatementStatus::Failed { reason, attempts } => format!(
                "\n{}\nNo statement after {} attempt(s): {}\n",
                label.red().bold(),
                attempts,
                reason
            ),
        };

        let flags = statement.flags();
        if !flags.contradicts.is_empty() {
            let ids: Vec<String> = flags.contradicts.iter().map(|id| id.to_string()).collect();
            out.push_str(&format!(
                "{} contradicts {}\n",
                "!".red().bold(),
                ids.join(", ")
            ));
        }
        for reason in &flags.low_confidence {
            out.push_str(&format!("{} {}\n", "?".yellow().bold(), reason.dimmed()));
        }
        out
    }

    fn intervention(event: &InterventionEvent) -> String {
        let target = event
            .target
            .as_ref()
            .map(|t| format!(" -> {}", t))
            .unwrap_or_default();
        let payload = if event.payload.is_empty() {
            String::new()
        } else {
            format!(": {}", event.payload)
        };
        format!("{} {}{}{}", ">>".magenta().bold(), event.kind, target, payload)
    }

    fn report_body(outcome: &DiscussionOutcome) -> String {
        match (outcome.report(), &outcome.synthesis_error) {
            (Some(report), _) => {
                let metrics = &report.content.metrics;
                let mut out = format!("\n{}\n", report.content.summary.trim_end());
                out.push_str(&format!(
                    "\n{} {} round(s), {} statement(s) ({} follow-up), {} failed, {} gap(s), {} contradiction(s)\n",
                    "Metrics:".cyan().bold(),
                    metrics.rounds_executed,
                    metrics.delivered_statements,
                    metrics.follow_up_statements,
                    metrics.failed_invocations,
                    metrics.gaps,
                    metrics.contradiction_links,
                ));
                out
            }
            (None, Some(error)) => format!("\n{} {}\n", "No report:".red().bold(), error),
            (None, None) => format!(
                "\n{} session ended {}\n",
                "No report:".red().bold(),
                outcome.state()
            ),
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format(&self, outcome: &DiscussionOutcome) -> String {
        Self::format(outcome)
    }

    fn format_json(&self, outcome: &DiscussionOutcome) -> String {
        Self::format_json(outcome)
    }

    fn format_report_only(&self, outcome: &DiscussionOutcome) -> String {
        Self::format_report_only(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mdt_domain::{
        DecisionSynthesizer, DiscussionConfig, DiscussionSession, InterventionAction, SessionId,
        SessionState, StatementDraft, StatementKind,
    };

    fn outcome() -> DiscussionOutcome {
        let case = CaseRecord::new("Dyspnoea", "CKD 3b", "EF 30%", "Diuretics?").unwrap();
        let (mut session, _) = DiscussionSession::create(
            SessionId::new("fmt"),
            case,
            vec!["cardio".into(), "renal".into()],
            DiscussionConfig::default().with_max_rounds(1),
        )
        .unwrap();
        session.transition(SessionState::Running, "start").unwrap();
        session.begin_round().unwrap();
        session
            .record_statement(StatementDraft::delivered(
                "cardio".into(),
                StatementKind::Regular,
                "Recommendation: diuresis",
            ))
            .unwrap();
        session
            .record_statement(StatementDraft::failed(
                "renal".into(),
                StatementKind::Regular,
                "Timeout",
                3,
            ))
            .unwrap();
        session
            .transition(SessionState::PausedForIntervention, "gate")
            .unwrap();
        session
            .record_intervention(&InterventionAction::SupplyInfo {
                note: "K+ 6.1".to_string(),
            })
            .unwrap();
        session.transition(SessionState::Completed, "done").unwrap();
        let report = DecisionSynthesizer::default()
            .synthesize_report(session.transcript(), Utc::now())
            .unwrap();
        session.attach_report(report).unwrap();
        DiscussionOutcome {
            session,
            synthesis_error: None,
        }
    }

    #[test]
    fn test_full_format_lists_rounds_and_failures() {
        colored::control::set_override(false);
        let text = ConsoleFormatter::format(&outcome());
        assert!(text.contains("Round 1"));
        assert!(text.contains("── cardio [r1#1] ──"));
        assert!(text.contains("No statement after 3 attempt(s): Timeout"));
        assert!(text.contains(">> supply_info: K+ 6.1"));
        assert!(text.contains("Primary recommendation: diuresis"));
    }

    #[test]
    fn test_report_only_has_question() {
        colored::control::set_override(false);
        let text = ConsoleFormatter::format_report_only(&outcome());
        assert!(text.contains("Question: Diuretics?"));
        assert!(!text.contains("Round 1"));
    }

    #[test]
    fn test_json_is_parseable() {
        let json = ConsoleFormatter::format_json(&outcome());
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["session"]["state"], "completed");
        assert_eq!(value["turns"][0]["statements"].as_array().unwrap().len(), 2);
        assert_eq!(value["report"]["content"]["primary_recommendation"], "diuresis");
        assert!(value["synthesis_error"].is_null());
    }
}
