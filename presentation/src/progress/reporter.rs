//! Progress reporting for discussion rounds

use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use mdt_application::DiscussionProgress;
use mdt_domain::{InterventionEvent, InvocationGap, SessionState, Statement, StatementStatus};
use std::sync::Mutex;

/// Reports progress during a discussion with one bar per round
pub struct ProgressReporter {
    multi: MultiProgress,
    round_bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            round_bar: Mutex::new(None),
        }
    }

    fn round_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn start_bar(&self, prefix: String, len: usize) {
        let pb = self.multi.add(ProgressBar::new(len as u64));
        pb.set_style(Self::round_style());
        pb.set_prefix(prefix);
        pb.set_message("Waiting for statements...");

        if let Ok(mut slot) = self.round_bar.lock()
            && let Some(previous) = slot.replace(pb)
        {
            previous.finish_and_clear();
        }
    }

    fn finish_bar(&self, message: String) {
        if let Ok(mut slot) = self.round_bar.lock()
            && let Some(pb) = slot.take()
        {
            pb.finish_with_message(message);
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(slot) = self.round_bar.lock()
            && let Some(pb) = slot.as_ref()
        {
            f(pb);
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn statement_line(statement: &Statement) -> String {
    match statement.status() {
        StatementStatus::Delivered => format!("{} {}", "✓".green(), statement.agent()),
        StatementStatus::Failed { .. } => format!("{} {}", "✗".red(), statement.agent()),
    }
}

impl DiscussionProgress for ProgressReporter {
    fn on_round_start(&self, round: u32, max_rounds: u32, agents: usize) {
        self.start_bar(format!("Round {}/{}", round, max_rounds), agents);
    }

    fn on_statement(&self, statement: &Statement) {
        let line = statement_line(statement);
        self.with_bar(|pb| {
            pb.set_message(line);
            pb.inc(1);
        });
    }

    fn on_round_complete(&self, round: u32) {
        self.finish_bar(format!("Round {} complete!", round).green().to_string());
    }

    fn on_follow_up_start(&self, round: u32, agents: usize) {
        self.start_bar(format!("Round {} follow-up", round), agents);
    }

    fn on_gap(&self, _round: u32, gap: &InvocationGap) {
        let line = format!("{} {} ({})", "-".yellow(), gap.agent, gap.reason);
        self.with_bar(|pb| {
            pb.set_message(line);
            pb.inc(1);
        });
    }

    fn on_state_change(&self, _from: SessionState, to: SessionState) {
        // The console gate reads stdin, so the bar has to get out of the way.
        if to == SessionState::PausedForIntervention {
            self.finish_bar("awaiting intervention".to_string());
        }
    }

    fn on_channel_failed(&self, reason: &str) {
        self.multi
            .println(format!("{} {}", "Intervention unavailable:".yellow().bold(), reason))
            .ok();
    }

    fn on_synthesis_failed(&self, reason: &str) {
        self.multi
            .println(format!("{} {}", "Synthesis failed:".red().bold(), reason))
            .ok();
    }
}

/// Simple text-based progress (no fancy UI)
pub struct SimpleProgress;

impl DiscussionProgress for SimpleProgress {
    fn on_round_start(&self, round: u32, max_rounds: u32, agents: usize) {
        println!(
            "{} {} ({} agents)",
            "->".cyan(),
            format!("Round {}/{}", round, max_rounds).bold(),
            agents
        );
    }

    fn on_statement(&self, statement: &Statement) {
        match statement.status() {
            StatementStatus::Delivered => println!("  {} [{}]", statement_line(statement), statement.id()),
            StatementStatus::Failed { reason, .. } => {
                println!("  {} (failed: {})", statement_line(statement), reason)
            }
        }
    }

    fn on_round_complete(&self, _round: u32) {
        println!();
    }

    fn on_follow_up_start(&self, _round: u32, agents: usize) {
        println!("{} follow-up to {} agent(s)", "->".cyan(), agents);
    }

    fn on_gap(&self, _round: u32, gap: &InvocationGap) {
        println!("  {} {} ({})", "-".yellow(), gap.agent, gap.reason);
    }

    fn on_intervention(&self, event: &InterventionEvent) {
        println!("  {} {}", ">>".magenta(), event.kind);
    }

    fn on_intervention_rejected(&self, reason: &str) {
        println!("  {} {}", "rejected:".red(), reason);
    }

    fn on_channel_failed(&self, reason: &str) {
        println!("  {} {}", "intervention unavailable:".yellow(), reason);
    }

    fn on_synthesis_failed(&self, reason: &str) {
        println!("{} {}", "Synthesis failed:".red().bold(), reason);
    }
}
