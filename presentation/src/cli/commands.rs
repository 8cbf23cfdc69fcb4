//! CLI command definitions

use clap::{Parser, ValueEnum};
use mdt_domain::{OutputFormat, TieBreak};
use std::path::PathBuf;

/// Output format selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputArg {
    /// Transcript, interventions and the report
    Full,
    /// Only the consensus report
    Report,
    /// Session and report as JSON
    Json,
}

impl From<OutputArg> for OutputFormat {
    fn from(arg: OutputArg) -> Self {
        match arg {
            OutputArg::Full => OutputFormat::Full,
            OutputArg::Report => OutputFormat::Report,
            OutputArg::Json => OutputFormat::Json,
        }
    }
}

/// CLI arguments for mdt-consult
#[derive(Parser, Debug)]
#[command(name = "mdt-consult")]
#[command(author, version, about = "Multidisciplinary team consultation - specialist agents discuss a clinical case")]
#[command(long_about = r#"
mdt-consult runs a panel of specialist agents through a bounded,
round-based discussion of a clinical case and synthesizes a consensus.

Each round every agent gives a statement. Statements are checked for
contradictions with what was said before. With --interactive the attending
physician can question one or all agents, add information, skip the rest
of a round or stop the discussion.

Configuration files are loaded from (in priority order):
1. MDT_* environment   e.g. MDT_DISCUSSION__MAX_ROUNDS=4
2. --config <path>     Explicit config file
3. ./mdt.toml          Project-level config
4. ~/.config/mdt-consult/config.toml   Global config

Example:
  mdt-consult --complaint "Progressive dyspnoea" --question "Diuretics or dialysis?"
  mdt-consult --case-file case.toml -a cardio -a renal --rounds 2 --interactive
  mdt-consult --resume 5f0c...
"#)]
pub struct Cli {
    // ==================== Case ====================
    /// Case file (TOML or JSON with chief_complaint, history, findings, question)
    #[arg(long, value_name = "PATH", conflicts_with_all = ["complaint", "resume"])]
    pub case_file: Option<PathBuf>,

    /// Chief complaint
    #[arg(long, value_name = "TEXT")]
    pub complaint: Option<String>,

    /// Relevant history
    #[arg(long, value_name = "TEXT")]
    pub history: Option<String>,

    /// Examination and laboratory findings
    #[arg(long, value_name = "TEXT")]
    pub findings: Option<String>,

    /// Question put to the team
    #[arg(long, value_name = "TEXT")]
    pub question: Option<String>,

    /// Resume a stored session by id
    #[arg(long, value_name = "ID")]
    pub resume: Option<String>,

    // ==================== Discussion ====================
    /// Agents to include (can be specified multiple times; default: all configured)
    #[arg(short, long, value_name = "AGENT")]
    pub agent: Vec<String>,

    /// Number of rounds (1-10)
    #[arg(short, long, value_name = "N")]
    pub rounds: Option<u32>,

    /// Offer the intervention gate after every round
    #[arg(short, long)]
    pub interactive: bool,

    /// Offer the gate after every statement instead (implies --interactive)
    #[arg(long)]
    pub each_statement: bool,

    /// Maximum concurrent agent invocations
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Per-call timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Tie-break rule: earliest_round or lowest_agent
    #[arg(long, value_name = "RULE")]
    pub tie_break: Option<TieBreak>,

    /// Do not synthesize a report when the discussion is terminated early
    #[arg(long)]
    pub no_synthesis_on_terminate: bool,

    // ==================== Output ====================
    /// Output format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputArg>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Directory for a daily rolling log file
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    // ==================== Configuration ====================
    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,

    /// Directory for session event logs and reports
    #[arg(long, value_name = "DIR")]
    pub store_dir: Option<PathBuf>,

    /// Do not persist the session
    #[arg(long, conflicts_with = "resume")]
    pub no_store: bool,
}

impl Cli {
    /// Whether any inline case field was given.
    pub fn has_inline_case(&self) -> bool {
        self.complaint.is_some()
            || self.history.is_some()
            || self.findings.is_some()
            || self.question.is_some()
    }

    pub fn intervention_requested(&self) -> bool {
        self.interactive || self.each_statement
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_full_invocation() {
        let cli = Cli::try_parse_from([
            "mdt-consult",
            "--complaint",
            "Dyspnoea",
            "--question",
            "Diuretics?",
            "-a",
            "cardio",
            "-a",
            "renal",
            "--rounds",
            "2",
            "--each-statement",
            "--tie-break",
            "lowest_agent",
            "-o",
            "json",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.agent, vec!["cardio", "renal"]);
        assert_eq!(cli.rounds, Some(2));
        assert!(cli.intervention_requested());
        assert_eq!(cli.tie_break, Some(TieBreak::LowestAgent));
        assert_eq!(cli.output, Some(OutputArg::Json));
        assert_eq!(cli.verbose, 2);
        assert!(cli.has_inline_case());
    }

    #[test]
    fn test_case_file_conflicts_with_resume() {
        let result = Cli::try_parse_from(["mdt-consult", "--case-file", "c.toml", "--resume", "x"]);
        assert!(result.is_err());
    }
}
