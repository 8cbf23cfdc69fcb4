//! Terminal intervention gate.
//!
//! When the gate opens, the attending physician sees:
//!
//! ```text
//! ── Round 1/3 · intervention ──────────────────────────────
//! Flagged: r1#2
//!   [Enter] continue
//!   1 question one agent     /ask <agent> <question>
//!   2 question all agents    /all <question>
//!   3 supply information     /info <text>
//!   4 skip rest of round     /skip
//!   5 terminate discussion   /stop
//! mdt>
//! ```
//!
//! # Commands
//!
//! | Input | Aliases | Action |
//! |-------|---------|--------|
//! | (empty) | `c`, `continue`, `0` | continue without intervening |
//! | `1` | `/ask` | question one agent |
//! | `2` | `/all` | question every agent |
//! | `3` | `/info` | supply information |
//! | `4` | `/skip` | skip the rest of the round |
//! | `5` | `/stop`, `/terminate`, `q` | end the discussion |
//! | `?` | `/help` | show the menu again |

use async_trait::async_trait;
use colored::Colorize;
use mdt_application::{InterventionChannel, InterventionChannelError, InterventionPrompt};
use mdt_domain::{AgentId, InterventionAction, InterventionOutcome};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::Mutex;

/// Text still needed to complete a menu choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextRequest {
    QuestionOne { target: Option<AgentId> },
    QuestionAll,
    SupplyInfo,
}

/// Result of parsing one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    Outcome(InterventionOutcome),
    NeedsText(TextRequest),
    Help,
    Unknown(String),
}

/// Map a target given by number (1-based) or id onto an agent id.
///
/// Unknown ids are passed through; the gate rejects them.
pub fn resolve_target(input: &str, agents: &[AgentId]) -> AgentId {
    let input = input.trim();
    input
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| agents.get(i).cloned())
        .unwrap_or_else(|| AgentId::from(input))
}

fn act(action: InterventionAction) -> Parsed {
    Parsed::Outcome(InterventionOutcome::Act(action))
}

/// Parse one line typed at the gate.
pub fn parse_line(input: &str, agents: &[AgentId]) -> Parsed {
    let input = input.trim();
    let (command, rest) = match input.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (input, ""),
    };

    match command.to_lowercase().as_str() {
        "" | "c" | "continue" | "0" => Parsed::Outcome(InterventionOutcome::Pass),
        "1" => Parsed::NeedsText(TextRequest::QuestionOne { target: None }),
        "/ask" => match rest.split_once(char::is_whitespace) {
            Some((target, prompt)) => act(InterventionAction::QuestionOne {
                target: resolve_target(target, agents),
                prompt: prompt.trim().to_string(),
            }),
            None if !rest.is_empty() => Parsed::NeedsText(TextRequest::QuestionOne {
                target: Some(resolve_target(rest, agents)),
            }),
            None => Parsed::NeedsText(TextRequest::QuestionOne { target: None }),
        },
        "2" | "/all" if rest.is_empty() => Parsed::NeedsText(TextRequest::QuestionAll),
        "/all" => act(InterventionAction::QuestionAll {
            prompt: rest.to_string(),
        }),
        "3" | "/info" if rest.is_empty() => Parsed::NeedsText(TextRequest::SupplyInfo),
        "/info" => act(InterventionAction::SupplyInfo {
            note: rest.to_string(),
        }),
        "4" | "/skip" => act(InterventionAction::SkipRound),
        "5" | "/stop" | "/terminate" | "q" => act(InterventionAction::Terminate),
        "?" | "/help" | "help" => Parsed::Help,
        _ => Parsed::Unknown(input.to_string()),
    }
}

/// Reads intervention commands from a line-oriented input (stdin by default).
pub struct ConsoleIntervention<R = BufReader<Stdin>> {
    input: Mutex<R>,
}

impl ConsoleIntervention {
    pub fn new() -> Self {
        Self::from_reader(BufReader::new(tokio::io::stdin()))
    }
}

impl Default for ConsoleIntervention {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> ConsoleIntervention<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn from_reader(input: R) -> Self {
        Self {
            input: Mutex::new(input),
        }
    }

    fn display_menu(prompt: &InterventionPrompt) {
        println!();
        let title = match &prompt.last_speaker {
            Some(agent) => format!(
                "── Round {}/{} · after {} ",
                prompt.round, prompt.max_rounds, agent
            ),
            None => format!("── Round {}/{} · intervention ", prompt.round, prompt.max_rounds),
        };
        println!("{}", format!("{:─<60}", title).cyan().bold());

        if !prompt.flagged.is_empty() {
            println!("{} {}", "Flagged:".yellow().bold(), prompt.flagged.join(", "));
        }
        let agents: Vec<String> = prompt
            .agents
            .iter()
            .enumerate()
            .map(|(i, a)| format!("{}={}", i + 1, a))
            .collect();
        println!("{} {}", "Agents:".cyan(), agents.join("  "));

        println!("  {} continue", "[Enter]".green());
        println!("  {} question one agent     {}", "1".bold(), "/ask <agent> <question>".dimmed());
        println!("  {} question all agents    {}", "2".bold(), "/all <question>".dimmed());
        println!("  {} supply information     {}", "3".bold(), "/info <text>".dimmed());
        println!("  {} skip rest of round     {}", "4".bold(), "/skip".dimmed());
        println!("  {} terminate discussion   {}", "5".bold(), "/stop".dimmed());
        if prompt.follow_ups_left > 0 {
            println!("{}", format!("({} follow-up offers left)", prompt.follow_ups_left).dimmed());
        }
    }

    async fn read_line(&self, label: &str) -> Result<String, InterventionChannelError> {
        print!("{} ", label.magenta().bold());
        std::io::stdout()
            .flush()
            .map_err(|e| InterventionChannelError::Io(format!("Failed to flush stdout: {}", e)))?;

        let mut line = String::new();
        let read = self
            .input
            .lock()
            .await
            .read_line(&mut line)
            .await
            .map_err(|e| InterventionChannelError::Io(format!("Failed to read input: {}", e)))?;
        if read == 0 {
            return Err(InterventionChannelError::Closed);
        }
        Ok(line.trim().to_string())
    }

    /// Complete a menu choice with the text it needs; `None` backs out.
    async fn complete(
        &self,
        request: TextRequest,
        prompt: &InterventionPrompt,
    ) -> Result<Option<InterventionAction>, InterventionChannelError> {
        let action = match request {
            TextRequest::QuestionOne { target } => {
                let target = match target {
                    Some(target) => target,
                    None => {
                        let input = self.read_line("agent (number or id)>").await?;
                        if input.is_empty() {
                            return Ok(None);
                        }
                        resolve_target(&input, &prompt.agents)
                    }
                };
                let question = self.read_line(&format!("question for {}>", target)).await?;
                if question.is_empty() {
                    return Ok(None);
                }
                InterventionAction::QuestionOne {
                    target,
                    prompt: question,
                }
            }
            TextRequest::QuestionAll => {
                let question = self.read_line("question for all>").await?;
                if question.is_empty() {
                    return Ok(None);
                }
                InterventionAction::QuestionAll { prompt: question }
            }
            TextRequest::SupplyInfo => {
                let note = self.read_line("information>").await?;
                if note.is_empty() {
                    return Ok(None);
                }
                InterventionAction::SupplyInfo { note }
            }
        };
        Ok(Some(action))
    }
}

#[async_trait]
impl<R> InterventionChannel for ConsoleIntervention<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn request(
        &self,
        prompt: &InterventionPrompt,
    ) -> Result<InterventionOutcome, InterventionChannelError> {
        Self::display_menu(prompt);

        loop {
            let input = self.read_line("mdt>").await?;
            match parse_line(&input, &prompt.agents) {
                Parsed::Outcome(outcome) => return Ok(outcome),
                Parsed::NeedsText(request) => match self.complete(request, prompt).await? {
                    Some(action) => return Ok(InterventionOutcome::Act(action)),
                    None => println!("{}", "Cancelled.".dimmed()),
                },
                Parsed::Help => Self::display_menu(prompt),
                Parsed::Unknown(text) => {
                    println!("{} Unknown command: {}", "!".yellow(), text.red());
                    println!("Type ? for the menu, or press Enter to continue.");
                }
            }
        }
    }
}
