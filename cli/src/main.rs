//! CLI entrypoint for mdt-consult
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use mdt_application::{
    DiscussionProgress, NoProgress, NoSessionStore, RoundScheduler, SessionStore, load_session,
    open_session,
};
use mdt_domain::{AgentId, CaseRecord, InterventionCadence, OutputFormat, SessionId, SessionState};
use mdt_infrastructure::{ConfigLoader, FileConfig, JsonlSessionStore, StaticAgentRegistry};
use mdt_presentation::{Cli, ConsoleFormatter, ConsoleIntervention, ProgressReporter};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources();
        return Ok(());
    }

    let _log_guard = init_logging(&cli)?;
    info!("Starting mdt-consult");

    // === Configuration ===
    let mut config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).map_err(|e| anyhow::anyhow!(e))?
    };
    apply_overrides(&mut config, &cli);
    config.validate().context("invalid configuration")?;

    if !config.output.color_enabled() {
        colored::control::set_override(false);
    }
    let format = config.output.resolve_format(cli.output.map(OutputFormat::from));

    // === Dependency Injection ===
    let registry = Arc::new(StaticAgentRegistry::from_config(&config)?);
    let store = open_store(&config, &cli)?;

    let session = match &cli.resume {
        Some(id) => load_session(store.as_ref(), &SessionId::new(id.as_str()))?,
        None => {
            let case = read_case(&cli)?;
            let agents = select_agents(&config, &cli);
            open_session(
                case,
                agents,
                config.discussion.to_discussion_config(),
                store.as_ref(),
            )?
        }
    };

    if !cli.quiet {
        eprintln!("Session {} ({})", session.id(), session.state());
    }

    let progress: Arc<dyn DiscussionProgress> = if cli.quiet {
        Arc::new(NoProgress)
    } else {
        Arc::new(ProgressReporter::new())
    };

    let mut scheduler = RoundScheduler::new(session, registry)
        .with_checker(config.consistency_checker()?)
        .with_store(store)
        .with_progress(progress)
        .with_params(config.engine.to_engine_params());

    if cli.intervention_requested() || config.discussion.intervention_enabled {
        scheduler = scheduler.with_intervention(Arc::new(ConsoleIntervention::new()));
    }

    // Ctrl-C stops dispatch, drains in-flight calls and terminates the session
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, terminating discussion");
            signal_token.cancel();
        }
    });

    let outcome = scheduler.run(cancel).await?;

    let output = match format {
        OutputFormat::Full => ConsoleFormatter::format(&outcome),
        OutputFormat::Report => ConsoleFormatter::format_report_only(&outcome),
        OutputFormat::Json => ConsoleFormatter::format_json(&outcome),
    };
    println!("{}", output);

    if outcome.state() == SessionState::Failed {
        bail!("discussion {} failed", outcome.session.id());
    }
    Ok(())
}

/// Console logging by verbosity plus an optional daily log file.
///
/// `RUST_LOG` takes precedence over `-v` when set.
fn init_logging(cli: &Cli) -> Result<Option<WorkerGuard>> {
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(filter());

    let (file, guard) = match &cli.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("cannot create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "mdt-consult.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .context("failed to initialise logging")?;
    Ok(guard)
}

fn apply_overrides(config: &mut FileConfig, cli: &Cli) {
    let discussion = &mut config.discussion;
    if let Some(rounds) = cli.rounds {
        discussion.max_rounds = rounds;
    }
    if cli.intervention_requested() {
        discussion.intervention_enabled = true;
    }
    if cli.each_statement {
        discussion.intervention_cadence = InterventionCadence::AfterEachStatement;
    }
    if let Some(limit) = cli.concurrency {
        discussion.concurrency_limit = limit;
    }
    if let Some(secs) = cli.timeout {
        discussion.per_call_timeout_secs = secs;
    }
    if let Some(rule) = cli.tie_break {
        discussion.tie_break = rule;
    }
    if cli.no_synthesis_on_terminate {
        discussion.synthesize_on_terminate = false;
    }
    if let Some(dir) = &cli.store_dir {
        config.storage.directory = Some(dir.clone());
    }
    if cli.no_store {
        config.storage.enabled = false;
    }
}

fn open_store(config: &FileConfig, cli: &Cli) -> Result<Arc<dyn SessionStore>> {
    if !config.storage.enabled {
        if cli.resume.is_some() {
            bail!("--resume needs session storage enabled");
        }
        return Ok(Arc::new(NoSessionStore));
    }
    let Some(dir) = config.storage.resolve_directory() else {
        warn!("No data directory available, session will not be stored");
        return Ok(Arc::new(NoSessionStore));
    };
    let store = JsonlSessionStore::open(&dir)
        .with_context(|| format!("cannot open session store at {}", dir.display()))?;
    info!("Storing sessions in {}", store.dir().display());
    Ok(Arc::new(store))
}

fn select_agents(config: &FileConfig, cli: &Cli) -> Vec<AgentId> {
    if cli.agent.is_empty() {
        return config.agents.iter().map(|a| AgentId::new(a.id.trim())).collect();
    }
    for id in &cli.agent {
        if config.agent(id).is_none() {
            warn!("Agent '{}' is not configured and will be recorded as a gap", id);
        }
    }
    cli.agent.iter().map(|id| AgentId::new(id.as_str())).collect()
}

fn read_case(cli: &Cli) -> Result<CaseRecord> {
    if let Some(path) = &cli.case_file {
        return read_case_file(path);
    }
    if !cli.has_inline_case() {
        bail!("A case is required. Use --case-file, --complaint/--question, or --resume.");
    }
    let case = CaseRecord::new(
        cli.complaint.clone().unwrap_or_default(),
        cli.history.clone().unwrap_or_default(),
        cli.findings.clone().unwrap_or_default(),
        cli.question.clone().unwrap_or_default(),
    )?;
    Ok(case)
}

fn read_case_file(path: &Path) -> Result<CaseRecord> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read case file {}", path.display()))?;
    let case: CaseRecord = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&text)?,
        _ => toml::from_str(&text)?,
    };
    case.validate()?;
    Ok(case)
}
