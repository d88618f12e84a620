//! CLI command handling for syncedit

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use syncedit_config::{logging, LoggingConfig, SyncEditConfig};
use syncedit_engine::{
    scan, Block, EventOutcome, Groups, HostContext, InputEvent, SessionState, SyncEditor,
};
use syncedit_foundation::{Document, GroupId, GroupMarker, RecordingSink, Span, StyleRun, StyleRuns};
use tracing::{debug, info, warn};

/// The main CLI struct.
#[derive(Parser)]
#[command(name = "syncedit")]
#[command(about = "Rename every occurrence of an identifier in a block by editing just one")]
#[command(version)]
pub struct Cli {
    /// Settings file with a [global] section and optional [lang_<name>] sections
    #[arg(long, global = true, default_value = "syncedit.toml")]
    pub config: PathBuf,

    /// Language of the document (omit for plain text, which always uses pattern mode)
    #[arg(long, global = true)]
    pub language: Option<String>,

    /// JSON array of role runs: [{"span": {"start": 0, "end": 3}, "label": "Id"}]
    #[arg(long, global = true)]
    pub roles: Option<PathBuf>,

    /// The command to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// The available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Replay a scripted event sequence against a file
    Run {
        /// Document to edit
        #[arg(long)]
        file: PathBuf,

        /// Select start..end (byte offsets) and activate before the script runs
        #[arg(long, value_parser = parse_range)]
        select: Option<Span>,

        /// JSON array of input events, e.g. [{"event": "click", "offset": 4}]
        #[arg(long)]
        script: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Write the edited document back to the file
        #[arg(long)]
        write: bool,
    },
    /// Print the identifier groups of a block as JSON
    Scan {
        /// Document to scan
        #[arg(long)]
        file: PathBuf,

        /// Block to scan as start..end (byte offsets); defaults to the whole file
        #[arg(long, value_parser = parse_range)]
        select: Option<Span>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// The edited document only
    Text,
    /// Document, final state, outcomes, notices and groups
    Json,
}

/// Parse a `start..end` byte range.
fn parse_range(raw: &str) -> Result<Span, String> {
    let (start, end) = raw
        .split_once("..")
        .ok_or_else(|| format!("expected start..end, got {:?}", raw))?;
    let start: usize = start
        .trim()
        .parse()
        .map_err(|e| format!("invalid start offset: {}", e))?;
    let end: usize = end
        .trim()
        .parse()
        .map_err(|e| format!("invalid end offset: {}", e))?;
    if start > end {
        return Err(format!("range start {} is after end {}", start, end));
    }
    Ok(Span::new(start, end))
}

fn load_roles(path: Option<&Path>) -> Result<StyleRuns> {
    let Some(path) = path else {
        return Ok(StyleRuns::new());
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read roles file {}", path.display()))?;
    let runs: Vec<StyleRun> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid roles file {}", path.display()))?;
    debug!(path = %path.display(), runs = runs.len(), "Loaded role runs");
    Ok(StyleRuns::from_runs(runs))
}

fn load_events(path: &Path) -> Result<Vec<InputEvent>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid script {}", path.display()))
}

/// Outcome of replaying a script.
#[derive(Debug, Serialize)]
pub struct Replay {
    pub text: String,
    pub state: SessionState,
    pub outcomes: Vec<EventOutcome>,
    pub notices: Vec<String>,
    pub groups: Vec<GroupMarker>,
}

/// Drive a fresh editor over `text` with `events`.
pub fn replay(
    text: &str,
    roles: &StyleRuns,
    config: SyncEditConfig,
    language: Option<String>,
    events: Vec<InputEvent>,
) -> Result<Replay> {
    let mut editor = SyncEditor::new(Arc::new(config), language);
    let mut doc = Document::new(text);
    let mut sink = RecordingSink::new();
    let mut outcomes = Vec::with_capacity(events.len());

    for (index, event) in events.into_iter().enumerate() {
        debug!(index, ?event, "Replaying event");
        let mut host = HostContext::new(&mut doc, roles, &mut sink);
        let outcome = editor
            .handle(event, &mut host)
            .with_context(|| format!("Event #{} failed", index))?;
        outcomes.push(outcome);
    }

    let groups = editor
        .session()
        .map(|session| session.group_markers())
        .unwrap_or_default();
    Ok(Replay {
        state: editor.state(),
        outcomes,
        notices: sink.notices.iter().map(ToString::to_string).collect(),
        groups,
        text: doc.into_string(),
    })
}

/// One group as reported by `scan`.
#[derive(Debug, Serialize)]
pub struct GroupReport {
    pub group: GroupId,
    pub text: String,
    pub editable: bool,
    pub spans: Vec<Span>,
}

pub fn scan_groups(
    text: &str,
    span: Span,
    roles: &StyleRuns,
    config: &SyncEditConfig,
    language: Option<&str>,
) -> Result<Vec<GroupReport>> {
    let resolved = config.resolve(language);
    for warning in &resolved.warnings {
        warn!(%warning, "Settings problem");
    }
    if resolved.policy.uses_structural_mode() && roles.runs().is_empty() {
        warn!("Structural mode without --roles finds no identifiers");
    }

    let block = Block::capture(text, span)?;
    let raw = scan(&block, &resolved.policy, roles)?;
    let groups = Groups::build(raw, &resolved.policy);
    Ok(groups
        .iter()
        .map(|group| GroupReport {
            group: group.id(),
            text: group.text().to_string(),
            editable: group.editable(),
            spans: groups.spans_of(group.id()),
        })
        .collect())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::initialize(&LoggingConfig::default());

    let config = SyncEditConfig::load(&cli.config)?;
    let roles = load_roles(cli.roles.as_deref())?;

    match cli.command {
        Commands::Run {
            file,
            select,
            script,
            format,
            write,
        } => {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let mut events = Vec::new();
            if let Some(span) = select {
                events.push(InputEvent::SelectionMade {
                    start: span.start,
                    end: span.end,
                });
                events.push(InputEvent::Activate);
            }
            events.extend(load_events(&script)?);

            info!(file = %file.display(), events = events.len(), "Replaying script");
            let replay = replay(&text, &roles, config, cli.language, events)?;

            if write {
                fs::write(&file, &replay.text)
                    .with_context(|| format!("Failed to write {}", file.display()))?;
            }
            match format {
                OutputFormat::Text => print!("{}", replay.text),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&replay)?),
            }
        }
        Commands::Scan { file, select } => {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let span = select.unwrap_or_else(|| Span::new(0, text.len()));
            let groups = scan_groups(&text, span, &roles, &config, cli.language.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&groups)?);
        }
    }
    Ok(())
}
