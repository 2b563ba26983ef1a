//! Replay command
//!
//! Usage: dashkit replay <SCRIPT> [--fixture <FILE>] [--config <FILE>] [--print-state]
//!
//! The script is a JSON array of wire commands. Each command is awaited
//! before the next one is sent; every emitted event is printed to stdout
//! as one JSON line.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Args;
use dashkit_model::commands::{DashboardCommand, RawCommand};
use dashkit_model::events::EventPayload;
use dashkit_model::logging_facility;
use dashkit_model::selectors::select_dashboard_definition;
use dashkit_runtime::{CommandError, Dashboard, DashboardContext, InMemoryBackend, RuntimeConfig};

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Path to the JSON command script
    pub script: PathBuf,

    /// JSON fixture with the dashboards and display forms of the backend
    #[arg(long)]
    pub fixture: Option<PathBuf>,

    /// TOML runtime config
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the final dashboard definition after the script ran
    #[arg(long)]
    pub print_state: bool,

    /// Exit with an error when any command did not succeed
    #[arg(long)]
    pub strict: bool,
}

/// Tally of command outcomes
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub succeeded: usize,
    pub failed: usize,
    pub rejected: usize,
    pub internal: usize,
}

impl ReplaySummary {
    fn record(&mut self, outcome: &Result<dashkit_model::DashboardEvent, CommandError>) {
        match outcome {
            Ok(event) if matches!(event.payload, EventPayload::CommandRejected { .. }) => {
                self.rejected += 1
            }
            Ok(_) => self.succeeded += 1,
            Err(CommandError::Failed(_)) => self.failed += 1,
            Err(CommandError::Internal { .. } | CommandError::RuntimeGone) => self.internal += 1,
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed + self.rejected + self.internal == 0
    }
}

/// Execute replay command
///
/// # Errors
///
/// Fails when the config, fixture or script cannot be read, or with
/// `--strict` when a command did not succeed.
pub async fn execute(args: ReplayArgs) -> anyhow::Result<()> {
    let config = RuntimeConfig::load(args.config.as_deref())?;
    logging_facility::init(config.profile()?);

    let script = read_script(&args.script)?;
    let backend = match &args.fixture {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read fixture {}", path.display()))?;
            InMemoryBackend::from_fixture_json(&raw)?
        }
        None => InMemoryBackend::new(),
    };

    let dashboard = Dashboard::start(DashboardContext::from_config(Arc::new(backend), config));
    dashboard.subscribe(|event| match serde_json::to_string(event) {
        Ok(line) => println!("{}", line),
        Err(err) => tracing::warn!(error = %err, event_type = event.event_type(), "Event not printable"),
    });

    let mut summary = ReplaySummary::default();
    for command in script {
        let outcome = dashboard.dispatch_and_wait(command).await;
        summary.record(&outcome);
    }

    if args.print_state {
        let definition = select_dashboard_definition(&dashboard.state());
        println!("{}", serde_json::to_string_pretty(&definition)?);
    }
    dashboard.shutdown().await;

    eprintln!(
        "Replayed {} commands: {} succeeded, {} failed, {} rejected, {} internal errors",
        summary.succeeded + summary.failed + summary.rejected + summary.internal,
        summary.succeeded,
        summary.failed,
        summary.rejected,
        summary.internal
    );
    if args.strict && !summary.all_succeeded() {
        bail!("not every command succeeded");
    }
    Ok(())
}

/// Decode the whole script up front so a malformed entry aborts before anything runs
fn read_script(path: &Path) -> anyhow::Result<Vec<DashboardCommand>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))?;
    let entries: Vec<RawCommand> = serde_json::from_str(&raw)
        .with_context(|| format!("script {} is not a JSON array of commands", path.display()))?;

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            DashboardCommand::try_from(entry)
                .with_context(|| format!("command #{} in {}", index, path.display()))
        })
        .collect()
}
