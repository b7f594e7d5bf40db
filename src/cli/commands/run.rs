//! The `run` command: drives the whole connect flow in a terminal.

use std::io::{IsTerminal, Write};
use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cli::args::{OutputFormat, RunArgs};
use crate::cli::commands::scorecard::print_scorecard;
use crate::config::{ConfigLimits, ConfigLoader, FlowConfig, Validator};
use crate::error::{ConfigError, DegenScoreError};
use crate::flow::{
    ConnectedAccount, Connector, FileStore, FlowContext, FlowObserver, FlowRunner, KeyValueStore,
    MemoryStore, ObserverSet, SimulatedConnector, Stage, VerificationMode,
};
use crate::observability::{EventEmitter, init_metrics};
use crate::sequencer::{SequencerState, StepList};

/// Source label for configurations changed by command-line overrides.
const OVERRIDES_SOURCE: &str = "<command line>";

/// Run every stage, then print the scorecard.
///
/// # Errors
///
/// Returns an error if the configuration, store or event file cannot be
/// opened, if a stage fails to connect, or if `shutdown` interrupts a stage.
pub async fn run(
    args: &RunArgs,
    quiet: bool,
    shutdown: CancellationToken,
) -> Result<(), DegenScoreError> {
    if let Some(port) = args.metrics_port {
        init_metrics(Some(port))?;
        tracing::info!(port, "serving metrics");
    }

    let loader = ConfigLoader::with_defaults();
    let config = load_config(&loader, args.config.as_deref())?;
    let config = Arc::new(apply_overrides(config, args, loader.limits())?);
    let store = open_store(args.store.as_deref())?;
    if args.reset {
        FlowContext::clear(store.as_ref())?;
        tracing::info!("stored flow reset");
    }

    let connector: Arc<dyn Connector> =
        Arc::new(SimulatedConnector::new().with_step_delay(config.timing.step_interval));

    let mut observers = ObserverSet::new();
    if !quiet && args.format == OutputFormat::Human {
        observers.push(TerminalObserver::new());
    }
    if let Some(path) = &args.events {
        observers.push(open_events(path)?);
    }

    let runner = FlowRunner::new(config, store, connector)
        .with_provider(args.provider.clone())
        .with_shutdown(shutdown);
    let card = runner.run(&observers).await?;

    if !quiet || args.format == OutputFormat::Json {
        print_scorecard(&card, args.format)?;
    }
    Ok(())
}

fn load_config(loader: &ConfigLoader, path: Option<&Path>) -> Result<FlowConfig, DegenScoreError> {
    let Some(path) = path else {
        return Ok(FlowConfig::default());
    };
    let loaded = loader.load(path)?;
    for warning in &loaded.warnings {
        tracing::warn!(
            location = warning.location.as_deref().unwrap_or("<unknown>"),
            "{}",
            warning.message
        );
    }
    Ok(Arc::unwrap_or_clone(loaded.config))
}

/// Applies command-line timing overrides and validates the result again.
fn apply_overrides(
    mut config: FlowConfig,
    args: &RunArgs,
    limits: &ConfigLimits,
) -> Result<FlowConfig, DegenScoreError> {
    if let Some(interval) = args.step_interval {
        config.timing.step_interval = interval.into();
    }
    if let Some(interval) = args.score_step_interval {
        config.timing.score_step_interval = interval.into();
    }
    if let Some(delay) = args.completion_delay {
        config.timing.completion_delay = delay.into();
    }

    let result = Validator::new().validate(&config, limits);
    if result.has_errors() {
        for issue in &result.errors {
            tracing::error!(location = %issue.path, "{}", issue.message);
        }
        return Err(ConfigError::ValidationError {
            path: OVERRIDES_SOURCE.to_string(),
            errors: result.errors,
        }
        .into());
    }
    Ok(config)
}

fn open_store(path: Option<&Path>) -> Result<Arc<dyn KeyValueStore>, DegenScoreError> {
    Ok(match path {
        Some(path) => Arc::new(FileStore::open(path)?),
        None => Arc::new(MemoryStore::new()),
    })
}

fn open_events(path: &Path) -> Result<EventEmitter, DegenScoreError> {
    if path.as_os_str() == "-" {
        return Ok(EventEmitter::stdout());
    }
    Ok(EventEmitter::from_file(path)?)
}

// ============================================================================
// Terminal progress
// ============================================================================

/// Prints stage progress to stderr.
///
/// On a terminal the score counter redraws in place; otherwise only the
/// final score of each stage is printed.
#[derive(Debug)]
struct TerminalObserver {
    interactive: bool,
}

impl TerminalObserver {
    fn new() -> Self {
        Self {
            interactive: std::io::stderr().is_terminal(),
        }
    }
}

impl FlowObserver for TerminalObserver {
    fn stage_skipped(&self, stage: Stage, score: u64) {
        eprintln!("{} already connected ({score})", stage.title());
    }

    fn stage_started(&self, stage: Stage, steps: &StepList, verification: VerificationMode) {
        let pace = match verification {
            VerificationMode::Simulated => "",
            VerificationMode::External => " (waiting on wallet)",
        };
        eprintln!("Scanning {}{pace}: {} checks", stage.title(), steps.len());
    }

    fn account_connected(&self, _stage: Stage, account: &ConnectedAccount) {
        eprintln!("  connected {} via {}", account.account, account.provider);
    }

    fn snapshot(&self, stage: Stage, steps: &StepList, state: &SequencerState) {
        match state {
            SequencerState::RunningSteps { steps: progress } => {
                if let Some(index) = progress.completed_count().checked_sub(1) {
                    eprintln!("  ✓ {}", steps.label(index).unwrap_or_default());
                }
            }
            SequencerState::ScanComplete { .. } => {
                eprintln!("  {} scan complete", stage.title());
            }
            SequencerState::RunningScore { ramp } if self.interactive => {
                let mut err = std::io::stderr().lock();
                let _ = write!(err, "\r  score {:>6} / {}", ramp.current(), ramp.target());
                let _ = err.flush();
            }
            SequencerState::Done { final_score } => {
                if self.interactive {
                    eprintln!();
                }
                eprintln!("  {} score: {final_score}", stage.title());
            }
            SequencerState::Idle | SequencerState::RunningScore { .. } => {}
        }
    }

    fn stage_cancelled(&self, stage: Stage) {
        if self.interactive {
            eprintln!();
        }
        eprintln!("  {} cancelled", stage.title());
    }
}
