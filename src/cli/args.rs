//! CLI argument definitions
//!
//! All Clap derive structs for `degenscore` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::flow::DEFAULT_PROVIDER;
use crate::observability::LogFormat;

// ============================================================================
// Root CLI
// ============================================================================

/// Connect Twitter, Telegram and a wallet, then reveal your degen score.
#[derive(Parser, Debug)]
#[command(name = "degenscore", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "DEGENSCORE_COLOR")]
    pub color: ColorChoice,

    /// Log line format on stderr.
    #[arg(long, default_value = "human", global = true, env = "DEGENSCORE_LOG_FORMAT")]
    pub log_format: LogFormat,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the connect flow and print the scorecard.
    Run(RunArgs),

    /// Print the scorecard for a stored flow.
    Scorecard(ScorecardArgs),

    /// Validate a flow configuration file.
    Validate(ValidateArgs),

    /// Display version information.
    Version(VersionArgs),
}

/// Arguments for `run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to YAML flow configuration (built-in defaults when omitted).
    #[arg(short, long, env = "DEGENSCORE_CONFIG")]
    pub config: Option<PathBuf>,

    /// JSON file remembering connected stages across runs (in-memory when
    /// omitted).
    #[arg(short, long, env = "DEGENSCORE_STORE")]
    pub store: Option<PathBuf>,

    /// Forget stored stages and accounts before running.
    #[arg(long)]
    pub reset: bool,

    /// Wallet provider to connect through.
    #[arg(short, long, default_value = DEFAULT_PROVIDER, env = "DEGENSCORE_PROVIDER")]
    pub provider: String,

    /// Write JSONL events to this file (`-` for stdout).
    #[arg(long, env = "DEGENSCORE_EVENTS")]
    pub events: Option<PathBuf>,

    /// Output format for the final scorecard.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Serve Prometheus metrics on this port.
    #[arg(long, env = "DEGENSCORE_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Override the delay between verification steps (e.g. `800ms`).
    #[arg(long)]
    pub step_interval: Option<humantime::Duration>,

    /// Override the delay between score ticks (e.g. `30ms`).
    #[arg(long)]
    pub score_step_interval: Option<humantime::Duration>,

    /// Override the pause before a stage completes (e.g. `2s`).
    #[arg(long)]
    pub completion_delay: Option<humantime::Duration>,
}

/// Arguments for `scorecard`.
#[derive(Args, Debug)]
pub struct ScorecardArgs {
    /// JSON file written by `run --store`.
    #[arg(short, long, env = "DEGENSCORE_STORE")]
    pub store: PathBuf,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration file to validate.
    pub config: PathBuf,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for `version`.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}
