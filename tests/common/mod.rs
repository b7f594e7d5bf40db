//! Shared integration-test harness: fixture paths, a CLI runner, and a
//! recording observer for flow tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Command, Output};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use degenscore::config::FlowConfig;
use degenscore::flow::{ConnectedAccount, FlowObserver, Stage, VerificationMode};
use degenscore::scorecard::Scorecard;
use degenscore::sequencer::{SequencerState, StepList};

/// Environment variables the CLI reads; cleared so the host cannot leak in.
const CLI_ENV: &[&str] = &[
    "DEGENSCORE_CONFIG",
    "DEGENSCORE_STORE",
    "DEGENSCORE_PROVIDER",
    "DEGENSCORE_EVENTS",
    "DEGENSCORE_METRICS_PORT",
    "DEGENSCORE_COLOR",
    "DEGENSCORE_LOG_LEVEL",
    "DEGENSCORE_LOG_FORMAT",
];

/// Absolute path to a file under `tests/fixtures`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Runs the `degenscore` binary to completion.
#[allow(clippy::missing_panics_doc)]
pub fn run_cli(args: &[&str]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_degenscore"));
    for var in CLI_ENV {
        command.env_remove(var);
    }
    command
        .args(args)
        .output()
        .expect("failed to spawn degenscore")
}

/// Default flow with millisecond timings.
pub fn fast_config() -> FlowConfig {
    let mut config = FlowConfig::default();
    config.timing.step_interval = Duration::from_millis(1);
    config.timing.score_step_interval = Duration::from_millis(1);
    config.timing.completion_delay = Duration::from_millis(1);
    config
}

/// One observed callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seen {
    FlowStarted(Vec<Stage>),
    Skipped(Stage, u64),
    Started(Stage, usize, VerificationMode),
    Account(Stage, String),
    Snapshot(Stage, SequencerState),
    Cancelled(Stage),
    Connected(Stage, u64),
    Finished(u64),
}

/// Observer that records every callback in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    /// Snapshots observed for `stage`, in order.
    pub fn snapshots(&self, stage: Stage) -> Vec<SequencerState> {
        self.seen()
            .into_iter()
            .filter_map(|s| match s {
                Seen::Snapshot(st, state) if st == stage => Some(state),
                _ => None,
            })
            .collect()
    }

    fn push(&self, seen: Seen) {
        self.seen.lock().unwrap().push(seen);
    }
}

impl FlowObserver for RecordingObserver {
    fn flow_started(&self, stages: &[Stage]) {
        self.push(Seen::FlowStarted(stages.to_vec()));
    }

    fn stage_skipped(&self, stage: Stage, score: u64) {
        self.push(Seen::Skipped(stage, score));
    }

    fn stage_started(&self, stage: Stage, steps: &StepList, verification: VerificationMode) {
        self.push(Seen::Started(stage, steps.len(), verification));
    }

    fn account_connected(&self, stage: Stage, account: &ConnectedAccount) {
        self.push(Seen::Account(stage, account.provider.clone()));
    }

    fn snapshot(&self, stage: Stage, _steps: &StepList, state: &SequencerState) {
        self.push(Seen::Snapshot(stage, state.clone()));
    }

    fn stage_cancelled(&self, stage: Stage) {
        self.push(Seen::Cancelled(stage));
    }

    fn stage_connected(&self, stage: Stage, score: u64) {
        self.push(Seen::Connected(stage, score));
    }

    fn flow_finished(&self, scorecard: &Scorecard) {
        self.push(Seen::Finished(scorecard.total));
    }
}
