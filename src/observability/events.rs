//! Structured event stream for `degenscore`.
//!
//! Discrete, typed events emitted while the connect flow runs. Events are
//! serialized as newline-delimited JSON (JSONL) and carry a monotonically
//! increasing sequence number.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::flow::{ConnectedAccount, FlowObserver, Stage, VerificationMode};
use crate::scorecard::Scorecard;
use crate::sequencer::{SequencerState, StepList};

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event emitted during a flow run.
///
/// Tagged with `"type"` when serialized so consumers can dispatch on it.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The flow started.
    FlowStarted {
        /// When the flow started.
        timestamp: DateTime<Utc>,
        /// Identifier of this flow run.
        run_id: Uuid,
        /// Stages in the order they will run.
        stages: Vec<Stage>,
    },

    /// A stage was restored from storage instead of running.
    StageSkipped {
        /// When the stage was skipped.
        timestamp: DateTime<Utc>,
        /// Skipped stage.
        stage: Stage,
        /// Score recorded earlier.
        score: u64,
    },

    /// A stage's sequence started.
    StageStarted {
        /// When the sequence started.
        timestamp: DateTime<Utc>,
        /// Stage being verified.
        stage: Stage,
        /// Step labels in order.
        steps: Vec<String>,
        /// Where step completions come from.
        verification: VerificationMode,
    },

    /// The external connector returned an account.
    AccountConnected {
        /// When the account was connected.
        timestamp: DateTime<Utc>,
        /// Stage that connected.
        stage: Stage,
        /// Provider id.
        provider: String,
        /// Account identifier.
        account: String,
    },

    /// One verification step completed.
    StepCompleted {
        /// When the step completed.
        timestamp: DateTime<Utc>,
        /// Stage being verified.
        stage: Stage,
        /// Zero-based step index.
        index: usize,
        /// Step label.
        label: String,
    },

    /// Every step of the stage completed.
    ScanCompleted {
        /// When the scan completed.
        timestamp: DateTime<Utc>,
        /// Stage being verified.
        stage: Stage,
    },

    /// The score ramp advanced.
    ScoreTick {
        /// When the tick happened.
        timestamp: DateTime<Utc>,
        /// Stage being scored.
        stage: Stage,
        /// Displayed score.
        current: u64,
        /// Score the ramp settles on.
        target: u64,
    },

    /// The sequence reached its terminal state.
    StageDone {
        /// When the sequence finished.
        timestamp: DateTime<Utc>,
        /// Stage that finished.
        stage: Stage,
        /// Final score.
        final_score: u64,
    },

    /// The sequence was cancelled before finishing.
    StageCancelled {
        /// When the cancellation happened.
        timestamp: DateTime<Utc>,
        /// Stage that was cancelled.
        stage: Stage,
    },

    /// The stage was recorded as connected.
    StageConnected {
        /// When the stage was recorded.
        timestamp: DateTime<Utc>,
        /// Connected stage.
        stage: Stage,
        /// Recorded score.
        score: u64,
    },

    /// Every stage is connected and the scorecard is ready.
    FlowFinished {
        /// When the flow finished.
        timestamp: DateTime<Utc>,
        /// Identifier of this flow run.
        run_id: Uuid,
        /// Combined score.
        total: u64,
        /// "Top N%" figure.
        percentile: u64,
        /// Leaderboard position.
        rank: u32,
        /// Badge text.
        badge: String,
    },
}

// ---------------------------------------------------------------------------
// Envelope (adds sequence number via serde flatten)
// ---------------------------------------------------------------------------

/// Wraps an [`Event`] with a monotonically increasing sequence number.
#[derive(Debug, Serialize)]
struct EventEnvelope {
    /// Zero-based, monotonically increasing sequence counter.
    sequence: u64,
    /// The wrapped event (flattened into the same JSON object).
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Each call to [`emit`](Self::emit) increments the sequence counter,
/// serializes the event as one JSON line, and flushes. Serialization or I/O
/// failures are dropped so the flow never fails on observability.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
    run_id: Uuid,
}

// Box<dyn Write> is not Debug.
impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("run_id", &self.run_id)
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
            run_id: Uuid::new_v4(),
        }
    }

    /// Creates an emitter that writes to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Creates an emitter that discards every event.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Creates an emitter that writes to a file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Identifier stamped on flow-level events.
    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Emits an event as a single JSONL line.
    pub fn emit(&self, event: Event) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            sequence: seq,
            event,
        };

        if let Ok(mut w) = self.writer.lock() {
            if let Ok(line) = serde_json::to_string(&envelope) {
                let _ = writeln!(w, "{line}");
                let _ = w.flush();
            }
        }
    }

    /// Returns the number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

/// Maps a snapshot to the event it announces. The initial all-false
/// `RunningSteps` announces nothing; `StageStarted` already covered it.
fn snapshot_event(stage: Stage, steps: &StepList, state: &SequencerState) -> Option<Event> {
    let timestamp = Utc::now();
    match state {
        SequencerState::Idle => None,
        SequencerState::RunningSteps { steps: progress } => {
            let index = progress.completed_count().checked_sub(1)?;
            Some(Event::StepCompleted {
                timestamp,
                stage,
                index,
                label: steps.label(index).unwrap_or_default().to_owned(),
            })
        }
        SequencerState::ScanComplete { .. } => Some(Event::ScanCompleted { timestamp, stage }),
        SequencerState::RunningScore { ramp } => Some(Event::ScoreTick {
            timestamp,
            stage,
            current: ramp.current(),
            target: ramp.target(),
        }),
        SequencerState::Done { final_score } => Some(Event::StageDone {
            timestamp,
            stage,
            final_score: *final_score,
        }),
    }
}

impl FlowObserver for EventEmitter {
    fn flow_started(&self, stages: &[Stage]) {
        self.emit(Event::FlowStarted {
            timestamp: Utc::now(),
            run_id: self.run_id,
            stages: stages.to_vec(),
        });
    }

    fn stage_skipped(&self, stage: Stage, score: u64) {
        self.emit(Event::StageSkipped {
            timestamp: Utc::now(),
            stage,
            score,
        });
    }

    fn stage_started(&self, stage: Stage, steps: &StepList, verification: VerificationMode) {
        self.emit(Event::StageStarted {
            timestamp: Utc::now(),
            stage,
            steps: steps.iter().map(ToOwned::to_owned).collect(),
            verification,
        });
    }

    fn account_connected(&self, stage: Stage, account: &ConnectedAccount) {
        self.emit(Event::AccountConnected {
            timestamp: Utc::now(),
            stage,
            provider: account.provider.clone(),
            account: account.account.clone(),
        });
    }

    fn snapshot(&self, stage: Stage, steps: &StepList, state: &SequencerState) {
        if let Some(event) = snapshot_event(stage, steps, state) {
            self.emit(event);
        }
    }

    fn stage_cancelled(&self, stage: Stage) {
        self.emit(Event::StageCancelled {
            timestamp: Utc::now(),
            stage,
        });
    }

    fn stage_connected(&self, stage: Stage, score: u64) {
        self.emit(Event::StageConnected {
            timestamp: Utc::now(),
            stage,
            score,
        });
    }

    fn flow_finished(&self, scorecard: &Scorecard) {
        self.emit(Event::FlowFinished {
            timestamp: Utc::now(),
            run_id: self.run_id,
            total: scorecard.total,
            percentile: scorecard.percentile,
            rank: scorecard.rank,
            badge: scorecard.badge.to_owned(),
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex as StdMutex};

    use super::*;
    use crate::scorecard::StageScores;
    use crate::sequencer::{ScoreRamp, StepState};

    /// In-memory writer for capturing emitter output in tests.
    #[derive(Clone)]
    struct TestWriter(Arc<StdMutex<Vec<u8>>>);

    impl TestWriter {
        fn new() -> Self {
            Self(Arc::new(StdMutex::new(Vec::new())))
        }

        fn lines(&self) -> Vec<serde_json::Value> {
            let buf = self.0.lock().unwrap();
            String::from_utf8_lossy(&buf)
                .lines()
                .map(|l| serde_json::from_str(l).unwrap())
                .collect()
        }
    }

    impl Write for TestWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn steps() -> StepList {
        StepList::new(["first", "second"])
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let event = Event::StageDone {
            timestamp: DateTime::parse_from_rfc3339("2025-02-04T10:15:30Z")
                .unwrap()
                .with_timezone(&Utc),
            stage: Stage::Wallet,
            final_score: 6750,
        };
        let parsed = serde_json::to_value(&event).unwrap();
        assert_eq!(parsed["type"], "StageDone");
        assert_eq!(parsed["stage"], "wallet");
        assert_eq!(parsed["final_score"], 6750);
    }

    #[test]
    fn emitter_increments_sequence() {
        let tw = TestWriter::new();
        let emitter = EventEmitter::new(Box::new(tw.clone()));
        emitter.flow_started(&Stage::ALL);
        emitter.stage_cancelled(Stage::Twitter);

        assert_eq!(emitter.event_count(), 2);
        let lines = tw.lines();
        assert_eq!(lines[0]["sequence"], 0);
        assert_eq!(lines[0]["type"], "FlowStarted");
        assert_eq!(lines[0]["run_id"], emitter.run_id().to_string());
        assert_eq!(lines[1]["sequence"], 1);
        assert!(lines[1].get("event").is_none());
    }

    #[test]
    fn snapshots_map_to_events() {
        let tw = TestWriter::new();
        let emitter = EventEmitter::new(Box::new(tw.clone()));
        let list = steps();

        let mut progress = StepState::new(2);
        emitter.snapshot(Stage::Telegram, &list, &SequencerState::RunningSteps {
            steps: progress.clone(),
        });
        progress.complete_next();
        emitter.snapshot(Stage::Telegram, &list, &SequencerState::RunningSteps {
            steps: progress.clone(),
        });
        progress.complete_next();
        emitter.snapshot(Stage::Telegram, &list, &SequencerState::ScanComplete {
            steps: progress,
        });
        let mut ramp = ScoreRamp::new(100);
        ramp.advance();
        emitter.snapshot(Stage::Telegram, &list, &SequencerState::RunningScore { ramp });
        emitter.snapshot(Stage::Telegram, &list, &SequencerState::Done { final_score: 100 });

        let types: Vec<_> = tw
            .lines()
            .iter()
            .map(|l| l["type"].as_str().unwrap().to_owned())
            .collect();
        assert_eq!(
            types,
            ["StepCompleted", "ScanCompleted", "ScoreTick", "StageDone"]
        );
        let lines = tw.lines();
        assert_eq!(lines[0]["label"], "first");
        assert_eq!(lines[0]["index"], 0);
        assert_eq!(lines[2]["current"], 2);
        assert_eq!(lines[2]["target"], 100);
    }

    #[test]
    fn flow_finished_carries_scorecard() {
        let tw = TestWriter::new();
        let emitter = EventEmitter::new(Box::new(tw.clone()));
        let card = Scorecard::from_scores(StageScores {
            twitter: 4200,
            telegram: 5250,
            wallet: 6750,
        });
        emitter.flow_finished(&card);
        let lines = tw.lines();
        assert_eq!(lines[0]["total"], 810);
        assert_eq!(lines[0]["badge"], "Degen Master");
    }

    #[test]
    fn noop_emitter_counts() {
        let emitter = EventEmitter::noop();
        emitter.stage_connected(Stage::Twitter, 4200);
        assert_eq!(emitter.event_count(), 1);
    }
}
