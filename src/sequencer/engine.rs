//! Sequencer orchestration
//!
//! A [`Sequencer`] turns a static [`SequencerConfig`] into a time-ordered,
//! cancellable stream of [`SequencerState`] snapshots. Each run lives in its
//! own tokio task and publishes through an outlet that refuses to emit once
//! the run is cancelled, so timers that were already queued cannot leak
//! stale snapshots to the caller.

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::SequencerError;
use crate::observability::metrics;

use super::ramp::ScoreRamp;
use super::source::{StepSignals, VerificationSource};
use super::state::{SequencerState, StepList, StepState};

/// Default delay between two verification steps.
pub const DEFAULT_STEP_INTERVAL: Duration = Duration::from_millis(800);

/// Default delay between two score ramp ticks.
pub const DEFAULT_SCORE_STEP_INTERVAL: Duration = Duration::from_millis(30);

/// Default pause between reaching the target and `Done`.
pub const DEFAULT_COMPLETION_DELAY: Duration = Duration::from_secs(2);

/// Upper bound for every interval and delay of a run.
pub const MAX_INTERVAL: Duration = Duration::from_secs(60 * 60);

// ============================================================================
// Configuration
// ============================================================================

/// Static configuration of one sequencer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencerConfig {
    /// Verification steps, completed in order
    pub steps: StepList,
    /// Score the ramp settles on
    pub target_score: u64,
    /// Delay between simulated step completions
    pub step_interval: Duration,
    /// Delay between score ramp ticks
    pub score_step_interval: Duration,
    /// Pause between the last ramp tick and `Done`
    pub completion_delay: Duration,
}

impl SequencerConfig {
    /// Creates a configuration with the default timings.
    #[must_use]
    pub const fn new(steps: StepList, target_score: u64) -> Self {
        Self {
            steps,
            target_score,
            step_interval: DEFAULT_STEP_INTERVAL,
            score_step_interval: DEFAULT_SCORE_STEP_INTERVAL,
            completion_delay: DEFAULT_COMPLETION_DELAY,
        }
    }

    /// Overrides the step interval.
    #[must_use]
    pub const fn with_step_interval(mut self, interval: Duration) -> Self {
        self.step_interval = interval;
        self
    }

    /// Overrides the score tick interval.
    #[must_use]
    pub const fn with_score_step_interval(mut self, interval: Duration) -> Self {
        self.score_step_interval = interval;
        self
    }

    /// Overrides the completion delay.
    #[must_use]
    pub const fn with_completion_delay(mut self, delay: Duration) -> Self {
        self.completion_delay = delay;
        self
    }

    /// Checks the preconditions for scheduling a run.
    ///
    /// # Errors
    ///
    /// Returns `SequencerError::InvalidConfig` when there are no steps, the
    /// target is zero, either tick interval is zero, or any timing exceeds
    /// [`MAX_INTERVAL`].
    pub fn validate(&self) -> Result<(), SequencerError> {
        if self.steps.is_empty() {
            return Err(SequencerError::InvalidConfig(
                "at least one step is required".to_string(),
            ));
        }
        if self.target_score == 0 {
            return Err(SequencerError::InvalidConfig(
                "target score must be greater than zero".to_string(),
            ));
        }
        if self.step_interval.is_zero() {
            return Err(SequencerError::InvalidConfig(
                "step interval must be greater than zero".to_string(),
            ));
        }
        if self.score_step_interval.is_zero() {
            return Err(SequencerError::InvalidConfig(
                "score step interval must be greater than zero".to_string(),
            ));
        }
        for (name, value) in [
            ("step interval", self.step_interval),
            ("score step interval", self.score_step_interval),
            ("completion delay", self.completion_delay),
        ] {
            if value > MAX_INTERVAL {
                return Err(SequencerError::InvalidConfig(format!(
                    "{name} must not exceed {}",
                    humantime::format_duration(MAX_INTERVAL)
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Shared publication state
// ============================================================================

/// What a run has published so far, guarded by one lock so cancellation
/// and publication cannot interleave.
#[derive(Debug)]
struct Published {
    latest: SequencerState,
    cancelled: bool,
    ended: bool,
}

impl Published {
    const fn is_live(&self) -> bool {
        !self.cancelled && !self.ended && !self.latest.is_done()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Publishing side owned by the run task.
struct Outlet {
    run_id: u64,
    shared: Arc<Mutex<Published>>,
    tx: mpsc::UnboundedSender<SequencerState>,
}

impl Outlet {
    /// Publishes a snapshot unless the run was cancelled.
    fn publish(&self, state: SequencerState) -> bool {
        let mut shared = lock(&self.shared);
        if shared.cancelled {
            return false;
        }
        debug_assert!(state.ordinal() >= shared.latest.ordinal());
        shared.latest = state.clone();
        // The receiver may already be gone; the latest snapshot stays readable.
        let _ = self.tx.send(state);
        true
    }
}

impl Drop for Outlet {
    fn drop(&mut self) {
        lock(&self.shared).ended = true;
        debug!(run_id = self.run_id, "sequence outlet closed");
    }
}

// ============================================================================
// Handle
// ============================================================================

/// Caller's view of one run.
///
/// Implements [`Stream`]: yields every snapshot in order and ends after
/// `Done`, or immediately once the run is cancelled.
#[derive(Debug)]
pub struct SequenceHandle {
    run_id: u64,
    token: CancellationToken,
    shared: Arc<Mutex<Published>>,
    snapshots: UnboundedReceiverStream<SequencerState>,
}

impl SequenceHandle {
    /// Identifier of the run, unique per [`Sequencer`].
    #[must_use]
    pub const fn run_id(&self) -> u64 {
        self.run_id
    }

    /// Stops the run. No snapshot is observed after this returns.
    ///
    /// Idempotent, and a no-op once the run has finished.
    pub fn cancel(&self) {
        cancel_shared(self.run_id, &self.shared, &self.token);
    }

    /// Whether the run was cancelled before finishing.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        lock(&self.shared).cancelled
    }

    /// Latest snapshot published by the run.
    #[must_use]
    pub fn current(&self) -> SequencerState {
        lock(&self.shared).latest.clone()
    }

    /// Whether the run will publish nothing more.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        !lock(&self.shared).is_live()
    }

    /// Drains the stream and returns the final score, or `None` if the run
    /// ended without reaching `Done`.
    pub async fn finished(&mut self) -> Option<u64> {
        let mut final_score = None;
        while let Some(state) = self.next().await {
            if let SequencerState::Done { final_score: score } = state {
                final_score = Some(score);
            }
        }
        final_score
    }
}

impl Stream for SequenceHandle {
    type Item = SequencerState;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.is_cancelled() {
            return Poll::Ready(None);
        }
        Pin::new(&mut self.snapshots).poll_next(cx)
    }
}

fn cancel_shared(run_id: u64, shared: &Mutex<Published>, token: &CancellationToken) {
    {
        let mut published = lock(shared);
        if published.is_live() {
            published.cancelled = true;
            info!(run_id, at = published.latest.name(), "sequence cancelled");
            metrics::record_sequence_cancelled();
        }
    }
    token.cancel();
}

// ============================================================================
// Sequencer
// ============================================================================

/// Bookkeeping for the most recent run.
#[derive(Debug)]
struct ActiveRun {
    run_id: u64,
    token: CancellationToken,
    shared: Arc<Mutex<Published>>,
}

/// Owner of at most one live run at a time.
///
/// Dropping the sequencer cancels its live run.
#[derive(Debug, Default)]
pub struct Sequencer {
    next_run: AtomicU64,
    active: Mutex<Option<ActiveRun>>,
}

impl Sequencer {
    /// Creates an idle sequencer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a run whose steps complete on the run's own timer.
    ///
    /// # Errors
    ///
    /// See [`start_with`](Self::start_with).
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn start(&self, config: SequencerConfig) -> Result<SequenceHandle, SequencerError> {
        self.start_with(config, VerificationSource::Simulated)
    }

    /// Starts a run with the given verification source.
    ///
    /// The first `RunningSteps` snapshot is published before this returns;
    /// everything after it happens on the spawned task.
    ///
    /// # Errors
    ///
    /// - `SequencerError::InvalidConfig` if `config` fails validation.
    /// - `SequencerError::AlreadyRunning` if the previous run is neither
    ///   done nor cancelled. The previous run is left untouched.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn start_with(
        &self,
        config: SequencerConfig,
        source: VerificationSource,
    ) -> Result<SequenceHandle, SequencerError> {
        config.validate()?;

        let mut active = lock(&self.active);
        if let Some(run) = active.as_ref() {
            if lock(&run.shared).is_live() {
                warn!(run_id = run.run_id, "start rejected: sequence already running");
                metrics::record_start_rejected();
                return Err(SequencerError::AlreadyRunning { run_id: run.run_id });
            }
        }

        let run_id = self.next_run.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();
        let shared = Arc::new(Mutex::new(Published {
            latest: SequencerState::Idle,
            cancelled: false,
            ended: false,
        }));
        let (tx, rx) = mpsc::unbounded_channel();
        let outlet = Outlet {
            run_id,
            shared: Arc::clone(&shared),
            tx,
        };

        info!(
            run_id,
            steps = config.steps.len(),
            target = config.target_score,
            source = source.kind(),
            "sequence started"
        );
        metrics::record_sequence_started(source.kind());

        outlet.publish(SequencerState::RunningSteps {
            steps: StepState::new(config.steps.len()),
        });
        tokio::spawn(drive(config, source, outlet, token.clone()));

        *active = Some(ActiveRun {
            run_id,
            token: token.clone(),
            shared: Arc::clone(&shared),
        });

        Ok(SequenceHandle {
            run_id,
            token,
            shared,
            snapshots: UnboundedReceiverStream::new(rx),
        })
    }

    /// Cancels the run behind `handle`. Same as [`SequenceHandle::cancel`].
    pub fn cancel(&self, handle: &SequenceHandle) {
        handle.cancel();
    }

    /// Cancels the current run, if any.
    pub fn cancel_active(&self) {
        if let Some(run) = lock(&self.active).as_ref() {
            cancel_shared(run.run_id, &run.shared, &run.token);
        }
    }

    /// Latest snapshot of the current run, or `Idle` before any start.
    #[must_use]
    pub fn state(&self) -> SequencerState {
        lock(&self.active)
            .as_ref()
            .map_or(SequencerState::Idle, |run| lock(&run.shared).latest.clone())
    }

    /// Whether a run is live (started, not done, not cancelled).
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.live_run_id().is_some()
    }

    /// Identifier of the live run, if any.
    #[must_use]
    pub fn live_run_id(&self) -> Option<u64> {
        lock(&self.active)
            .as_ref()
            .filter(|run| lock(&run.shared).is_live())
            .map(|run| run.run_id)
    }
}

impl Drop for Sequencer {
    fn drop(&mut self) {
        self.cancel_active();
    }
}

// ============================================================================
// Run task
// ============================================================================

async fn drive(
    config: SequencerConfig,
    source: VerificationSource,
    outlet: Outlet,
    token: CancellationToken,
) {
    tokio::select! {
        () = token.cancelled() => {
            debug!(run_id = outlet.run_id, "run task stopped by cancellation");
        }
        () = run_to_completion(&config, source, &outlet) => {}
    }
}

/// Walks the run through every state. Deadlines are derived from the
/// run's start, so a late timer never reorders or drops a step.
async fn run_to_completion(config: &SequencerConfig, source: VerificationSource, outlet: &Outlet) {
    let started = Instant::now();
    let mut steps = StepState::new(config.steps.len());

    let scan_done_at = match source {
        VerificationSource::Simulated => {
            let mut deadline = started;
            while !steps.is_complete() {
                let Some(next) = next_deadline(deadline, config.step_interval, outlet) else {
                    return;
                };
                deadline = next;
                sleep_until(deadline).await;
                if !complete_step(config, &mut steps, outlet) {
                    return;
                }
            }
            deadline
        }
        VerificationSource::External(signals) => {
            if !await_external_steps(config, &mut steps, signals, outlet).await {
                return;
            }
            Instant::now()
        }
    };

    info!(run_id = outlet.run_id, "scan complete");
    if !outlet.publish(SequencerState::ScanComplete {
        steps: steps.clone(),
    }) {
        return;
    }

    let mut ramp = ScoreRamp::new(config.target_score);
    let mut deadline = scan_done_at;
    while !ramp.is_complete() {
        let Some(next) = next_deadline(deadline, config.score_step_interval, outlet) else {
            return;
        };
        deadline = next;
        sleep_until(deadline).await;
        ramp.advance();
        if !outlet.publish(SequencerState::RunningScore { ramp }) {
            return;
        }
    }

    let Some(done_at) = next_deadline(deadline, config.completion_delay, outlet) else {
        return;
    };
    sleep_until(done_at).await;
    if outlet.publish(SequencerState::Done {
        final_score: ramp.current(),
    }) {
        info!(
            run_id = outlet.run_id,
            final_score = ramp.current(),
            "sequence done"
        );
        metrics::record_sequence_completed();
    }
}

/// `deadline + by`, or `None` when the sum leaves the clock's range.
fn next_deadline(deadline: Instant, by: Duration, outlet: &Outlet) -> Option<Instant> {
    let next = deadline.checked_add(by);
    if next.is_none() {
        warn!(run_id = outlet.run_id, ?by, "deadline out of range, stopping run");
    }
    next
}

fn complete_step(config: &SequencerConfig, steps: &mut StepState, outlet: &Outlet) -> bool {
    let Some(index) = steps.complete_next() else {
        return true;
    };
    debug!(
        run_id = outlet.run_id,
        index,
        label = config.steps.label(index).unwrap_or_default(),
        "step complete"
    );
    outlet.publish(SequencerState::RunningSteps {
        steps: steps.clone(),
    })
}

/// Completes one step per external signal.
///
/// Returns `false` when the run should stop: the outlet was cancelled or
/// every completer was dropped before the last step.
async fn await_external_steps(
    config: &SequencerConfig,
    steps: &mut StepState,
    mut signals: StepSignals,
    outlet: &Outlet,
) -> bool {
    while !steps.is_complete() {
        if signals.next().await.is_none() {
            warn!(
                run_id = outlet.run_id,
                completed = steps.completed_count(),
                total = steps.len(),
                "external verification source closed before all steps completed"
            );
            return false;
        }
        if !complete_step(config, steps, outlet) {
            return false;
        }
    }
    true
}
