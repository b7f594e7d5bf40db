//! Drives every configured stage in order and produces the scorecard.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::config::FlowConfig;
use crate::error::{FlowError, Result};
use crate::observability::metrics;
use crate::scorecard::Scorecard;
use crate::sequencer::{SequencerState, StepList};

use super::connector::{ConnectedAccount, Connector};
use super::context::FlowContext;
use super::page::ConnectPage;
use super::stage::{Stage, VerificationMode};
use super::store::KeyValueStore;

/// Provider used when none is given.
pub const DEFAULT_PROVIDER: &str = "metamask";

// ============================================================================
// Observer
// ============================================================================

/// Receives progress from a [`FlowRunner`]. Every method defaults to a
/// no-op.
pub trait FlowObserver: Send + Sync {
    /// The flow is about to run `stages` in order.
    fn flow_started(&self, _stages: &[Stage]) {}

    /// A stage was restored from storage and will not run again.
    fn stage_skipped(&self, _stage: Stage, _score: u64) {}

    /// A stage's sequence started.
    fn stage_started(&self, _stage: Stage, _steps: &StepList, _verification: VerificationMode) {}

    /// The external connector returned an account.
    fn account_connected(&self, _stage: Stage, _account: &ConnectedAccount) {}

    /// A snapshot was observed, in order.
    fn snapshot(&self, _stage: Stage, _steps: &StepList, _state: &SequencerState) {}

    /// A stage was cancelled before `Done`.
    fn stage_cancelled(&self, _stage: Stage) {}

    /// A stage reached `Done` and was recorded.
    fn stage_connected(&self, _stage: Stage, _score: u64) {}

    /// Every stage is connected.
    fn flow_finished(&self, _scorecard: &Scorecard) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl FlowObserver for NoopObserver {}

/// Fans every callback out to several observers.
#[derive(Default)]
pub struct ObserverSet {
    observers: Vec<Box<dyn FlowObserver>>,
}

impl std::fmt::Debug for ObserverSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverSet")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl ObserverSet {
    /// Empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an observer.
    pub fn push(&mut self, observer: impl FlowObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Number of observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Returns `true` if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl FlowObserver for ObserverSet {
    fn flow_started(&self, stages: &[Stage]) {
        self.observers.iter().for_each(|o| o.flow_started(stages));
    }

    fn stage_skipped(&self, stage: Stage, score: u64) {
        self.observers.iter().for_each(|o| o.stage_skipped(stage, score));
    }

    fn stage_started(&self, stage: Stage, steps: &StepList, verification: VerificationMode) {
        self.observers
            .iter()
            .for_each(|o| o.stage_started(stage, steps, verification));
    }

    fn account_connected(&self, stage: Stage, account: &ConnectedAccount) {
        self.observers
            .iter()
            .for_each(|o| o.account_connected(stage, account));
    }

    fn snapshot(&self, stage: Stage, steps: &StepList, state: &SequencerState) {
        self.observers
            .iter()
            .for_each(|o| o.snapshot(stage, steps, state));
    }

    fn stage_cancelled(&self, stage: Stage) {
        self.observers.iter().for_each(|o| o.stage_cancelled(stage));
    }

    fn stage_connected(&self, stage: Stage, score: u64) {
        self.observers
            .iter()
            .for_each(|o| o.stage_connected(stage, score));
    }

    fn flow_finished(&self, scorecard: &Scorecard) {
        self.observers.iter().for_each(|o| o.flow_finished(scorecard));
    }
}

// ============================================================================
// Runner
// ============================================================================

/// Runs the connect flow end to end.
pub struct FlowRunner {
    config: Arc<FlowConfig>,
    store: Arc<dyn KeyValueStore>,
    connector: Arc<dyn Connector>,
    provider: String,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for FlowRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowRunner")
            .field("stages", &self.config.order())
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

impl FlowRunner {
    /// Creates a runner using [`DEFAULT_PROVIDER`].
    #[must_use]
    pub fn new(
        config: Arc<FlowConfig>,
        store: Arc<dyn KeyValueStore>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self {
            config,
            store,
            connector,
            provider: DEFAULT_PROVIDER.to_string(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Sets the provider external stages connect through.
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    /// Cancels the stage in progress when `token` fires.
    #[must_use]
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Runs every stage not already connected, then builds the scorecard.
    ///
    /// Stages recorded in storage are skipped, so an interrupted flow
    /// resumes where it stopped.
    ///
    /// # Errors
    ///
    /// Fails on the first stage that cannot be mounted, connected or
    /// recorded, and with `FlowError::Interrupted` when a sequence ends
    /// without reaching `Done`.
    #[instrument(skip_all, fields(provider = %self.provider))]
    pub async fn run(&self, observer: &dyn FlowObserver) -> Result<Scorecard> {
        let mut ctx = FlowContext::load(self.store.as_ref())?;
        let order = self.config.order();
        if ctx.set_order(&order) {
            ctx.save(self.store.as_ref())?;
        }
        observer.flow_started(&order);

        for stage in order {
            if let Some(score) = ctx.score(stage) {
                info!(%stage, score, "stage already connected, skipping");
                observer.stage_skipped(stage, score);
                continue;
            }
            self.run_stage(stage, &mut ctx, observer).await?;
        }

        let scorecard = Scorecard::from_scores(ctx.scores());
        info!(total = scorecard.total, badge = scorecard.badge, "flow finished");
        observer.flow_finished(&scorecard);
        Ok(scorecard)
    }

    /// Runs one stage to `Done` and records it in `ctx`. Returns the final
    /// score.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub async fn run_stage(
        &self,
        stage: Stage,
        ctx: &mut FlowContext,
        observer: &dyn FlowObserver,
    ) -> Result<u64> {
        let page = ConnectPage::mount(&self.config, stage, ctx)?;
        let started = Instant::now();
        let mut run = page
            .begin(&self.connector, &self.provider, self.store.as_ref())
            .await?;
        observer.stage_started(stage, page.steps(), page.verification());
        if let Some(account) = &run.account {
            observer.account_connected(stage, account);
        }

        let mut final_score = None;
        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => {
                    run.handle.cancel();
                    warn!(%stage, "stage cancelled by shutdown");
                    observer.stage_cancelled(stage);
                    break;
                }
                next = run.handle.next() => {
                    let Some(state) = next else { break };
                    observer.snapshot(stage, page.steps(), &state);
                    if let SequencerState::Done { final_score: score } = state {
                        final_score = Some(score);
                    }
                }
            }
        }

        let Some(score) = final_score else {
            return Err(FlowError::Interrupted(stage).into());
        };
        page.complete(ctx, score, run.account.as_ref(), self.store.as_ref())?;
        metrics::record_stage_connected(stage.as_str(), started.elapsed());
        observer.stage_connected(stage, score);
        Ok(score)
    }
}
