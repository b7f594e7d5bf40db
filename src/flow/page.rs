//! One connect stage as a page.
//!
//! A [`ConnectPage`] is mounted against the [`FlowContext`], owns exactly one
//! [`Sequencer`], and records the stage once its run reaches `Done`.
//! Dropping the page drops the sequencer, which cancels any live run.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::FlowConfig;
use crate::error::{ConnectError, FlowError, Result, SequencerError};
use crate::observability::metrics;
use crate::sequencer::{SequenceHandle, Sequencer, SequencerConfig, StepList, VerificationSource};

use super::connector::{ConnectedAccount, Connector};
use super::context::{FlowContext, account_key};
use super::stage::{Stage, VerificationMode};
use super::store::KeyValueStore;

/// A started stage: the snapshot stream plus the account it runs for.
///
/// Dropping it stops the external verification task, if any.
#[derive(Debug)]
pub struct StageRun {
    /// Snapshot stream of the stage's sequence
    pub handle: SequenceHandle,
    /// Account connected for externally verified stages
    pub account: Option<ConnectedAccount>,
    verifier: Option<JoinHandle<()>>,
}

impl Drop for StageRun {
    fn drop(&mut self) {
        if let Some(verifier) = self.verifier.take() {
            verifier.abort();
        }
    }
}

/// Page for a single connect stage.
#[derive(Debug)]
pub struct ConnectPage {
    stage: Stage,
    config: SequencerConfig,
    verification: VerificationMode,
    next: Option<Stage>,
    sequencer: Sequencer,
}

impl ConnectPage {
    /// Mounts `stage`, checking that the stage before it is connected.
    ///
    /// # Errors
    ///
    /// - `FlowError::UnknownStage` if the flow does not configure `stage`.
    /// - `FlowError::PrerequisiteMissing` naming the stage to redirect to
    ///   when the previous stage is not connected yet.
    pub fn mount(flow: &FlowConfig, stage: Stage, ctx: &FlowContext) -> Result<Self> {
        let stage_config = flow.stage(stage).ok_or(FlowError::UnknownStage(stage))?;
        if let Some(requires) = flow.prerequisite(stage) {
            if !ctx.is_connected(requires) {
                warn!(%stage, %requires, "stage locked");
                return Err(FlowError::PrerequisiteMissing { stage, requires }.into());
            }
        }
        Ok(Self {
            stage,
            config: flow.sequencer_config(stage)?,
            verification: stage_config.verification(),
            next: flow.next(stage),
            sequencer: Sequencer::new(),
        })
    }

    /// Stage this page drives.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Verification step labels.
    #[must_use]
    pub const fn steps(&self) -> &StepList {
        &self.config.steps
    }

    /// Sequencer configuration the page starts runs with.
    #[must_use]
    pub const fn config(&self) -> &SequencerConfig {
        &self.config
    }

    /// Where step completions come from.
    #[must_use]
    pub const fn verification(&self) -> VerificationMode {
        self.verification
    }

    /// Stage to move to after this one, if any.
    #[must_use]
    pub const fn next(&self) -> Option<Stage> {
        self.next
    }

    /// Whether a run is live.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.sequencer.is_running()
    }

    /// Account remembered from an earlier connection for this stage.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Storage` if the store fails, or
    /// `FlowError::CorruptState` if the stored value cannot be decoded.
    pub fn stored_account(&self, store: &dyn KeyValueStore) -> Result<Option<ConnectedAccount>> {
        let key = account_key(self.stage);
        let Some(raw) = store.get(&key)? else {
            return Ok(None);
        };
        let account = serde_json::from_str(&raw).map_err(|e| FlowError::CorruptState {
            key,
            message: e.to_string(),
        })?;
        Ok(Some(account))
    }

    /// Starts the stage's sequence.
    ///
    /// Simulated stages start immediately. External stages reuse a stored
    /// account when one exists (the "already connected" case), otherwise
    /// connect through `provider` and remember the account, then hand step
    /// reporting to [`Connector::verify`].
    ///
    /// # Errors
    ///
    /// - `ConnectError` variants when connecting fails; nothing is started.
    /// - `SequencerError::AlreadyRunning` if a run is still live.
    /// - `FlowError::Storage` if the account cannot be stored.
    pub async fn begin(
        &self,
        connector: &Arc<dyn Connector>,
        provider: &str,
        store: &dyn KeyValueStore,
    ) -> Result<StageRun> {
        match self.verification {
            VerificationMode::Simulated => {
                let handle = self.sequencer.start(self.config.clone())?;
                Ok(StageRun {
                    handle,
                    account: None,
                    verifier: None,
                })
            }
            VerificationMode::External => {
                if let Some(run_id) = self.sequencer.live_run_id() {
                    return Err(SequencerError::AlreadyRunning { run_id }.into());
                }
                let account = match self.stored_account(store)? {
                    Some(account) => {
                        info!(stage = %self.stage, provider = %account.provider, "already connected");
                        account
                    }
                    None => {
                        let account = connector
                            .connect(provider)
                            .await
                            .inspect_err(|e| record_connect_failure(e, provider))?;
                        let raw = serde_json::to_string(&account)?;
                        store.set(&account_key(self.stage), &raw)?;
                        account
                    }
                };

                let (completer, source) = VerificationSource::external();
                let handle = self.sequencer.start_with(self.config.clone(), source)?;

                let verifier = {
                    let connector = Arc::clone(connector);
                    let account = account.clone();
                    let steps = self.config.steps.clone();
                    tokio::spawn(async move {
                        connector.verify(&account, &steps, completer).await;
                    })
                };
                debug!(stage = %self.stage, "external verification started");

                Ok(StageRun {
                    handle,
                    account: Some(account),
                    verifier: Some(verifier),
                })
            }
        }
    }

    /// Records the stage as connected with `final_score` and persists the
    /// context. Returns the stage to navigate to next.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::Storage` if the context cannot be saved.
    pub fn complete(
        &self,
        ctx: &mut FlowContext,
        final_score: u64,
        account: Option<&ConnectedAccount>,
        store: &dyn KeyValueStore,
    ) -> Result<Option<Stage>> {
        ctx.record(self.stage, final_score, account.map(|a| a.account.clone()));
        ctx.save(store)?;
        info!(stage = %self.stage, final_score, "stage connected");
        Ok(self.next)
    }

    /// Cancels the live run, if any.
    pub fn cancel(&self) {
        self.sequencer.cancel_active();
    }
}

fn record_connect_failure(err: &ConnectError, provider: &str) {
    let kind = match err {
        ConnectError::ConnectorUnavailable { .. } => "unavailable",
        ConnectError::ConnectionRejected { .. } => "rejected",
    };
    warn!(provider, error = %err, "connect failed");
    metrics::record_connect_error(kind, provider);
}
