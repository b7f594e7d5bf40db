//! Configuration schema types
//!
//! Strongly-typed representation of a flow configuration file. Every field
//! is optional in YAML; omitted values fall back to the built-in stage
//! defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::FlowError;
use crate::flow::{Stage, VerificationMode};
use crate::sequencer::engine::{
    DEFAULT_COMPLETION_DELAY, DEFAULT_SCORE_STEP_INTERVAL, DEFAULT_STEP_INTERVAL,
};
use crate::sequencer::{SequencerConfig, StepList};

// ============================================================================
// Root
// ============================================================================

/// Root configuration for the connect flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlowConfig {
    /// Timer settings shared by every stage
    #[serde(default)]
    pub timing: TimingConfig,

    /// Stages in the order they must be connected
    #[serde(default = "default_stages")]
    pub stages: Vec<StageConfig>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            timing: TimingConfig::default(),
            stages: default_stages(),
        }
    }
}

fn default_stages() -> Vec<StageConfig> {
    Stage::ALL.into_iter().map(StageConfig::new).collect()
}

impl FlowConfig {
    /// Configuration of `stage`, if it is part of the flow.
    #[must_use]
    pub fn stage(&self, stage: Stage) -> Option<&StageConfig> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    /// Stages in flow order.
    #[must_use]
    pub fn order(&self) -> Vec<Stage> {
        self.stages.iter().map(|s| s.stage).collect()
    }

    /// Stage that must be connected before `stage` unlocks.
    #[must_use]
    pub fn prerequisite(&self, stage: Stage) -> Option<Stage> {
        let index = self.stages.iter().position(|s| s.stage == stage)?;
        index
            .checked_sub(1)
            .and_then(|prev| self.stages.get(prev))
            .map(|s| s.stage)
    }

    /// Stage that follows `stage`, or `None` for the last one.
    #[must_use]
    pub fn next(&self, stage: Stage) -> Option<Stage> {
        let index = self.stages.iter().position(|s| s.stage == stage)?;
        self.stages.get(index + 1).map(|s| s.stage)
    }

    /// Builds the sequencer configuration for `stage`.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::UnknownStage` if `stage` is not configured.
    pub fn sequencer_config(&self, stage: Stage) -> Result<SequencerConfig, FlowError> {
        let stage_config = self.stage(stage).ok_or(FlowError::UnknownStage(stage))?;
        Ok(
            SequencerConfig::new(stage_config.step_list(), stage_config.target_score())
                .with_step_interval(self.timing.step_interval)
                .with_score_step_interval(self.timing.score_step_interval)
                .with_completion_delay(self.timing.completion_delay),
        )
    }
}

// ============================================================================
// Timing
// ============================================================================

/// Timer settings, written as humantime strings (`800ms`, `2s`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimingConfig {
    /// Delay between verification steps
    #[serde(default = "default_step_interval", with = "humantime_serde")]
    pub step_interval: Duration,

    /// Delay between score ramp ticks
    #[serde(default = "default_score_step_interval", with = "humantime_serde")]
    pub score_step_interval: Duration,

    /// Pause between reaching the target and completion
    #[serde(default = "default_completion_delay", with = "humantime_serde")]
    pub completion_delay: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            step_interval: DEFAULT_STEP_INTERVAL,
            score_step_interval: DEFAULT_SCORE_STEP_INTERVAL,
            completion_delay: DEFAULT_COMPLETION_DELAY,
        }
    }
}

const fn default_step_interval() -> Duration {
    DEFAULT_STEP_INTERVAL
}

const fn default_score_step_interval() -> Duration {
    DEFAULT_SCORE_STEP_INTERVAL
}

const fn default_completion_delay() -> Duration {
    DEFAULT_COMPLETION_DELAY
}

// ============================================================================
// Stages
// ============================================================================

/// One stage entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageConfig {
    /// Which stage this entry configures
    pub stage: Stage,

    /// Score the ramp settles on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_score: Option<u64>,

    /// Verification step labels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<String>>,

    /// Where step completions come from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationMode>,
}

impl StageConfig {
    /// Entry for `stage` with every value defaulted.
    #[must_use]
    pub const fn new(stage: Stage) -> Self {
        Self {
            stage,
            target_score: None,
            steps: None,
            verification: None,
        }
    }

    /// Configured target, or the stage default.
    #[must_use]
    pub fn target_score(&self) -> u64 {
        self.target_score
            .unwrap_or_else(|| self.stage.default_target_score())
    }

    /// Configured step labels, or the stage defaults.
    #[must_use]
    pub fn step_list(&self) -> StepList {
        self.steps.as_ref().map_or_else(
            || StepList::new(self.stage.default_steps().iter().copied()),
            |steps| StepList::new(steps.iter().cloned()),
        )
    }

    /// Configured verification mode, or the stage default.
    #[must_use]
    pub fn verification(&self) -> VerificationMode {
        self.verification
            .unwrap_or_else(|| self.stage.default_verification())
    }
}
