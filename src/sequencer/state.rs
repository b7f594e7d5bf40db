//! Sequencer state representation
//!
//! The tagged state machine a sequencer run moves through, plus the
//! step list and step completion vector it carries.

use std::sync::Arc;

use serde::Serialize;

use super::ramp::ScoreRamp;

/// Ordered, immutable list of verification step labels.
///
/// Cloning is cheap; every clone shares the same labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepList(Arc<[String]>);

impl StepList {
    /// Creates a step list from labels.
    #[must_use]
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(labels.into_iter().map(Into::into).collect())
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Label at `index`, or `None` if out of bounds.
    #[must_use]
    pub fn label(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    /// Iterates labels in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for StepList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Completion flags, index-aligned with a [`StepList`].
///
/// Flags only ever go from `false` to `true`, and always in index order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StepState(Vec<bool>);

impl StepState {
    /// All-false state for `len` steps.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self(vec![false; len])
    }

    /// Marks the first incomplete step as done.
    ///
    /// Returns the index that was marked, or `None` when every step was
    /// already complete.
    pub fn complete_next(&mut self) -> Option<usize> {
        let index = self.completed_count();
        let flag = self.0.get_mut(index)?;
        *flag = true;
        Some(index)
    }

    /// Number of completed steps.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.0.iter().take_while(|done| **done).count()
    }

    /// Whether step `index` is complete.
    #[must_use]
    pub fn is_completed(&self, index: usize) -> bool {
        self.0.get(index).copied().unwrap_or(false)
    }

    /// Whether every step is complete.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.0.iter().all(|done| *done)
    }

    /// Total number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw flags.
    #[must_use]
    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }
}

/// State of one sequencer run.
///
/// Transitions only move forward:
/// `Idle → RunningSteps → ScanComplete → RunningScore → Done`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SequencerState {
    /// Nothing started yet.
    Idle,
    /// Verification steps are being marked complete.
    RunningSteps {
        /// Completion flags so far.
        steps: StepState,
    },
    /// Every step is complete; the score ramp has not ticked yet.
    ScanComplete {
        /// Final (all-true) completion flags.
        steps: StepState,
    },
    /// The score counter is ramping toward its target.
    RunningScore {
        /// Current ramp position.
        ramp: ScoreRamp,
    },
    /// The run finished.
    Done {
        /// Score the ramp settled on.
        final_score: u64,
    },
}

impl SequencerState {
    /// Position in the forward order, used to check that transitions
    /// never go backwards.
    #[must_use]
    pub const fn ordinal(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::RunningSteps { .. } => 1,
            Self::ScanComplete { .. } => 2,
            Self::RunningScore { .. } => 3,
            Self::Done { .. } => 4,
        }
    }

    /// Short name of the variant.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::RunningSteps { .. } => "running_steps",
            Self::ScanComplete { .. } => "scan_complete",
            Self::RunningScore { .. } => "running_score",
            Self::Done { .. } => "done",
        }
    }

    /// Whether this is the terminal state.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }

    /// Score currently shown: ramp position, final score, or zero.
    #[must_use]
    pub const fn displayed_score(&self) -> u64 {
        match self {
            Self::RunningScore { ramp } => ramp.current(),
            Self::Done { final_score } => *final_score,
            _ => 0,
        }
    }

    /// Step flags for the step-phase variants.
    #[must_use]
    pub const fn steps(&self) -> Option<&StepState> {
        match self {
            Self::RunningSteps { steps } | Self::ScanComplete { steps } => Some(steps),
            _ => None,
        }
    }
}

impl std::fmt::Display for SequencerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::RunningSteps { steps } => write!(
                f,
                "running steps ({}/{})",
                steps.completed_count(),
                steps.len()
            ),
            Self::ScanComplete { steps } => write!(f, "scan complete ({} steps)", steps.len()),
            Self::RunningScore { ramp } => {
                write!(f, "running score ({}/{})", ramp.current(), ramp.target())
            }
            Self::Done { final_score } => write!(f, "done ({final_score})"),
        }
    }
}
