//! Staged verification and score-reveal sequencer
//!
//! Runs a fixed ordered list of verification steps, marks each complete
//! after a fixed delay (or on an external signal), ramps a counter from zero
//! to a known target, and signals completion exactly once.
//!
//! # Architecture
//!
//! - [`SequencerState`] - Tagged forward-only state machine
//! - [`ScoreRamp`] - Bounded counter with `ceil(target / 50)` increments
//! - [`Sequencer`] - Owns at most one live run, rejects overlapping starts
//! - [`SequenceHandle`] - Cancellable stream of snapshots for one run
//! - [`VerificationSource`] - Internal timer or external step signals

pub mod engine;
pub mod ramp;
pub mod source;
pub mod state;

pub use engine::{MAX_INTERVAL, SequenceHandle, Sequencer, SequencerConfig};
pub use ramp::{RAMP_DIVISIONS, ScoreRamp};
pub use source::{StepCompleter, VerificationSource};
pub use state::{SequencerState, StepList, StepState};
