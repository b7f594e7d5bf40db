//! Bounded score counter.
//!
//! The ramp climbs from zero to a fixed target in roughly
//! [`RAMP_DIVISIONS`] visible increments. The last increment is clamped so
//! the counter lands exactly on the target.

use serde::Serialize;

/// Number of increments the target is divided into.
pub const RAMP_DIVISIONS: u64 = 50;

/// Counter ramping from zero toward `target`.
///
/// `current` never decreases and never exceeds `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreRamp {
    current: u64,
    target: u64,
    increment: u64,
}

impl ScoreRamp {
    /// Creates a ramp at zero with `increment = ceil(target / 50)`.
    ///
    /// A zero target yields a ramp that is already complete; callers are
    /// expected to reject it before scheduling.
    #[must_use]
    pub const fn new(target: u64) -> Self {
        Self {
            current: 0,
            target,
            increment: increment_for(target),
        }
    }

    /// Current counter value.
    #[must_use]
    pub const fn current(&self) -> u64 {
        self.current
    }

    /// Target value.
    #[must_use]
    pub const fn target(&self) -> u64 {
        self.target
    }

    /// Step size.
    #[must_use]
    pub const fn increment(&self) -> u64 {
        self.increment
    }

    /// Whether the counter reached the target.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.current >= self.target
    }

    /// Advances by one increment, clamped at the target.
    ///
    /// Returns the new value.
    pub fn advance(&mut self) -> u64 {
        self.current = self.current.saturating_add(self.increment).min(self.target);
        self.current
    }

    /// Number of [`advance`](Self::advance) calls from zero to the target.
    #[must_use]
    pub const fn ticks_to_complete(&self) -> u64 {
        self.target.div_ceil(self.increment)
    }
}

/// `ceil(target / 50)`, never below one.
#[must_use]
pub const fn increment_for(target: u64) -> u64 {
    let inc = target.div_ceil(RAMP_DIVISIONS);
    if inc == 0 { 1 } else { inc }
}
