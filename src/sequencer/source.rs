//! Where step-completion signals come from.
//!
//! A run either paces its steps on its own timer or waits for an external
//! capability (a wallet provider scanning an account, say) to report each
//! step through a [`StepCompleter`].

use tokio::sync::mpsc;

/// Source of step-completion signals for one run.
#[derive(Debug, Default)]
pub enum VerificationSource {
    /// Steps complete every `step_interval` on the run's own timer.
    #[default]
    Simulated,
    /// Steps complete when the paired [`StepCompleter`] signals.
    External(StepSignals),
}

impl VerificationSource {
    /// Creates an external source and the completer that drives it.
    #[must_use]
    pub fn external() -> (StepCompleter, Self) {
        let (completer, signals) = step_channel();
        (completer, Self::External(signals))
    }

    /// Label used in logs and events.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Simulated => "simulated",
            Self::External(_) => "external",
        }
    }
}

/// Sending half: each call to [`complete_next`](Self::complete_next)
/// completes the next step of the paired run.
#[derive(Debug, Clone)]
pub struct StepCompleter {
    tx: mpsc::UnboundedSender<()>,
}

impl StepCompleter {
    /// Signals one step completion.
    ///
    /// Returns `false` once the run is gone (finished or cancelled).
    pub fn complete_next(&self) -> bool {
        self.tx.send(()).is_ok()
    }

    /// Whether the receiving run has gone away.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half consumed by the run.
#[derive(Debug)]
pub struct StepSignals {
    rx: mpsc::UnboundedReceiver<()>,
}

impl StepSignals {
    /// Waits for the next signal. `None` once every completer is dropped.
    pub async fn next(&mut self) -> Option<()> {
        self.rx.recv().await
    }
}

/// Creates a connected completer/signals pair.
#[must_use]
pub fn step_channel() -> (StepCompleter, StepSignals) {
    let (tx, rx) = mpsc::unbounded_channel();
    (StepCompleter { tx }, StepSignals { rx })
}
